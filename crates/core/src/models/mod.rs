//! Data model shared by the parser, the LLM clients, the catalog and the pipeline

pub mod column;
pub mod row;
pub mod schema;

pub use column::ColumnAnalysis;
pub use row::{Row, Value};
pub use schema::{
    DEFAULT_TABLE_NAME, GeneratedSchema, TableName, base_table_name, parse_table_name,
    quote_identifier,
};
