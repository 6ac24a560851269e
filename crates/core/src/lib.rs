//! Tablesmith Core - turn an uploaded CSV or JSON file into a queryable table
//!
//! Provides:
//! - File parsing into uniform rows
//! - LLM schema inference and `CREATE TABLE` generation
//! - An embedded DuckDB catalog for loading and previewing rows
//! - A reviewable pipeline state machine tying the steps together

pub mod catalog;
pub mod config;
pub mod llm;
pub mod models;
pub mod parser;
pub mod pipeline;

// Re-export commonly used types
pub use catalog::{CatalogError, CatalogStore};
pub use config::{AppConfig, ConfigError};
pub use llm::{GeminiClient, LlmClient, LlmConfig, LlmError};
pub use models::{ColumnAnalysis, GeneratedSchema, Row, TableName, Value};
pub use parser::{FileFormat, ParseError, ParsedFile, parse};
pub use pipeline::{
    Pipeline, PipelineConfig, PipelineError, PipelineEvent, PipelineState, PipelineStep, Severity,
};
