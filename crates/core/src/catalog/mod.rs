//! Catalog store
//!
//! An embedded DuckDB database, created lazily per pipeline run, that holds
//! the generated table and its rows.

mod error;
mod store;

pub use error::CatalogError;
pub use store::CatalogStore;
