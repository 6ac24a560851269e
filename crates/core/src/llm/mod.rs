//! LLM-backed schema inference and SQL generation
//!
//! This module provides:
//!
//! - **Client**: the [`LlmClient`] trait and the Gemini implementation
//!   (requires the `gemini` feature, enabled by default)
//! - **Inference**: column analyses from a data sample
//! - **SQL generation**: a `CREATE TABLE` statement from column analyses
//!
//! # Example
//!
//! ```ignore
//! use tablesmith_core::llm::{GeminiClient, LlmConfig, SchemaInferrer, SqlGenerator};
//! use std::sync::Arc;
//!
//! let client = Arc::new(GeminiClient::from_config(&LlmConfig::default())?);
//! let columns = SchemaInferrer::new(Arc::clone(&client))
//!     .infer_schema(&parsed.rows, &parsed.file_name)
//!     .await?;
//! let schema = SqlGenerator::new(client)
//!     .generate_schema(&columns, "customers")
//!     .await?;
//! println!("{}", schema.ddl);
//! ```
//!
//! Without the `gemini` feature the client types still exist, but requests
//! return feature-not-available errors.

pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod inference;
pub mod prompt;
pub mod sql;

// Re-export main types
pub use client::{CompletionRequest, LlmClient, ResponseFormat};
pub use config::LlmConfig;
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use inference::{InferenceError, SchemaInferrer, coverage_warnings, parse_column_analyses};
pub use prompt::strip_code_fence;
pub use sql::{GenerationError, SqlGenerator, validate_create_table};

#[cfg(test)]
pub use client::MockLlmClient;
