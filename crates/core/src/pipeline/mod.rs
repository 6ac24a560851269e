//! Upload-to-table pipeline
//!
//! This module provides a state machine that orchestrates:
//! - Parsing an uploaded CSV or JSON file
//! - LLM schema inference from a sample of rows
//! - LLM generation of a `CREATE TABLE` statement
//! - Loading all rows into an in-memory DuckDB catalog
//! - Reading back a preview
//!
//! # Example
//!
//! ```rust,ignore
//! use tablesmith_core::pipeline::{Pipeline, PipelineConfig, PipelineStep};
//!
//! let mut pipeline = Pipeline::new(client, PipelineConfig::default())?;
//! pipeline.upload("customers.csv", &content).await?;
//! pipeline.confirm_schema().await?;
//! if pipeline.confirm_sql()? == PipelineStep::Done {
//!     println!("{:?}", pipeline.state().summary());
//! }
//! ```
//!
//! # Pipeline Steps
//!
//! 1. **Upload**: waiting for a file
//! 2. **AnalyzingSchema**: LLM infers column analyses
//! 3. **ReviewSchema**: user reviews the analyses
//! 4. **GeneratingSql**: LLM writes the DDL
//! 5. **ReviewSql**: user reviews the DDL
//! 6. **ProcessingDb**: table created, rows inserted, preview read
//! 7. **Done**
//!
//! Any failure moves the pipeline to **Error**; `reset` returns to **Upload**.

mod config;
mod error;
mod log;
mod orchestrator;
mod state;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use log::{LogEntry, PipelineLog, Severity};
pub use orchestrator::{Pipeline, PipelineEvent};
pub use state::{PipelineState, PipelineStep, RunSummary};
