//! SQL generation
//!
//! Asks the LLM for a single `CREATE TABLE` statement for the analysed
//! columns. The only check applied to the reply is its leading keywords.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::client::{CompletionRequest, LlmClient};
use super::error::LlmError;
use super::prompt::{sql_generation_prompt, strip_code_fence};
use crate::models::{ColumnAnalysis, GeneratedSchema};

static CREATE_TABLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^CREATE\s+TABLE\b").unwrap());

/// Errors produced while generating DDL
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// Transport or service failure
    #[error(transparent)]
    Provider(#[from] LlmError),

    /// The reply is not a CREATE TABLE statement
    #[error("Expected a CREATE TABLE statement, got: {0}")]
    InvalidStatement(String),

    /// There are no columns to generate a table for
    #[error("No column analyses to generate SQL from")]
    NoColumns,

    /// The statement's table name could not be read
    #[error("Could not determine the table name in: {0}")]
    MissingTableName(String),

    /// The prompt could not be built
    #[error("Failed to build SQL prompt: {0}")]
    Prompt(String),
}

impl GenerationError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Provider(err) => err.user_message(),
            GenerationError::InvalidStatement(_) | GenerationError::MissingTableName(_) => {
                format!("{self}\n\nHint: Try again; the model replied with something other than DDL.")
            }
            _ => self.to_string(),
        }
    }

    /// Check if retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::Provider(err) if err.is_retryable())
    }
}

/// Generates `CREATE TABLE` statements using an LLM
pub struct SqlGenerator<C: LlmClient> {
    client: C,
    temperature: f32,
}

impl<C: LlmClient> SqlGenerator<C> {
    /// Create a new SQL generator
    pub fn new(client: C) -> Self {
        Self {
            client,
            temperature: 0.1,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Generate the DDL text for a table named `base_table_name`
    ///
    /// Returns the fence-stripped, trimmed statement.
    pub async fn generate_create_table(
        &self,
        columns: &[ColumnAnalysis],
        base_table_name: &str,
    ) -> Result<String, GenerationError> {
        if columns.is_empty() {
            return Err(GenerationError::NoColumns);
        }

        let prompt = sql_generation_prompt(columns, base_table_name)
            .map_err(|e| GenerationError::Prompt(e.to_string()))?;
        let request = CompletionRequest::new(prompt).with_temperature(self.temperature);

        tracing::debug!(
            table = base_table_name,
            columns = columns.len(),
            model = self.client.model_name(),
            "Requesting CREATE TABLE statement"
        );

        let response = self.client.complete(&request).await?;
        validate_create_table(strip_code_fence(&response))
    }

    /// Generate the DDL and resolve the table it creates
    pub async fn generate_schema(
        &self,
        columns: &[ColumnAnalysis],
        base_table_name: &str,
    ) -> Result<GeneratedSchema, GenerationError> {
        let ddl = self.generate_create_table(columns, base_table_name).await?;
        GeneratedSchema::from_ddl(ddl.clone(), base_table_name)
            .ok_or(GenerationError::MissingTableName(ddl))
    }
}

/// Check that `sql` starts with `CREATE TABLE`
pub fn validate_create_table(sql: &str) -> Result<String, GenerationError> {
    let sql = sql.trim();
    if CREATE_TABLE_PREFIX.is_match(sql) {
        Ok(sql.to_string())
    } else {
        Err(GenerationError::InvalidStatement(sql.to_string()))
    }
}
