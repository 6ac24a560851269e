//! CLI error types

use std::path::PathBuf;

use tablesmith_core::{ConfigError, LlmError, ParseError, PipelineError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    ParseError(#[from] ParseError),

    #[error(transparent)]
    LlmError(#[from] LlmError),

    #[error(transparent)]
    PipelineError(#[from] PipelineError),

    /// The run ended in the `Error` step
    #[error("Pipeline failed: {0}")]
    PipelineFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Aborted by user")]
    Aborted,
}

impl CliError {
    /// Get a user-friendly error message, with hints where the core has them
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(err) => err.user_message(),
            CliError::ParseError(err) => err.user_message(),
            CliError::LlmError(err) => err.user_message(),
            CliError::PipelineError(err) => err.user_message(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_uses_core_hints() {
        let err: CliError = ParseError::NoRows.into();
        assert!(err.user_message().contains("Hint:"));

        let err = CliError::InvalidArgument("--preview must be at least 1".to_string());
        assert_eq!(
            err.user_message(),
            "Invalid argument: --preview must be at least 1"
        );
    }
}
