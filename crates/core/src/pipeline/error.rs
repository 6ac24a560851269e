//! Error types for pipeline operations
//!
//! Component errors are wrapped as they are, so callers can still reach the
//! typed cause and its `user_message()` hints.

use std::time::Duration;

use thiserror::Error;

use super::state::PipelineStep;
use crate::catalog::CatalogError;
use crate::llm::{GenerationError, InferenceError, LlmError};
use crate::parser::ParseError;

/// Errors that can occur during pipeline execution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Configuration or missing credential
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The uploaded file could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Schema inference failed
    #[error("Schema inference failed: {0}")]
    Inference(#[from] InferenceError),

    /// SQL generation failed
    #[error("SQL generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Database failure
    #[error("Database error: {0}")]
    Catalog(#[from] CatalogError),

    /// An LLM step did not finish in time
    #[error("Step '{step}' timed out after {seconds} seconds")]
    Timeout { step: PipelineStep, seconds: u64 },

    /// A trigger was issued in a step that does not accept it
    #[error("Cannot {trigger} while the pipeline is in step '{step}'")]
    InvalidTrigger {
        trigger: &'static str,
        step: PipelineStep,
    },

    /// A state change outside the transition table
    #[error("Illegal transition from '{from}' to '{to}'")]
    IllegalTransition { from: PipelineStep, to: PipelineStep },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A bare `LlmError` only reaches the pipeline when a client cannot be built,
/// so every variant is a configuration failure. Request failures arrive wrapped
/// in `InferenceError` or `GenerationError`.
impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ConfigError(msg) => PipelineError::ConfigError(msg),
            other => PipelineError::ConfigError(other.to_string()),
        }
    }
}

impl PipelineError {
    /// The provider error behind this failure, if any
    pub fn provider_error(&self) -> Option<&LlmError> {
        match self {
            PipelineError::Inference(InferenceError::Provider(err))
            | PipelineError::Generation(GenerationError::Provider(err)) => Some(err),
            _ => None,
        }
    }

    /// Check if retrying the step may succeed
    pub fn is_retryable(&self) -> bool {
        self.provider_error().is_some_and(LlmError::is_retryable)
    }

    /// Delay suggested before the next attempt, for retryable failures
    pub fn retry_delay(&self) -> Option<Duration> {
        self.provider_error()
            .filter(|err| err.is_retryable())
            .map(|err| Duration::from_secs(err.retry_after().unwrap_or(1)))
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ConfigError(msg) => {
                format!(
                    "Configuration error: {msg}\n\nHint: Set GEMINI_API_KEY or check your tablesmith.toml."
                )
            }
            PipelineError::Parse(err) => err.user_message(),
            PipelineError::Inference(err) => err.user_message(),
            PipelineError::Generation(err) => err.user_message(),
            PipelineError::Catalog(err) => err.user_message(),
            PipelineError::Timeout { step, seconds } => {
                format!(
                    "Step '{step}' timed out after {seconds} seconds.\n\n\
                    Hint: Increase pipeline.step_timeout_secs or try again later."
                )
            }
            PipelineError::InvalidTrigger { .. } => {
                format!("{self}\n\nHint: Reset the pipeline to start over.")
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::Timeout {
            step: PipelineStep::AnalyzingSchema,
            seconds: 30,
        };
        assert_eq!(
            err.to_string(),
            "Step 'analyzing_schema' timed out after 30 seconds"
        );

        let err = PipelineError::InvalidTrigger {
            trigger: "confirm the SQL",
            step: PipelineStep::Upload,
        };
        assert_eq!(
            err.to_string(),
            "Cannot confirm the SQL while the pipeline is in step 'upload'"
        );
    }

    #[test]
    fn test_from_component_errors() {
        let err: PipelineError = ParseError::NoRows.into();
        assert!(matches!(err, PipelineError::Parse(ParseError::NoRows)));

        let err: PipelineError = CatalogError::NotOpen.into();
        assert!(err.to_string().contains("not open"));

        let err: PipelineError = LlmError::ConfigError("no key".to_string()).into();
        assert_eq!(err, PipelineError::ConfigError("no key".to_string()));
    }

    #[test]
    fn test_client_build_errors_are_config_errors() {
        let err: PipelineError = LlmError::AuthFailed("HTTP 401".to_string()).into();
        assert!(matches!(&err, PipelineError::ConfigError(msg) if msg.contains("HTTP 401")));
        assert!(err.provider_error().is_none());
        assert!(!err.is_retryable());

        let err: PipelineError =
            LlmError::FeatureNotAvailable("Gemini client".to_string(), "gemini".to_string())
                .into();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }

    #[test]
    fn test_retry_delay() {
        let err = PipelineError::Inference(InferenceError::Provider(LlmError::RateLimited(7)));
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay(), Some(Duration::from_secs(7)));

        let err = PipelineError::Generation(GenerationError::Provider(LlmError::AuthFailed(
            "401".to_string(),
        )));
        assert!(!err.is_retryable());
        assert_eq!(err.retry_delay(), None);

        let err = PipelineError::Inference(InferenceError::Shape("not an array".to_string()));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_message() {
        let err = PipelineError::ConfigError("API key not set".to_string());
        assert!(err.user_message().contains("Hint:"));

        let err: PipelineError = ParseError::UnsupportedFormat("txt".to_string()).into();
        assert!(err.user_message().contains(".csv or .json"));
    }
}
