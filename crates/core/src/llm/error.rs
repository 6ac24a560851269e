//! Error types for LLM operations
//!
//! Transport, authentication and response-shape failures of the LLM service.
//! Interpretation failures (bad JSON, wrong statement) live with the callers
//! in [`super::inference`] and [`super::sql`].

use thiserror::Error;

/// Errors that can occur while talking to an LLM service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Failed to connect to LLM service: {0}")]
    ConnectionError(String),

    /// Request timeout
    #[error("LLM request timed out after {0} seconds")]
    Timeout(u64),

    /// API key rejected
    #[error("LLM service rejected the credentials: {0}")]
    AuthFailed(String),

    /// The service answered with an error status or an unusable body
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// Failed to parse the service envelope as JSON
    #[error("Failed to parse LLM response envelope: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Rate limiting
    #[error("Rate limited by LLM service, retry after {0} seconds")]
    RateLimited(u64),

    /// Feature not available
    #[error("LLM feature not available: {0}. Enable with --features {1}")]
    FeatureNotAvailable(String, String),
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::ParseError(err.to_string())
    }
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            LlmError::ConnectionError(msg) => {
                format!(
                    "Failed to connect to LLM service: {msg}\n\n\
                    Hints:\n\
                    - Check your internet connection\n\
                    - Verify llm.base_url in the configuration"
                )
            }
            LlmError::Timeout(secs) => {
                format!(
                    "LLM request timed out after {secs} seconds.\n\n\
                    Hints:\n\
                    - The model may be overloaded, try again later\n\
                    - Increase llm.timeout_seconds or pipeline.step_timeout_secs"
                )
            }
            LlmError::AuthFailed(msg) => {
                format!(
                    "LLM service rejected the API key: {msg}\n\n\
                    Hint: Check the key in GEMINI_API_KEY (or the variable named by llm.api_key_env)."
                )
            }
            LlmError::RateLimited(secs) => {
                format!(
                    "Rate limited by LLM service. Retry after {secs} seconds.\n\n\
                    Hint: Wait and try again, or use a different API key."
                )
            }
            LlmError::ConfigError(msg) => {
                format!(
                    "LLM configuration error: {msg}\n\n\
                    Hints:\n\
                    - Set GEMINI_API_KEY in the environment\n\
                    - Or set llm.api_key in the configuration file"
                )
            }
            LlmError::FeatureNotAvailable(feature, flag) => {
                format!(
                    "LLM feature '{feature}' not available.\n\n\
                    Hint: Rebuild with --features {flag}"
                )
            }
            _ => self.to_string(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ConnectionError(_) | LlmError::Timeout(_) | LlmError::RateLimited(_)
        )
    }

    /// Get suggested wait time before retry (in seconds)
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited(secs) => Some(*secs),
            LlmError::Timeout(_) => Some(5),
            LlmError::ConnectionError(_) => Some(2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LlmError::ConnectionError("Connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to connect to LLM service: Connection refused"
        );

        let err = LlmError::Timeout(30);
        assert_eq!(err.to_string(), "LLM request timed out after 30 seconds");

        let err = LlmError::RateLimited(10);
        assert_eq!(
            err.to_string(),
            "Rate limited by LLM service, retry after 10 seconds"
        );
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::ParseError(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(LlmError::Timeout(1).is_retryable());
        assert!(LlmError::RateLimited(3).is_retryable());
        assert!(!LlmError::AuthFailed("bad key".to_string()).is_retryable());
        assert!(!LlmError::InvalidResponse("500".to_string()).is_retryable());

        assert_eq!(LlmError::RateLimited(7).retry_after(), Some(7));
        assert_eq!(LlmError::ConfigError("x".to_string()).retry_after(), None);
    }

    #[test]
    fn test_user_message_hints() {
        let msg = LlmError::ConfigError("missing API key".to_string()).user_message();
        assert!(msg.contains("GEMINI_API_KEY"));
    }
}
