//! Pipeline configuration types

use serde::{Deserialize, Serialize};

/// Pipeline behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rows sent to the LLM for schema inference
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Rows read back after loading
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
    /// Upper bound for each LLM step, retries included
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    /// Retries for transient LLM failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Minimum delay between retries in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_sample_size() -> usize {
    5
}

fn default_preview_limit() -> usize {
    10
}

fn default_step_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            preview_limit: default_preview_limit(),
            step_timeout_secs: default_step_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sample size
    pub fn with_sample_size(mut self, rows: usize) -> Self {
        self.sample_size = rows;
        self
    }

    /// Set the preview limit
    pub fn with_preview_limit(mut self, rows: usize) -> Self {
        self.preview_limit = rows;
        self
    }

    /// Set the step timeout
    pub fn with_step_timeout(mut self, seconds: u64) -> Self {
        self.step_timeout_secs = seconds;
        self
    }

    /// Set maximum retries
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the minimum retry delay
    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_size == 0 {
            return Err("pipeline.sample_size must be at least 1".to_string());
        }
        if self.preview_limit == 0 {
            return Err("pipeline.preview_limit must be at least 1".to_string());
        }
        if self.step_timeout_secs == 0 {
            return Err("pipeline.step_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_size, 5);
        assert_eq!(config.preview_limit, 10);
        assert_eq!(config.step_timeout_secs, 120);
        assert_eq!(config.max_retries, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::new()
            .with_sample_size(20)
            .with_preview_limit(3)
            .with_step_timeout(10)
            .with_max_retries(0)
            .with_retry_delay_ms(50);
        assert_eq!(config.sample_size, 20);
        assert_eq!(config.preview_limit, 3);
        assert_eq!(config.step_timeout_secs, 10);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.retry_delay_ms, 50);
    }

    #[test]
    fn test_validate() {
        assert!(PipelineConfig::new().with_sample_size(0).validate().is_err());
        assert!(PipelineConfig::new().with_preview_limit(0).validate().is_err());
        assert!(PipelineConfig::new().with_step_timeout(0).validate().is_err());
    }

    #[test]
    fn test_partial_deserialize() {
        let config: PipelineConfig = serde_json::from_str(r#"{"sample_size": 8}"#).unwrap();
        assert_eq!(config.sample_size, 8);
        assert_eq!(config.preview_limit, 10);
    }
}
