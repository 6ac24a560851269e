//! Gemini API client
//!
//! Calls `models/{model}:generateContent` with the API key as a query
//! parameter. Only the text parts of the first candidate are returned.
//!
//! # Example
//!
//! ```ignore
//! use tablesmith_core::llm::{CompletionRequest, GeminiClient, LlmClient, LlmConfig};
//!
//! let client = GeminiClient::from_config(&LlmConfig::default())?;
//! let text = client.complete(&CompletionRequest::new("Say hi")).await?;
//! ```

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use super::client::{CompletionRequest, LlmClient};
use super::config::LlmConfig;
use super::error::{LlmError, LlmResult};

/// Wait applied to HTTP 429 responses without a usable `Retry-After`
#[cfg(any(feature = "gemini", test))]
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// API base URL
    base_url: String,
    /// Model name to use
    model: String,
    api_key: String,
    /// Request timeout in seconds
    timeout_seconds: u64,
    /// HTTP client
    #[cfg(feature = "gemini")]
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    #[cfg(feature = "gemini")]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: super::config::DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_seconds: 120,
            client: reqwest::Client::new(),
        }
    }

    /// Create a new Gemini client (stub for when feature is disabled)
    #[cfg(not(feature = "gemini"))]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: super::config::DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_seconds: 120,
        }
    }

    /// Build a client from configuration, resolving the API key
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ConfigError` when the configuration is invalid or no
    /// API key can be found.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        config.validate()?;
        let api_key = config.resolve_api_key()?;
        Ok(Self::new(api_key, &config.model)
            .with_base_url(&config.base_url)
            .with_timeout(config.timeout_seconds))
    }

    /// Set the base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint without the key, safe to log
    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request_body(request: &CompletionRequest) -> JsonValue {
        let mut generation_config = json!({
            "responseMimeType": request.response_format.mime_type(),
        });
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }

        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": generation_config,
        })
    }

    /// Concatenate the text parts of the first candidate
    fn parse_response(body: &JsonValue) -> LlmResult<String> {
        let candidates = body["candidates"].as_array().ok_or_else(|| {
            LlmError::InvalidResponse("Missing 'candidates' array in response".to_string())
        })?;

        let candidate = candidates.first().ok_or_else(|| {
            let reason = body["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates returned");
            LlmError::InvalidResponse(format!("Empty 'candidates' array in response: {reason}"))
        })?;

        let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
            let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
            LlmError::InvalidResponse(format!("Candidate has no content (finish reason: {reason})"))
        })?;

        let text: String = parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "Candidate contains no text".to_string(),
            ));
        }
        Ok(text)
    }

    /// Seconds to wait from a `Retry-After` header, 30 when absent or not a number
    #[cfg(any(feature = "gemini", test))]
    fn retry_after_secs(value: Option<&str>) -> u64 {
        value
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
    }

    #[cfg(feature = "gemini")]
    fn map_http_error(
        status: reqwest::StatusCode,
        retry_after: Option<&str>,
        body_text: &str,
    ) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::AuthFailed(format!("HTTP {status}")),
            429 => LlmError::RateLimited(Self::retry_after_secs(retry_after)),
            500..=599 => {
                LlmError::ConnectionError(format!("HTTP {status} from Gemini API: {body_text}"))
            }
            _ => LlmError::InvalidResponse(format!("HTTP {status} from Gemini API: {body_text}")),
        }
    }
}

#[cfg(feature = "gemini")]
#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
        let endpoint = self.endpoint();
        let body = Self::build_request_body(request);

        tracing::debug!(
            endpoint = %endpoint,
            model = %self.model,
            prompt_chars = request.prompt.len(),
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                // reqwest errors embed the URL, which carries the key
                let e = e.without_url();
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    LlmError::ConnectionError(format!(
                        "Failed to connect to Gemini at {}: {}",
                        self.base_url, e
                    ))
                } else {
                    LlmError::ConnectionError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(
                status,
                retry_after.as_deref(),
                &error_text,
            ));
        }

        let json: JsonValue = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.without_url().to_string()))?;

        if let Some(usage) = json.get("usageMetadata") {
            tracing::debug!(
                prompt_tokens = usage["promptTokenCount"].as_u64().unwrap_or(0),
                completion_tokens = usage["candidatesTokenCount"].as_u64().unwrap_or(0),
                "Gemini completion finished"
            );
        }

        Self::parse_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(not(feature = "gemini"))]
#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, _request: &CompletionRequest) -> LlmResult<String> {
        Err(LlmError::FeatureNotAvailable(
            "Gemini client".to_string(),
            "gemini".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
