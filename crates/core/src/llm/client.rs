//! LLM client trait
//!
//! `LlmClient` is the narrow contract the pipeline talks to: a prompt goes
//! in, text comes out. The Gemini implementation lives in [`super::gemini`];
//! tests substitute stubs.

#[cfg(test)]
use std::collections::VecDeque;
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

use async_trait::async_trait;

#[cfg(test)]
use super::error::LlmError;
use super::error::LlmResult;

/// Expected shape of the model output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free text (`text/plain`)
    #[default]
    Text,
    /// A JSON document (`application/json`)
    Json,
}

impl ResponseFormat {
    /// MIME type requested from the service
    pub fn mime_type(&self) -> &'static str {
        match self {
            ResponseFormat::Text => "text/plain",
            ResponseFormat::Json => "application/json",
        }
    }
}

/// A single completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: Option<f32>,
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            response_format: ResponseFormat::Text,
        }
    }

    /// Set sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Request a JSON response
    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }
}

/// Trait for LLM client implementations
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the given request
    ///
    /// # Returns
    /// The generated text, unmodified
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
        (**self).complete(request).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// A mock LLM client for testing
///
/// Replies with queued responses in order and records every request.
#[cfg(test)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<LlmResult<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

#[cfg(test)]
impl MockLlmClient {
    /// Create a mock client that returns the given responses in order
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client whose first call fails with `err`
    pub fn failing(err: LlmError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(err)])),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("no mock response queued".into())))
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_success() {
        let client = MockLlmClient::new(["first", "second"]);
        assert_eq!(client.model_name(), "mock-model");

        let request = CompletionRequest::new("Test prompt").with_temperature(0.1).json();
        assert_eq!(client.complete(&request).await.unwrap(), "first");
        assert_eq!(client.complete(&request).await.unwrap(), "second");
        assert!(client.complete(&request).await.is_err());

        let seen = client.requests();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].response_format, ResponseFormat::Json);
        assert_eq!(seen[0].temperature, Some(0.1));
    }

    #[tokio::test]
    async fn test_mock_client_failure() {
        let client = MockLlmClient::failing(LlmError::Timeout(1));
        let result = client.complete(&CompletionRequest::new("x")).await;
        assert_eq!(result, Err(LlmError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_arc_client() {
        let client = Arc::new(MockLlmClient::new(["shared"]));
        let response = client.complete(&CompletionRequest::new("x")).await.unwrap();
        assert_eq!(response, "shared");
    }

    #[test]
    fn test_response_format_mime() {
        assert_eq!(ResponseFormat::default().mime_type(), "text/plain");
        assert_eq!(ResponseFormat::Json.mime_type(), "application/json");
    }
}
