//! Schema inference
//!
//! Sends a bounded sample of the parsed rows to the LLM and turns the reply
//! into one [`ColumnAnalysis`] per column.

use std::collections::HashSet;

use serde_json::Value as JsonValue;
use thiserror::Error;

use super::client::{CompletionRequest, LlmClient};
use super::error::LlmError;
use super::prompt::{schema_inference_prompt, strip_code_fence};
use crate::models::{ColumnAnalysis, Row};

/// Default number of rows sent to the LLM
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Errors produced while inferring a schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Transport or service failure
    #[error(transparent)]
    Provider(#[from] LlmError),

    /// The response could not be parsed as JSON, fenced or raw
    #[error("Could not parse column analyses: {0}")]
    Parse(String),

    /// The response parsed but has the wrong shape
    #[error("Unexpected column analysis shape: {0}")]
    Shape(String),

    /// Nothing to sample
    #[error("No rows to sample")]
    NoRows,
}

impl InferenceError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            InferenceError::Provider(err) => err.user_message(),
            InferenceError::Parse(_) | InferenceError::Shape(_) => format!(
                "{self}\n\nHint: The model did not return a JSON array of column analyses. \
                Try again or use a different model."
            ),
            InferenceError::NoRows => self.to_string(),
        }
    }

    /// Check if retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, InferenceError::Provider(err) if err.is_retryable())
    }
}

/// Infers column analyses from a data sample using an LLM
pub struct SchemaInferrer<C: LlmClient> {
    client: C,
    sample_size: usize,
    temperature: f32,
}

impl<C: LlmClient> SchemaInferrer<C> {
    /// Create a new schema inferrer
    pub fn new(client: C) -> Self {
        Self {
            client,
            sample_size: DEFAULT_SAMPLE_SIZE,
            temperature: 0.1,
        }
    }

    /// Set the number of rows sent to the LLM
    pub fn with_sample_size(mut self, rows: usize) -> Self {
        self.sample_size = rows.max(1);
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Infer one column analysis per column from the first rows
    ///
    /// Only the first `sample_size` rows are sent.
    pub async fn infer_schema(
        &self,
        rows: &[Row],
        file_name: &str,
    ) -> Result<Vec<ColumnAnalysis>, InferenceError> {
        if rows.is_empty() {
            return Err(InferenceError::NoRows);
        }

        let sample = &rows[..self.sample_size.min(rows.len())];
        let prompt = schema_inference_prompt(file_name, sample);
        let request = CompletionRequest::new(prompt)
            .with_temperature(self.temperature)
            .json();

        tracing::debug!(
            file = file_name,
            sample_rows = sample.len(),
            model = self.client.model_name(),
            "Requesting schema inference"
        );

        let response = self.client.complete(&request).await?;
        parse_column_analyses(&response)
    }
}

/// Parse an LLM response into column analyses
///
/// The fence-stripped text is tried first, then the raw response. When both
/// fail the error carries both messages.
pub fn parse_column_analyses(response: &str) -> Result<Vec<ColumnAnalysis>, InferenceError> {
    let value: JsonValue = match serde_json::from_str(strip_code_fence(response)) {
        Ok(value) => value,
        Err(fenced_err) => serde_json::from_str(response).map_err(|raw_err| {
            InferenceError::Parse(format!(
                "fence-stripped text: {fenced_err}; raw text: {raw_err}"
            ))
        })?,
    };

    let JsonValue::Array(items) = value else {
        return Err(InferenceError::Shape("not an array".to_string()));
    };
    if items.is_empty() {
        return Err(InferenceError::Shape("empty array".to_string()));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<ColumnAnalysis>(item)
                .map_err(|e| InferenceError::Shape(format!("element {i}: {e}")))
        })
        .collect()
}

/// Compare analysed columns against the file's columns
///
/// Returns one warning per column the model skipped, invented or repeated.
pub fn coverage_warnings(analyses: &[ColumnAnalysis], columns: &[String]) -> Vec<String> {
    let mut warnings = Vec::new();
    let analysed: HashSet<&str> = analyses.iter().map(|a| a.column_name.as_str()).collect();
    let expected: HashSet<&str> = columns.iter().map(String::as_str).collect();

    for column in columns {
        if !analysed.contains(column.as_str()) {
            warnings.push(format!("Column '{column}' was not analysed"));
        }
    }

    let mut seen = HashSet::new();
    for analysis in analyses {
        let name = analysis.column_name.as_str();
        if !expected.contains(name) {
            warnings.push(format!("Analysis for unknown column '{name}'"));
        } else if !seen.insert(name) {
            warnings.push(format!("Column '{name}' was analysed more than once"));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockLlmClient;
    use crate::models::Value;

    const RESPONSE: &str = r#"[
        {"columnName": "name", "inferredSqlType": "VARCHAR", "semanticType": "person name",
         "description": "Person's name", "qualityIssues": []},
        {"columnName": "age", "inferredSqlType": "INTEGER", "semanticType": "age",
         "description": "Age in years", "qualityIssues": ["one missing value"]}
    ]"#;

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| {
                Row::new()
                    .with("name", format!("person{i}"))
                    .with("age", Value::from(20 + i as i64))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_infer_schema() {
        let client = MockLlmClient::new([RESPONSE]);
        let inferrer = SchemaInferrer::new(client);

        let columns = inferrer.infer_schema(&rows(2), "people.csv").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].column_name, "age");
        assert!(columns[1].has_issues());
    }

    #[tokio::test]
    async fn test_only_sample_is_sent() {
        let inferrer = SchemaInferrer::new(MockLlmClient::new([RESPONSE]))
            .with_sample_size(3)
            .with_temperature(0.2);
        inferrer.infer_schema(&rows(50), "people.csv").await.unwrap();

        let requests = inferrer.client.requests();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("person2"));
        assert!(!prompt.contains("person3"));
        assert_eq!(requests[0].temperature, Some(0.2));
        assert_eq!(
            requests[0].response_format,
            crate::llm::client::ResponseFormat::Json
        );
    }

    #[tokio::test]
    async fn test_provider_error_is_passed_through() {
        let inferrer = SchemaInferrer::new(MockLlmClient::failing(LlmError::RateLimited(5)));
        let err = inferrer.infer_schema(&rows(1), "x.csv").await.unwrap_err();
        assert_eq!(err, InferenceError::Provider(LlmError::RateLimited(5)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_no_rows() {
        let inferrer = SchemaInferrer::new(MockLlmClient::new(Vec::<String>::new()));
        let err = inferrer.infer_schema(&[], "x.csv").await.unwrap_err();
        assert_eq!(err, InferenceError::NoRows);
        assert!(inferrer.client.requests().is_empty());
    }

    #[test]
    fn test_parse_fenced_and_unfenced() {
        let fenced = format!("```json\n{RESPONSE}\n```");
        assert_eq!(
            parse_column_analyses(&fenced).unwrap(),
            parse_column_analyses(RESPONSE).unwrap()
        );
    }

    #[test]
    fn test_parse_failure_carries_both_messages() {
        let err = parse_column_analyses("```json\nnot json\n```").unwrap_err();
        match err {
            InferenceError::Parse(msg) => {
                assert!(msg.contains("fence-stripped text"));
                assert!(msg.contains("raw text"));
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_not_an_array() {
        let err = parse_column_analyses(r#"{"columnName": "x"}"#).unwrap_err();
        assert_eq!(err, InferenceError::Shape("not an array".to_string()));
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(matches!(
            parse_column_analyses("[]"),
            Err(InferenceError::Shape(_))
        ));
    }

    #[test]
    fn test_parse_wrong_element() {
        let err = parse_column_analyses(r#"[{"columnName": "x"}]"#).unwrap_err();
        assert!(matches!(err, InferenceError::Shape(msg) if msg.starts_with("element 0")));
    }

    #[test]
    fn test_coverage_warnings() {
        let analyses = vec![
            ColumnAnalysis::new("name", "VARCHAR"),
            ColumnAnalysis::new("email", "VARCHAR"),
            ColumnAnalysis::new("name", "TEXT"),
        ];
        let columns = vec!["name".to_string(), "age".to_string()];
        let warnings = coverage_warnings(&analyses, &columns);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("'age' was not analysed"));
        assert!(warnings[1].contains("unknown column 'email'"));
        assert!(warnings[2].contains("more than once"));

        let exact = vec![
            ColumnAnalysis::new("name", "VARCHAR"),
            ColumnAnalysis::new("age", "INTEGER"),
        ];
        assert!(coverage_warnings(&exact, &columns).is_empty());
    }
}
