//! Error types for file parsing

use thiserror::Error;

/// Errors that can occur while parsing an uploaded file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// File extension is neither `.csv` nor `.json`
    #[error("Unsupported file format: '{0}' (expected .csv or .json)")]
    UnsupportedFormat(String),

    /// CSV header row is missing, has empty names or duplicates
    #[error("Invalid CSV header: {0}")]
    InvalidHeader(String),

    /// CSV reader failure
    #[error("CSV error: {0}")]
    Csv(String),

    /// Content is not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// JSON is neither an object nor an array of objects
    #[error("Invalid JSON shape: {0}")]
    InvalidJsonShape(String),

    /// The file parsed but contains no data rows
    #[error("File contains no data rows")]
    NoRows,
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        ParseError::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::InvalidJson(err.to_string())
    }
}

impl ParseError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ParseError::UnsupportedFormat(ext) => format!(
                "Unsupported file format '{ext}'.\n\nHint: Upload a .csv or .json file."
            ),
            ParseError::InvalidHeader(msg) => format!(
                "Invalid CSV header: {msg}\n\nHint: The first line must contain unique, non-empty column names."
            ),
            ParseError::InvalidJsonShape(msg) => format!(
                "Invalid JSON shape: {msg}\n\nHint: Use an array of objects or a single object."
            ),
            ParseError::NoRows => {
                "File contains no data rows.\n\nHint: Add at least one row below the header."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}
