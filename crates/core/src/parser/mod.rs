//! Data parser
//!
//! Turns raw CSV or JSON text into an ordered sequence of uniform rows.
//! Parsing is pure: the same input always yields the same rows and diagnostics.

mod csv;
mod error;
mod json;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::Row;

pub use error::ParseError;

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Pick the format from the file extension (case-insensitive)
    pub fn from_file_name(file_name: &str) -> Result<Self, ParseError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        if extension.eq_ignore_ascii_case("csv") {
            Ok(FileFormat::Csv)
        } else if extension.eq_ignore_ascii_case("json") {
            Ok(FileFormat::Json)
        } else {
            Err(ParseError::UnsupportedFormat(extension.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal problem found while parsing a single record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    /// 1-based CSV line number or JSON array element
    pub position: usize,
    pub message: String,
}

impl ParseDiagnostic {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}: {}", self.position, self.message)
    }
}

/// Result of parsing an uploaded file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    /// Original file name, used to derive the table name
    pub file_name: String,
    pub format: FileFormat,
    /// Column names shared by every row, in order
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParsedFile {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The first `n` rows
    pub fn sample(&self, n: usize) -> &[Row] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// Parse an uploaded file, dispatching on its extension
///
/// # Errors
///
/// Returns `UnsupportedFormat` for anything but `.csv`/`.json` regardless of
/// content, a format-specific error for malformed input, and `NoRows` when the
/// file holds no data rows.
pub fn parse(file_name: &str, content: &str) -> Result<ParsedFile, ParseError> {
    let format = FileFormat::from_file_name(file_name)?;

    let (columns, rows, diagnostics) = match format {
        FileFormat::Csv => {
            let parsed = csv::parse_csv(content)?;
            (parsed.columns, parsed.rows, parsed.diagnostics)
        }
        FileFormat::Json => {
            let parsed = json::parse_json(content)?;
            (parsed.columns, parsed.rows, parsed.diagnostics)
        }
    };

    if rows.is_empty() {
        return Err(ParseError::NoRows);
    }

    tracing::debug!(
        file = file_name,
        format = %format,
        rows = rows.len(),
        columns = columns.len(),
        diagnostics = diagnostics.len(),
        "Parsed file"
    );

    Ok(ParsedFile {
        file_name: file_name.to_string(),
        format,
        columns,
        rows,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;

    #[test]
    fn test_csv_row_and_column_counts() {
        let parsed = parse("people.csv", "name,age,active\nAlice,30,true\nBob,,false\nEve,41,\n")
            .unwrap();
        assert_eq!(parsed.format, FileFormat::Csv);
        assert_eq!(parsed.row_count(), 3);
        for row in &parsed.rows {
            assert_eq!(row.len(), 3);
            assert_eq!(row.columns().collect::<Vec<_>>(), parsed.columns);
        }
        assert!(parsed.rows[1].get("age").unwrap().is_null());
        assert_eq!(parsed.rows[2].get("name"), Some(&Value::from("Eve")));
    }

    #[test]
    fn test_json_array_and_object_lengths() {
        let parsed = parse("a.json", r#"[{"x": 1}, {"x": 2}, {"x": 3}]"#).unwrap();
        assert_eq!(parsed.row_count(), 3);

        let parsed = parse("b.json", r#"{"x": 1, "y": "z"}"#).unwrap();
        assert_eq!(parsed.row_count(), 1);
        assert_eq!(parsed.columns, vec!["x", "y"]);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(FileFormat::from_file_name("DATA.CSV").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_file_name("x.Json").unwrap(), FileFormat::Json);
    }

    #[test]
    fn test_unsupported_format_ignores_content() {
        let err = parse("notes.txt", "name,age\nAlice,30\n").unwrap_err();
        assert_eq!(err, ParseError::UnsupportedFormat("txt".to_string()));

        let err = parse("noext", "[]").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_no_rows() {
        assert_eq!(parse("a.csv", "name,age\n").unwrap_err(), ParseError::NoRows);
        assert_eq!(parse("a.json", "[]").unwrap_err(), ParseError::NoRows);
    }

    #[test]
    fn test_sample() {
        let parsed = parse("n.csv", "n\n1\n2\n3\n").unwrap();
        assert_eq!(parsed.sample(2).len(), 2);
        assert_eq!(parsed.sample(10).len(), 3);
        assert!(parsed.sample(0).is_empty());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let content = "a,b\n1,x\n2,y\n";
        assert_eq!(parse("t.csv", content).unwrap(), parse("t.csv", content).unwrap());
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = ParseDiagnostic::new(4, "expected 2 fields, found 3");
        assert_eq!(diag.to_string(), "record 4: expected 2 fields, found 3");
    }
}
