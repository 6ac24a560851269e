//! CSV parsing with best-effort type coercion

use std::collections::HashSet;

use csv::ReaderBuilder;

use super::ParseDiagnostic;
use super::error::ParseError;
use crate::models::{Row, Value};

/// Parsed CSV content: header columns, rows and non-fatal diagnostics
pub(crate) struct CsvContent {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Parse CSV text whose first record is the header
pub(crate) fn parse_csv(content: &str) -> Result<CsvContent, ParseError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    validate_header(&columns)?;

    let mut rows = Vec::new();
    let mut diagnostics = Vec::new();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
                diagnostics.push(ParseDiagnostic::new(line, format!("skipped record: {e}")));
                continue;
            }
        };

        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        if record.len() != columns.len() {
            diagnostics.push(ParseDiagnostic::new(
                line,
                format!(
                    "expected {} fields, found {}",
                    columns.len(),
                    record.len()
                ),
            ));
        }

        let row = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = record.get(i).map(Value::coerce).unwrap_or(Value::Null);
                (column.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok(CsvContent {
        columns,
        rows,
        diagnostics,
    })
}

fn validate_header(columns: &[String]) -> Result<(), ParseError> {
    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err(ParseError::InvalidHeader("header row is missing".to_string()));
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        if column.is_empty() {
            return Err(ParseError::InvalidHeader(format!(
                "column {} has an empty name",
                i + 1
            )));
        }
        if !seen.insert(column.as_str()) {
            return Err(ParseError::InvalidHeader(format!(
                "duplicate column '{column}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let parsed = parse_csv("name,age\nAlice,30\nBob,25").unwrap();
        assert_eq!(parsed.columns, vec!["name", "age"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].get("name"), Some(&Value::from("Alice")));
        assert_eq!(parsed.rows[1].get("age"), Some(&Value::from(25)));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_skips_blank_lines() {
        let parsed = parse_csv("a,b\n1,2\n\n3,4\n\n").unwrap();
        assert_eq!(parsed.rows.len(), 2);
    }

    #[test]
    fn test_all_empty_fields_make_a_null_row() {
        let parsed = parse_csv("a,b\n1,2\n,\n3,4\n").unwrap();
        assert_eq!(parsed.rows.len(), 3);
        assert!(parsed.rows[1].values().all(Value::is_null));
        assert_eq!(parsed.rows[1].len(), 2);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_quoted_fields() {
        let parsed = parse_csv("city,note\n\"Paris, FR\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(parsed.rows[0].get("city"), Some(&Value::from("Paris, FR")));
        assert_eq!(parsed.rows[0].get("note"), Some(&Value::from("said \"hi\"")));
    }

    #[test]
    fn test_ragged_rows_are_kept() {
        let parsed = parse_csv("a,b,c\n1,2\n4,5,6,7\n").unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.diagnostics.len(), 2);
        assert!(parsed.rows[0].get("c").unwrap().is_null());
        assert_eq!(parsed.rows[1].len(), 3);
        assert_eq!(parsed.diagnostics[0].position, 2);
    }

    #[test]
    fn test_header_is_trimmed() {
        let parsed = parse_csv(" id , name \n1,x\n").unwrap();
        assert_eq!(parsed.columns, vec!["id", "name"]);
    }

    #[test]
    fn test_bom_is_stripped() {
        let parsed = parse_csv("\u{feff}id\n1\n").unwrap();
        assert_eq!(parsed.columns, vec!["id"]);
    }

    #[test]
    fn test_duplicate_header() {
        let err = parse_csv("id,id\n1,2\n").err().unwrap();
        assert!(matches!(err, ParseError::InvalidHeader(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_empty_header_name() {
        let err = parse_csv("id,,name\n1,2,3\n").err().unwrap();
        assert!(matches!(err, ParseError::InvalidHeader(_)));
    }

    #[test]
    fn test_empty_content() {
        let err = parse_csv("").err().unwrap();
        assert!(matches!(err, ParseError::InvalidHeader(_)));
    }
}
