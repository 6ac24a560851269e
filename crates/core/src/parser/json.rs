//! JSON parsing: an array of objects or a single object

use serde_json::Value as JsonValue;

use super::ParseDiagnostic;
use super::error::ParseError;
use crate::models::{Row, Value};

/// Parsed JSON content: columns taken from the first object, rows and diagnostics
pub(crate) struct JsonContent {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

pub(crate) fn parse_json(content: &str) -> Result<JsonContent, ParseError> {
    let value: JsonValue = serde_json::from_str(content.trim_start_matches('\u{feff}'))?;

    let elements = match value {
        JsonValue::Array(items) => items,
        object @ JsonValue::Object(_) => vec![object],
        other => {
            return Err(ParseError::InvalidJsonShape(format!(
                "expected an array or an object, found {}",
                json_type_name(&other)
            )));
        }
    };

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(elements.len());
    let mut diagnostics = Vec::new();

    for (index, element) in elements.into_iter().enumerate() {
        let mut object = match element {
            JsonValue::Object(map) => map,
            other => {
                return Err(ParseError::InvalidJsonShape(format!(
                    "element {} is {}, expected an object",
                    index,
                    json_type_name(&other)
                )));
            }
        };

        if index == 0 {
            if object.is_empty() {
                return Err(ParseError::InvalidJsonShape(
                    "first element has no keys".to_string(),
                ));
            }
            columns = object.keys().cloned().collect();
        } else {
            let missing = columns.iter().filter(|c| !object.contains_key(*c)).count();
            let extra: Vec<&String> = object.keys().filter(|k| !columns.contains(k)).collect();
            if missing > 0 {
                diagnostics.push(ParseDiagnostic::new(
                    index + 1,
                    format!("{missing} column(s) missing, filled with null"),
                ));
            }
            if !extra.is_empty() {
                diagnostics.push(ParseDiagnostic::new(
                    index + 1,
                    format!(
                        "ignored key(s) not present in the first element: {}",
                        extra
                            .iter()
                            .map(|k| k.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                ));
            }
        }

        let row = columns
            .iter()
            .map(|column| {
                let value = object
                    .remove(column)
                    .map(Value::from_json)
                    .unwrap_or(Value::Null);
                (column.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok(JsonContent {
        columns,
        rows,
        diagnostics,
    })
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
