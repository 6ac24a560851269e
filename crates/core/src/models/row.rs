//! Row and cell value types produced by the data parser

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Number;

/// A single scalar cell value
///
/// The variant set is closed: nested JSON arrays and objects are carried as
/// their JSON text.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing or empty value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer or floating point number
    Number(Number),
    /// Free text
    Text(String),
}

impl Value {
    /// Coerce a raw CSV field into a typed value
    ///
    /// - empty (or whitespace-only) fields become `Null`
    /// - `true` / `false` (any case) become booleans
    /// - integer and decimal literals become numbers
    /// - everything else is kept verbatim as text
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }

        if looks_numeric(trimmed) {
            if let Ok(i) = trimmed.parse::<i64>() {
                return Value::Number(i.into());
            }
            if let Ok(f) = trimmed.parse::<f64>()
                && let Some(n) = Number::from_f64(f)
            {
                return Value::Number(n);
            }
        }

        Value::Text(raw.to_string())
    }

    /// Convert a parsed JSON value into a cell value
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::Text(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::Text(nested.to_string())
            }
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Only strings made of digits, signs, dots and exponents are numeric
/// candidates. Keeps `inf`, `NaN` and friends as text.
fn looks_numeric(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
}

/// An ordered mapping from column name to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty row with room for `capacity` columns
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Set a column value, keeping the original position if the column exists
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Builder-style variant of [`Row::insert`]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value.into());
        self
    }

    /// Get the value of a column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    /// Iterate over `(column, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(Value::coerce("30"), Value::Number(30.into()));
        assert_eq!(Value::coerce(" -7 "), Value::Number((-7).into()));
        assert_eq!(
            Value::coerce("2.5"),
            Value::Number(Number::from_f64(2.5).unwrap())
        );
        assert_eq!(
            Value::coerce("1e3"),
            Value::Number(Number::from_f64(1000.0).unwrap())
        );
    }

    #[test]
    fn test_coerce_booleans_and_null() {
        assert_eq!(Value::coerce("true"), Value::Bool(true));
        assert_eq!(Value::coerce("FALSE"), Value::Bool(false));
        assert_eq!(Value::coerce(""), Value::Null);
        assert_eq!(Value::coerce("   "), Value::Null);
    }

    #[test]
    fn test_coerce_keeps_text() {
        assert_eq!(Value::coerce("Alice"), Value::Text("Alice".to_string()));
        assert_eq!(Value::coerce("NaN"), Value::Text("NaN".to_string()));
        assert_eq!(Value::coerce("inf"), Value::Text("inf".to_string()));
        assert_eq!(Value::coerce("1-2-3"), Value::Text("1-2-3".to_string()));
        assert_eq!(Value::coerce("--"), Value::Text("--".to_string()));
    }

    #[test]
    fn test_from_json_nested() {
        let value = Value::from_json(serde_json::json!({"a": [1, 2]}));
        assert_eq!(value, Value::Text(r#"{"a":[1,2]}"#.to_string()));
    }

    #[test]
    fn test_row_preserves_order() {
        let row = Row::new().with("name", "Alice").with("age", 30);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["name", "age"]);
        assert_eq!(row.get("age"), Some(&Value::Number(30.into())));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_row_insert_replaces() {
        let mut row = Row::new().with("a", 1).with("b", 2);
        row.insert("a", Value::Null);
        assert_eq!(row.len(), 2);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(row.get("a").unwrap().is_null());
    }

    #[test]
    fn test_row_serialize() {
        let mut row = Row::new()
            .with("name", "Bob")
            .with("active", true)
            .with("score", 7);
        row.insert("note", Value::Null);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Bob","active":true,"score":7,"note":null}"#
        );
    }
}
