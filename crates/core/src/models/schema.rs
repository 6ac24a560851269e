//! Generated table schema and table naming

use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Table name used when nothing usable can be derived from the file name
pub const DEFAULT_TABLE_NAME: &str = "imported_data";

const IDENT: &str = r#""(?:[^"]|"")+"|[\p{L}_][\p{L}\p{N}_$]*"#;

static CREATE_TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:TEMP|TEMPORARY)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?({IDENT})(?:\s*\.\s*({IDENT}))?(?:\s|\(|;|$)"
    ))
    .unwrap()
});

/// A possibly schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    /// Create an unqualified table name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Create a schema-qualified table name
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// The name quoted for use in SQL text
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(&self.name)),
            None => quote_identifier(&self.name),
        }
    }

    /// Case-insensitive comparison of the unqualified name
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        TableName::new(name)
    }
}

/// Quote an identifier with double quotes, escaping embedded quotes
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn unquote_identifier(ident: &str) -> String {
    match ident.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => ident.to_string(),
    }
}

/// Derive a SQL-safe table name from an uploaded file name
///
/// `Sales Report (2024).csv` becomes `sales_report_2024`.
pub fn base_table_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let mut name = String::with_capacity(stem.len());
    for c in stem.chars() {
        let c = if c.is_ascii_alphanumeric() {
            c.to_ascii_lowercase()
        } else {
            '_'
        };
        // collapse runs of separators
        if c == '_' && name.ends_with('_') {
            continue;
        }
        name.push(c);
    }

    let name = name.trim_matches('_');
    if name.is_empty() {
        return DEFAULT_TABLE_NAME.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("t_{name}");
    }
    name.to_string()
}

/// Extract the table name a `CREATE TABLE` statement creates
pub fn parse_table_name(ddl: &str) -> Option<TableName> {
    let captures = CREATE_TABLE_NAME.captures(ddl)?;
    let first = unquote_identifier(captures.get(1)?.as_str());
    match captures.get(2) {
        Some(second) => Some(TableName::qualified(
            first,
            unquote_identifier(second.as_str()),
        )),
        None => Some(TableName::new(first)),
    }
}

/// A generated `CREATE TABLE` statement and the table it creates
///
/// `table` is parsed from the DDL itself and is what every later lookup
/// uses. `requested_name` is the name asked for when generating the DDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSchema {
    /// The DDL text
    pub ddl: String,
    /// Name derived from the file name and sent to the generator
    pub requested_name: String,
    /// Name of the table the DDL creates
    pub table: TableName,
}

impl GeneratedSchema {
    /// Build from DDL text, returning `None` if no table name can be found
    pub fn from_ddl(ddl: impl Into<String>, requested_name: impl Into<String>) -> Option<Self> {
        let ddl = ddl.into();
        let table = parse_table_name(&ddl)?;
        Some(Self {
            ddl,
            requested_name: requested_name.into(),
            table,
        })
    }

    /// Whether the DDL created the table that was asked for
    pub fn names_agree(&self) -> bool {
        self.table.matches(&self.requested_name)
    }
}
