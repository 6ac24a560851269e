//! Prompt templates and response clean-up
//!
//! Two prompts are sent per run: one asking for column analyses as a JSON
//! array, one asking for a single `CREATE TABLE` statement. Both responses
//! may arrive wrapped in a Markdown code fence.

use crate::models::{ColumnAnalysis, Row, Value};

/// Prompt template for schema inference
pub const SCHEMA_INFERENCE_PROMPT: &str = r#"You are a data engineer. Analyze the following sample taken from the file "{file_name}".

## Sample ({row_count} rows, comma-delimited, first line is the header)
```
{sample}
```

## Task
For every column in the header, return one object with exactly these fields:
- "columnName": the column name exactly as it appears in the header
- "inferredSqlType": a DuckDB SQL type (e.g. INTEGER, BIGINT, DOUBLE, BOOLEAN, DATE, TIMESTAMP, VARCHAR)
- "semanticType": what the values represent (e.g. "email", "currency", "identifier", "person name")
- "description": one short sentence describing the column
- "qualityIssues": an array of strings describing problems seen in the sample (empty array if none)

## Output
Return ONLY a JSON array with one object per column, in header order. Do not include any explanation or markdown formatting."#;

/// Prompt template for SQL generation
pub const SQL_GENERATION_PROMPT: &str = r#"You are a database engineer. Write a DuckDB CREATE TABLE statement for a table named "{table_name}".

## Columns
```json
{columns}
```

## Rules
1. Use the table name "{table_name}" exactly
2. Keep every column name exactly as given, in the given order, quoting names that are not plain identifiers
3. Use each column's inferredSqlType unless it is not valid DuckDB
4. Do not add constraints that the sample data may violate

## Output
Return ONLY the CREATE TABLE statement. Do not include any explanation or markdown formatting."#;

/// Build the schema inference prompt for a sample
pub fn schema_inference_prompt(file_name: &str, sample: &[Row]) -> String {
    SCHEMA_INFERENCE_PROMPT
        .replace("{file_name}", file_name)
        .replace("{row_count}", &sample.len().to_string())
        .replace("{sample}", &render_sample(sample))
}

/// Build the SQL generation prompt for analysed columns
pub fn sql_generation_prompt(
    columns: &[ColumnAnalysis],
    table_name: &str,
) -> serde_json::Result<String> {
    let columns_json = serde_json::to_string_pretty(columns)?;
    Ok(SQL_GENERATION_PROMPT
        .replace("{columns}", &columns_json)
        .replace("{table_name}", table_name))
}

/// Render rows as a comma-delimited block: a header line, then one line per row
pub fn render_sample(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        first
            .columns()
            .map(escape_field)
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        lines.push(
            row.values()
                .map(|value| match value {
                    Value::Null => String::new(),
                    other => escape_field(&other.to_string()),
                })
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Remove an optional Markdown code fence around a response
///
/// Handles a leading fence with or without a language tag (```` ```json ````)
/// and a trailing fence, each independently. Text without fences is only
/// trimmed.
pub fn strip_code_fence(response: &str) -> &str {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // a language tag only counts when the fence line ends after it
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let tag = rest[..line_end].trim();
        let is_tag = tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'));
        text = if is_tag { &rest[line_end..] } else { rest };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Row> {
        vec![
            Row::new().with("name", "Alice").with("age", 30),
            Row::new().with("name", "Smith, Bob").with("age", Value::Null),
        ]
    }

    #[test]
    fn test_render_sample() {
        let rendered = render_sample(&sample());
        assert_eq!(rendered, "name,age\nAlice,30\n\"Smith, Bob\",");
    }

    #[test]
    fn test_render_sample_quotes() {
        let rows = vec![Row::new().with("note", "said \"hi\"")];
        assert_eq!(render_sample(&rows), "note\n\"said \"\"hi\"\"\"");
        assert_eq!(render_sample(&[]), "");
    }

    #[test]
    fn test_schema_inference_prompt() {
        let prompt = schema_inference_prompt("people.csv", &sample());
        assert!(prompt.contains("\"people.csv\""));
        assert!(prompt.contains("2 rows"));
        assert!(prompt.contains("name,age\nAlice,30"));
        assert!(prompt.contains("qualityIssues"));
        assert!(!prompt.contains("{sample}"));
    }

    #[test]
    fn test_sql_generation_prompt() {
        let columns = vec![ColumnAnalysis::new("id", "INTEGER")];
        let prompt = sql_generation_prompt(&columns, "orders").unwrap();
        assert!(prompt.contains("table named \"orders\""));
        assert!(prompt.contains("\"columnName\": \"id\""));
        assert!(!prompt.contains("{table_name}"));
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("[1, 2]"), "[1, 2]");
        assert_eq!(strip_code_fence("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fence("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fence("  ```sql\nCREATE TABLE t (id INT);\n```  "), "CREATE TABLE t (id INT);");
        assert_eq!(strip_code_fence("```json\n[1]"), "[1]");
        assert_eq!(strip_code_fence("[1]\n```"), "[1]");
    }

    #[test]
    fn test_strip_code_fence_inline() {
        assert_eq!(strip_code_fence("```[1, 2]```"), "[1, 2]");
        assert_eq!(
            strip_code_fence("```CREATE TABLE t (id INT)```"),
            "CREATE TABLE t (id INT)"
        );
    }
}
