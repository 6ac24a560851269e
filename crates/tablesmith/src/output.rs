//! Output formatting for CLI

use tablesmith_core::pipeline::LogEntry;
use tablesmith_core::{ColumnAnalysis, Row, Severity, Value};

/// Format rows as a tab-separated table with a header
///
/// Columns come from the first row. Nulls are shown as `NULL`.
pub fn format_rows(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return "No rows.\n".to_string();
    };
    let columns: Vec<&str> = first.columns().collect();

    let mut output = String::new();
    output.push_str(&columns.join("\t"));
    output.push('\n');
    output.push_str(&columns.iter().map(|_| "---").collect::<Vec<_>>().join("\t"));
    output.push('\n');

    for row in rows {
        let values: Vec<String> = columns
            .iter()
            .map(|col| match row.get(col) {
                Some(Value::Null) | None => "NULL".to_string(),
                Some(value) => value.to_string(),
            })
            .collect();
        output.push_str(&values.join("\t"));
        output.push('\n');
    }

    output.push_str(&format!("\n{} row(s)\n", rows.len()));
    output
}

/// Format column analyses for review
pub fn format_columns(columns: &[ColumnAnalysis]) -> String {
    let name_width = columns
        .iter()
        .map(|c| c.column_name.len())
        .max()
        .unwrap_or(0);
    let type_width = columns
        .iter()
        .map(|c| c.inferred_sql_type.len())
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    for column in columns {
        output.push_str(&format!(
            "  {:<name_width$}  {:<type_width$}  {}",
            column.column_name, column.inferred_sql_type, column.semantic_type
        ));
        if !column.description.is_empty() {
            output.push_str(&format!(" - {}", column.description));
        }
        output.push('\n');
        for issue in &column.quality_issues {
            output.push_str(&format!("  {:<name_width$}  ! {issue}\n", ""));
        }
    }
    output
}

/// Format a pipeline log entry as a single line
pub fn format_log_entry(entry: &LogEntry) -> String {
    let marker = match entry.severity {
        Severity::Info => "-",
        Severity::Success => "✓",
        Severity::Warning => "!",
        Severity::Error => "✗",
    };
    format!(
        "[{}] {marker} {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablesmith_core::pipeline::PipelineLog;

    #[test]
    fn test_format_rows() {
        let rows = vec![
            Row::new().with("name", "Alice").with("age", 30),
            Row::new().with("name", "Bob").with("age", Value::Null),
        ];
        let output = format_rows(&rows);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "name\tage");
        assert_eq!(lines[1], "---\t---");
        assert_eq!(lines[2], "Alice\t30");
        assert_eq!(lines[3], "Bob\tNULL");
        assert!(output.ends_with("2 row(s)\n"));
    }

    #[test]
    fn test_format_rows_empty() {
        assert_eq!(format_rows(&[]), "No rows.\n");
    }

    #[test]
    fn test_format_columns() {
        let columns = vec![
            ColumnAnalysis::new("id", "INTEGER").with_semantic_type("identifier"),
            ColumnAnalysis::new("email", "VARCHAR")
                .with_semantic_type("email")
                .with_description("Contact address")
                .with_quality_issue("3 invalid addresses"),
        ];
        let output = format_columns(&columns);
        assert!(output.contains("  id     INTEGER  identifier\n"));
        assert!(output.contains("email  VARCHAR  email - Contact address"));
        assert!(output.contains("! 3 invalid addresses"));
    }

    #[test]
    fn test_format_log_entry() {
        let mut log = PipelineLog::new();
        let entry = log.append("Parsed 2 rows", Severity::Success).clone();
        let line = format_log_entry(&entry);
        assert!(line.ends_with("✓ Parsed 2 rows"));
        assert!(line.starts_with('['));
    }
}
