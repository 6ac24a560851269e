//! The `parse` command: show how a file is read, without calling the LLM

use std::path::PathBuf;

use tablesmith_core::parser::{self, ParsedFile};

use crate::error::CliError;
use crate::output::format_rows;

/// Arguments for the `parse` command
pub struct ParseArgs {
    /// CSV or JSON file to parse
    pub file: PathBuf,
    /// Rows to print
    pub limit: usize,
    /// Output format (table, json)
    pub format: String,
}

/// Handle the `parse` command
pub async fn handle_parse(args: &ParseArgs) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|source| CliError::FileReadError {
            path: args.file.clone(),
            source,
        })?;
    let file_name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());

    let parsed = parser::parse(&file_name, &content)?;
    println!("{}", render(&parsed, args.limit, &args.format)?);
    Ok(())
}

fn render(parsed: &ParsedFile, limit: usize, format: &str) -> Result<String, CliError> {
    match format {
        "json" => serde_json::to_string_pretty(parsed.sample(limit))
            .map_err(|e| CliError::InvalidArgument(e.to_string())),
        "table" => {
            let mut output = format!(
                "File:    {}\nFormat:  {}\nRows:    {}\nColumns: {}\n",
                parsed.file_name,
                parsed.format,
                parsed.row_count(),
                parsed.columns.join(", ")
            );
            for diagnostic in &parsed.diagnostics {
                output.push_str(&format!("Warning: {diagnostic}\n"));
            }
            output.push('\n');
            output.push_str(&format_rows(parsed.sample(limit)));
            Ok(output)
        }
        other => Err(CliError::InvalidArgument(format!(
            "unknown format '{other}' (expected table or json)"
        ))),
    }
}
