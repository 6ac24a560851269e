//! The `run` command: file to table, with review prompts

use std::path::{Path, PathBuf};

use tablesmith_core::llm::LlmClient;
use tablesmith_core::pipeline::{Pipeline, PipelineEvent, PipelineStep};
use tablesmith_core::{AppConfig, GeminiClient};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::error::CliError;
use crate::output::{format_columns, format_log_entry, format_rows};

/// Arguments for the `run` command
pub struct RunArgs {
    /// CSV or JSON file to load
    pub file: PathBuf,
    /// Configuration file
    pub config: Option<PathBuf>,
    /// Model override
    pub model: Option<String>,
    /// Preview row limit override
    pub preview: Option<usize>,
    /// Write the generated DDL here
    pub sql_out: Option<PathBuf>,
    /// Accept every review step without prompting
    pub yes: bool,
}

/// Handle the `run` command
pub async fn handle_run(args: &RunArgs) -> Result<(), CliError> {
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    if let Some(model) = &args.model {
        config.llm = config.llm.with_model(model);
    }
    if let Some(preview) = args.preview {
        if preview == 0 {
            return Err(CliError::InvalidArgument(
                "--preview must be at least 1".to_string(),
            ));
        }
        config.pipeline = config.pipeline.with_preview_limit(preview);
    }

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

    let client = GeminiClient::from_config(&config.llm);
    let temperature = config.llm.temperature;
    let mut pipeline = Pipeline::from_client(client, config.pipeline)?.with_temperature(temperature);
    let mut events = pipeline.subscribe();
    ensure_running(&pipeline)?;

    // Shared by both prompts
    let mut input = BufReader::new(tokio::io::stdin());

    pipeline.upload(&file_name, &content).await?;
    drain_events(&mut events);
    ensure_running(&pipeline)?;

    if let Some(columns) = pipeline.state().columns() {
        println!("Inferred schema for {file_name}:");
        println!();
        print!("{}", format_columns(columns));
        println!();
    }
    confirm(&mut input, args.yes, "Generate a CREATE TABLE statement from this schema?").await?;

    pipeline.confirm_schema().await?;
    drain_events(&mut events);
    ensure_running(&pipeline)?;

    if let Some(schema) = pipeline.state().schema() {
        println!("{}", schema.ddl);
        println!();
        if let Some(path) = &args.sql_out {
            write_sql(path, &schema.ddl).await?;
            eprintln!("Wrote statement to {}", path.display());
        }
    }
    confirm(&mut input, args.yes, "Create the table and load all rows?").await?;

    pipeline.confirm_sql()?;
    drain_events(&mut events);
    ensure_running(&pipeline)?;

    if let (Some(preview), Some(summary)) = (pipeline.state().preview(), pipeline.state().summary())
    {
        println!();
        print!("{}", format_rows(preview));
        println!();
        println!(
            "Loaded {} rows into {} in {}ms (run {})",
            summary.rows_inserted, summary.table, summary.duration_ms, summary.run_id
        );
    }
    Ok(())
}

/// Fail with the pipeline's message once it has entered `Error`
fn ensure_running<C: LlmClient>(pipeline: &Pipeline<C>) -> Result<(), CliError> {
    if pipeline.step() == PipelineStep::Error {
        let message = match pipeline.last_error() {
            Some(err) => err.user_message(),
            None => pipeline.current_error().unwrap_or_default().to_string(),
        };
        return Err(CliError::PipelineFailed(message));
    }
    Ok(())
}

/// Print log entries emitted since the last call
fn drain_events(events: &mut broadcast::Receiver<PipelineEvent>) {
    loop {
        match events.try_recv() {
            Ok(PipelineEvent::Log(entry)) => eprintln!("{}", format_log_entry(&entry)),
            Ok(PipelineEvent::StepChanged { from, to }) => {
                tracing::debug!(from = from.name(), to = to.name(), "Step changed");
            }
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Dropped pipeline events");
            }
            Err(_) => break,
        }
    }
}

/// Ask for a yes/no answer on `input`, unless `--yes` was given
async fn confirm<R>(input: &mut R, assume_yes: bool, question: &str) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
{
    if assume_yes {
        return Ok(());
    }
    eprint!("{question} [y/N] ");

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .await
        .map_err(|source| CliError::FileReadError {
            path: PathBuf::from("<stdin>"),
            source,
        })?;

    if is_yes(&answer) {
        Ok(())
    } else {
        Err(CliError::Aborted)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn write_sql(path: &Path, ddl: &str) -> Result<(), CliError> {
    let mut content = ddl.trim_end().to_string();
    if !content.ends_with(';') {
        content.push(';');
    }
    content.push('\n');
    tokio::fs::write(path, content)
        .await
        .map_err(|source| CliError::FileWriteError {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[tokio::test]
    async fn test_confirm_reads_answers_from_one_input() {
        let mut input = BufReader::new(&b"y\nyes\nn\n"[..]);
        assert!(confirm(&mut input, false, "first?").await.is_ok());
        assert!(confirm(&mut input, false, "second?").await.is_ok());
        assert!(matches!(
            confirm(&mut input, false, "third?").await,
            Err(CliError::Aborted)
        ));
    }

    #[tokio::test]
    async fn test_confirm_at_end_of_input_aborts() {
        let mut input: &[u8] = b"y\n";
        assert!(confirm(&mut input, false, "first?").await.is_ok());
        assert!(matches!(
            confirm(&mut input, false, "second?").await,
            Err(CliError::Aborted)
        ));
        // --yes never touches the input
        assert!(confirm(&mut input, true, "third?").await.is_ok());
    }

    #[tokio::test]
    async fn test_write_sql_adds_terminator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.sql");
        write_sql(&path, "CREATE TABLE people (name TEXT)").await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "CREATE TABLE people (name TEXT);\n");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let args = RunArgs {
            file: PathBuf::from("/nonexistent/people.csv"),
            config: None,
            model: None,
            preview: None,
            sql_out: None,
            yes: true,
        };
        let err = handle_run(&args).await.unwrap_err();
        assert!(matches!(err, CliError::FileReadError { .. }));
    }
}
