//! Tablesmith CLI - load CSV/JSON files into DuckDB tables with LLM-assisted schemas

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::check::{CheckArgs, handle_check};
use commands::parse::{ParseArgs, handle_parse};
use commands::run::{RunArgs, handle_run};
use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "tablesmith", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Infer a schema, generate DDL and load a file into DuckDB
    Run {
        /// CSV or JSON file
        file: PathBuf,

        /// Accept the schema and SQL without prompting
        #[arg(short, long)]
        yes: bool,

        /// Configuration file (defaults to ./tablesmith.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Rows to show after loading
        #[arg(long)]
        preview: Option<usize>,

        /// Write the generated CREATE TABLE statement to a file
        #[arg(long)]
        sql_out: Option<PathBuf>,
    },
    /// Parse a file and print its rows without calling the LLM
    Parse {
        /// CSV or JSON file
        file: PathBuf,

        /// Rows to print
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Output format: table, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Validate configuration and check the API key is available
    Check {
        /// Configuration file (defaults to ./tablesmith.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Run {
            file,
            yes,
            config,
            model,
            preview,
            sql_out,
        } => {
            handle_run(&RunArgs {
                file,
                config,
                model,
                preview,
                sql_out,
                yes,
            })
            .await
        }
        Commands::Parse {
            file,
            limit,
            format,
        } => handle_parse(&ParseArgs { file, limit, format }).await,
        Commands::Check { config } => handle_check(&CheckArgs { config }),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Aborted) => {
            eprintln!("Aborted.");
            ExitCode::from(130)
        }
        Err(err) => {
            eprintln!("Error: {}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "tablesmith",
            "run",
            "people.csv",
            "--yes",
            "--preview",
            "3",
            "--sql-out",
            "people.sql",
        ]);
        match cli.command {
            Commands::Run {
                file,
                yes,
                preview,
                sql_out,
                ..
            } => {
                assert_eq!(file, PathBuf::from("people.csv"));
                assert!(yes);
                assert_eq!(preview, Some(3));
                assert_eq!(sql_out, Some(PathBuf::from("people.sql")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
