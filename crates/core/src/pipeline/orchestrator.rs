//! Pipeline orchestrator
//!
//! Drives a single run through parse, schema inference, SQL generation and
//! loading. Each trigger takes `&mut self`, so a run cannot be re-entered
//! while a step is in flight.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use super::config::PipelineConfig;
use super::error::{PipelineError, PipelineResult};
use super::log::{LogEntry, PipelineLog, Severity};
use super::state::{PipelineState, PipelineStep, RunSummary};
use crate::catalog::CatalogStore;
use crate::llm::{LlmClient, LlmError, SchemaInferrer, SqlGenerator, coverage_warnings};
use crate::models::{ColumnAnalysis, GeneratedSchema, Row, base_table_name};
use crate::parser::{self, ParsedFile};

/// Parse diagnostics logged individually before summarising the rest
const MAX_LOGGED_DIAGNOSTICS: usize = 5;

const EVENT_CAPACITY: usize = 256;

/// Something observers of the pipeline may want to render
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A log entry was appended
    Log(LogEntry),
    /// The pipeline moved to another step
    StepChanged { from: PipelineStep, to: PipelineStep },
}

/// ETL pipeline: file in, table out
///
/// # Example
///
/// ```ignore
/// let mut pipeline = Pipeline::new(client, PipelineConfig::default())?;
/// pipeline.upload("people.csv", &content).await?;
/// pipeline.confirm_schema().await?;
/// pipeline.confirm_sql()?;
/// println!("{:?}", pipeline.state().preview());
/// ```
pub struct Pipeline<C: LlmClient> {
    /// The LLM client, or why there is none
    client: Result<Arc<C>, String>,
    config: PipelineConfig,
    temperature: f32,
    state: PipelineState,
    last_error: Option<PipelineError>,
    log: PipelineLog,
    store: CatalogStore,
    run_id: Option<String>,
    started_at: Option<Instant>,
    events: broadcast::Sender<PipelineEvent>,
}

impl<C: LlmClient> Pipeline<C> {
    /// Create a pipeline with a working LLM client
    pub fn new(client: C, config: PipelineConfig) -> PipelineResult<Self> {
        Self::from_client(Ok(client), config)
    }

    /// Create a pipeline from the outcome of building an LLM client
    ///
    /// A failed client leaves the pipeline in `Error` until [`Pipeline::set_client`]
    /// is called and the pipeline is reset.
    pub fn from_client(client: Result<C, LlmError>, config: PipelineConfig) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::ConfigError)?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut pipeline = Self {
            client: Err(String::new()),
            config,
            temperature: 0.1,
            state: PipelineState::Upload,
            last_error: None,
            log: PipelineLog::new(),
            store: CatalogStore::new(),
            run_id: None,
            started_at: None,
            events,
        };

        match client {
            Ok(client) => pipeline.client = Ok(Arc::new(client)),
            Err(err) => {
                let err = PipelineError::from(err);
                pipeline.client = Err(err.to_string());
                pipeline.fail(err)?;
            }
        }
        Ok(pipeline)
    }

    /// Set the sampling temperature for LLM requests
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Install an LLM client, satisfying the client precondition
    ///
    /// The pipeline stays in `Error` until the next reset.
    pub fn set_client(&mut self, client: C) {
        self.client = Ok(Arc::new(client));
    }

    /// Get the current state
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Get the current step
    pub fn step(&self) -> PipelineStep {
        self.state.step()
    }

    /// Message of the current error, if in `Error`
    pub fn current_error(&self) -> Option<&str> {
        self.state.error()
    }

    /// Typed cause of the current error, if in `Error`
    pub fn last_error(&self) -> Option<&PipelineError> {
        self.last_error.as_ref()
    }

    pub fn log(&self) -> &PipelineLog {
        &self.log
    }

    /// Remove all log entries
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Id of the current run, if one was started
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Subscribe to log and step events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Parse an uploaded file and infer its schema
    ///
    /// `Upload` → `AnalyzingSchema` → `ReviewSchema`, or `Error` when a
    /// component fails. Returns `Err` only when the trigger is not accepted in
    /// the current step.
    pub async fn upload(&mut self, file_name: &str, content: &str) -> PipelineResult<PipelineStep> {
        let Some(client) = self.require_client()? else {
            return Ok(PipelineStep::Error);
        };
        self.require_step(PipelineStep::Upload, "upload a file")?;

        let run_id = Uuid::new_v4().to_string();
        self.run_id = Some(run_id.clone());
        self.started_at = Some(Instant::now());

        let span = info_span!("pipeline_run", run_id = %run_id, file = file_name);
        self.run_upload(client, file_name, content)
            .instrument(span)
            .await
    }

    async fn run_upload(
        &mut self,
        client: Arc<C>,
        file_name: &str,
        content: &str,
    ) -> PipelineResult<PipelineStep> {
        info!(file = file_name, bytes = content.len(), "Starting pipeline run");

        let file = match parser::parse(file_name, content) {
            Ok(file) => file,
            Err(err) => return self.fail(err.into()),
        };
        self.record(
            format!(
                "Parsed {} rows with {} columns from {} ({})",
                file.row_count(),
                file.columns.len(),
                file.file_name,
                file.format
            ),
            Severity::Success,
        );
        self.record_diagnostics(&file);

        self.advance(
            PipelineState::AnalyzingSchema {
                file_name: file.file_name.clone(),
            },
            format!(
                "Analyzing schema from a {}-row sample with {}",
                self.config.sample_size.min(file.row_count()),
                client.model_name()
            ),
            Severity::Info,
        )?;

        let inferrer = SchemaInferrer::new(client)
            .with_sample_size(self.config.sample_size)
            .with_temperature(self.temperature);
        let result = {
            let inferrer = &inferrer;
            let file = &file;
            self.call_llm(PipelineStep::AnalyzingSchema, move || {
                inferrer.infer_schema(&file.rows, &file.file_name)
            })
            .await
        };
        let columns = match result {
            Ok(columns) => columns,
            Err(err) => return self.fail(err),
        };

        for warning in coverage_warnings(&columns, &file.columns) {
            self.record(warning, Severity::Warning);
        }
        self.advance(
            PipelineState::ReviewSchema { file, columns },
            "",
            Severity::Success,
        )?;
        Ok(self.step())
    }

    /// Accept the inferred schema and generate the `CREATE TABLE` statement
    ///
    /// `ReviewSchema` → `GeneratingSql` → `ReviewSql`, or `Error`.
    pub async fn confirm_schema(&mut self) -> PipelineResult<PipelineStep> {
        let Some(client) = self.require_client()? else {
            return Ok(PipelineStep::Error);
        };
        self.require_step(PipelineStep::ReviewSchema, "confirm the schema")?;

        let span = info_span!("pipeline_run", run_id = self.run_id.as_deref().unwrap_or_default());
        self.run_confirm_schema(client).instrument(span).await
    }

    async fn run_confirm_schema(&mut self, client: Arc<C>) -> PipelineResult<PipelineStep> {
        let table_name = match self.state.file() {
            Some(file) => base_table_name(&file.file_name),
            None => return Err(self.reject("confirm the schema")),
        };

        let previous = self.advance(
            PipelineState::GeneratingSql {
                table_name: table_name.clone(),
            },
            format!("Generating CREATE TABLE statement for '{table_name}'"),
            Severity::Info,
        )?;
        let PipelineState::ReviewSchema { file, columns } = previous else {
            return Err(PipelineError::IllegalTransition {
                from: previous.step(),
                to: PipelineStep::GeneratingSql,
            });
        };

        let generator = SqlGenerator::new(client).with_temperature(self.temperature);
        let result = {
            let generator = &generator;
            let columns = &columns;
            let table_name = table_name.as_str();
            self.call_llm(PipelineStep::GeneratingSql, move || {
                generator.generate_schema(columns, table_name)
            })
            .await
        };
        let schema = match result {
            Ok(schema) => schema,
            Err(err) => return self.fail(err),
        };

        if !schema.names_agree() {
            self.record(
                format!(
                    "Generated statement creates table '{}' instead of '{}'; using '{}'",
                    schema.table, schema.requested_name, schema.table
                ),
                Severity::Warning,
            );
        }

        self.advance(
            PipelineState::ReviewSql {
                file,
                columns,
                schema,
            },
            "",
            Severity::Success,
        )?;
        Ok(self.step())
    }

    /// Accept the DDL, create the table, load all rows and fetch a preview
    ///
    /// `ReviewSql` → `ProcessingDb` → `Done`, or `Error`. The store is closed
    /// on every failure path.
    pub fn confirm_sql(&mut self) -> PipelineResult<PipelineStep> {
        if self.require_client()?.is_none() {
            return Ok(PipelineStep::Error);
        }
        self.require_step(PipelineStep::ReviewSql, "confirm the SQL")?;

        let span = info_span!("pipeline_run", run_id = self.run_id.as_deref().unwrap_or_default());
        let _guard = span.enter();

        let table = match self.state.schema() {
            Some(schema) => schema.table.clone(),
            None => return Err(self.reject("confirm the SQL")),
        };

        let previous = self.advance(
            PipelineState::ProcessingDb {
                table: table.clone(),
            },
            format!("Creating table '{table}'"),
            Severity::Info,
        )?;
        let PipelineState::ReviewSql {
            file,
            columns,
            schema,
        } = previous
        else {
            return Err(PipelineError::IllegalTransition {
                from: previous.step(),
                to: PipelineStep::ProcessingDb,
            });
        };

        let (rows_inserted, preview) = match self.load(&file, &schema) {
            Ok(loaded) => loaded,
            Err(err) => return self.fail(err),
        };

        let summary = RunSummary {
            run_id: self.run_id.clone().unwrap_or_default(),
            table,
            rows_inserted,
            duration_ms: self
                .started_at
                .map(|start| start.elapsed().as_millis() as u64)
                .unwrap_or(0),
        };
        info!(
            run_id = %summary.run_id,
            table = %summary.table,
            rows = summary.rows_inserted,
            duration_ms = summary.duration_ms,
            "Pipeline completed"
        );

        self.advance(
            PipelineState::Done {
                file,
                columns,
                schema,
                preview,
                summary,
            },
            "",
            Severity::Info,
        )?;
        Ok(self.step())
    }

    /// Tear down the run and return to `Upload`
    ///
    /// Closes the store and discards all derived data; the log is kept. While
    /// no LLM client is available the pipeline stays in `Error`.
    pub fn reset(&mut self) -> PipelineResult<PipelineStep> {
        if self.store.close() {
            debug!("Closed catalog database on reset");
        }
        self.run_id = None;
        self.started_at = None;

        if let Err(message) = &self.client {
            let message = message.clone();
            self.last_error = Some(PipelineError::ConfigError(message.clone()));
            self.advance(
                PipelineState::Error {
                    message: message.clone(),
                },
                format!("Cannot reset: {message}"),
                Severity::Error,
            )?;
            return Ok(self.step());
        }

        self.last_error = None;
        self.advance(PipelineState::Upload, "Pipeline reset", Severity::Info)?;
        Ok(self.step())
    }

    /// Open the store, run the DDL, insert every row and read the preview back
    fn load(
        &mut self,
        file: &ParsedFile,
        schema: &GeneratedSchema,
    ) -> PipelineResult<(usize, Vec<Row>)> {
        let session_key = self
            .run_id
            .clone()
            .unwrap_or_else(CatalogStore::generate_session_key);
        self.store.open(&session_key)?;
        self.store.execute(&schema.ddl)?;
        self.record(format!("Created table '{}'", schema.table), Severity::Info);

        let inserted = self.store.batch_insert(&schema.table, &file.rows)?;
        self.record(
            format!("Inserted {inserted} rows into '{}'", schema.table),
            Severity::Success,
        );

        let preview = self.store.query(&schema.table, self.config.preview_limit)?;
        self.record(
            format!("Loaded preview of {} rows", preview.len()),
            Severity::Success,
        );
        Ok((inserted, preview))
    }

    /// Run an LLM step under the step timeout, retrying transient failures
    async fn call_llm<T, E, F, Fut>(&mut self, step: PipelineStep, mut op: F) -> PipelineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<PipelineError>,
    {
        let seconds = self.config.step_timeout_secs;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
        let mut attempt = 0;

        loop {
            let err: PipelineError = match tokio::time::timeout_at(deadline, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err.into(),
                Err(_) => return Err(PipelineError::Timeout { step, seconds }),
            };

            let delay = match err.retry_delay() {
                Some(delay) if attempt < self.config.max_retries => delay,
                _ => return Err(err),
            };
            attempt += 1;
            let delay = delay.max(Duration::from_millis(self.config.retry_delay_ms));
            self.record(
                format!(
                    "{err}; retrying in {}ms (attempt {attempt} of {})",
                    delay.as_millis(),
                    self.config.max_retries
                ),
                Severity::Warning,
            );

            if tokio::time::timeout_at(deadline, tokio::time::sleep(delay))
                .await
                .is_err()
            {
                return Err(PipelineError::Timeout { step, seconds });
            }
        }
    }

    /// Get the LLM client, entering `Error` when there is none
    fn require_client(&mut self) -> PipelineResult<Option<Arc<C>>> {
        match &self.client {
            Ok(client) => Ok(Some(Arc::clone(client))),
            Err(message) => {
                if self.step() != PipelineStep::Error {
                    let err = PipelineError::ConfigError(message.clone());
                    self.fail(err)?;
                }
                Ok(None)
            }
        }
    }

    fn require_step(&mut self, expected: PipelineStep, trigger: &'static str) -> PipelineResult<()> {
        if self.step() == expected {
            Ok(())
        } else {
            Err(self.reject(trigger))
        }
    }

    /// Log a rejected trigger; the state is left untouched
    fn reject(&mut self, trigger: &'static str) -> PipelineError {
        let err = PipelineError::InvalidTrigger {
            trigger,
            step: self.step(),
        };
        self.record(format!("Ignored request: {err}"), Severity::Warning);
        err
    }

    /// Move to `next`, logging `message`, and return the previous state
    ///
    /// An empty message logs a default line for the new step.
    fn advance(
        &mut self,
        next: PipelineState,
        message: impl Into<String>,
        severity: Severity,
    ) -> PipelineResult<PipelineState> {
        let from = self.step();
        let to = next.step();
        if !from.can_transition_to(to) {
            return Err(PipelineError::IllegalTransition { from, to });
        }

        let mut message = message.into();
        if message.is_empty() {
            message = describe(&next);
        }

        let previous = std::mem::replace(&mut self.state, next);
        debug!(from = from.name(), to = to.name(), "Pipeline step changed");
        self.record(message, severity);
        let _ = self.events.send(PipelineEvent::StepChanged { from, to });
        Ok(previous)
    }

    /// Enter `Error` with the failure's message and close the store
    fn fail(&mut self, err: PipelineError) -> PipelineResult<PipelineStep> {
        let mut message = err.to_string();
        if message.trim().is_empty() {
            message = "Unknown pipeline error".to_string();
        }

        self.store.close();
        self.last_error = Some(err);
        self.advance(
            PipelineState::Error {
                message: message.clone(),
            },
            message,
            Severity::Error,
        )?;
        Ok(PipelineStep::Error)
    }

    fn record(&mut self, message: impl Into<String>, severity: Severity) {
        let entry = self.log.append(message, severity).clone();
        let _ = self.events.send(PipelineEvent::Log(entry));
    }

    fn record_diagnostics(&mut self, file: &ParsedFile) {
        for diagnostic in file.diagnostics.iter().take(MAX_LOGGED_DIAGNOSTICS) {
            self.record(diagnostic.to_string(), Severity::Warning);
        }
        if file.diagnostics.len() > MAX_LOGGED_DIAGNOSTICS {
            self.record(
                format!(
                    "{} more records had problems",
                    file.diagnostics.len() - MAX_LOGGED_DIAGNOSTICS
                ),
                Severity::Warning,
            );
        }
    }
}

/// Default log line when entering a state
fn describe(state: &PipelineState) -> String {
    match state {
        PipelineState::ReviewSchema { columns, .. } => describe_columns(columns),
        PipelineState::ReviewSql { schema, .. } => {
            format!("Generated CREATE TABLE statement for '{}'", schema.table)
        }
        PipelineState::Done { summary, .. } => format!(
            "Loaded {} rows into '{}' in {}ms",
            summary.rows_inserted, summary.table, summary.duration_ms
        ),
        other => format!("Entered step '{}'", other.step()),
    }
}

fn describe_columns(columns: &[ColumnAnalysis]) -> String {
    let issues: usize = columns.iter().map(|c| c.quality_issues.len()).sum();
    match issues {
        0 => format!("Inferred schema for {} columns", columns.len()),
        n => format!(
            "Inferred schema for {} columns ({n} quality issues reported)",
            columns.len()
        ),
    }
}
