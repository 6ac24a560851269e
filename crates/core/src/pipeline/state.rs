//! Pipeline steps and state
//!
//! Each [`PipelineState`] variant carries exactly the data its step owns, so
//! for example a preview can only exist once the run is `Done`.

use serde::{Deserialize, Serialize};

use crate::models::{ColumnAnalysis, GeneratedSchema, Row, TableName};
use crate::parser::ParsedFile;

/// Pipeline steps in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Upload,
    AnalyzingSchema,
    ReviewSchema,
    GeneratingSql,
    ReviewSql,
    ProcessingDb,
    Done,
    Error,
}

impl PipelineStep {
    /// Get the step name
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStep::Upload => "upload",
            PipelineStep::AnalyzingSchema => "analyzing_schema",
            PipelineStep::ReviewSchema => "review_schema",
            PipelineStep::GeneratingSql => "generating_sql",
            PipelineStep::ReviewSql => "review_sql",
            PipelineStep::ProcessingDb => "processing_db",
            PipelineStep::Done => "done",
            PipelineStep::Error => "error",
        }
    }

    /// Check if `next` may follow this step
    ///
    /// Runs move strictly forward one step at a time. `Error` and `Upload`
    /// (reset) are reachable from every step.
    pub fn can_transition_to(&self, next: PipelineStep) -> bool {
        use PipelineStep::*;
        match next {
            Error | Upload => true,
            AnalyzingSchema => *self == Upload,
            ReviewSchema => *self == AnalyzingSchema,
            GeneratingSql => *self == ReviewSchema,
            ReviewSql => *self == GeneratingSql,
            ProcessingDb => *self == ReviewSql,
            Done => *self == ProcessingDb,
        }
    }

    /// Check if this step waits for the user
    pub fn is_review(&self) -> bool {
        matches!(self, PipelineStep::ReviewSchema | PipelineStep::ReviewSql)
    }

    /// Check if this step ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStep::Done | PipelineStep::Error)
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    /// Table the rows were loaded into
    pub table: TableName,
    pub rows_inserted: usize,
    pub duration_ms: u64,
}

/// Current pipeline state with the data derived so far
#[derive(Debug, Clone, Default)]
pub enum PipelineState {
    /// Waiting for a file
    #[default]
    Upload,
    /// Schema inference in progress
    AnalyzingSchema { file_name: String },
    /// Column analyses ready for review
    ReviewSchema {
        file: ParsedFile,
        columns: Vec<ColumnAnalysis>,
    },
    /// SQL generation in progress
    GeneratingSql { table_name: String },
    /// DDL ready for review
    ReviewSql {
        file: ParsedFile,
        columns: Vec<ColumnAnalysis>,
        schema: GeneratedSchema,
    },
    /// Creating the table and loading rows
    ProcessingDb { table: TableName },
    /// Rows loaded and previewed
    Done {
        file: ParsedFile,
        columns: Vec<ColumnAnalysis>,
        schema: GeneratedSchema,
        preview: Vec<Row>,
        summary: RunSummary,
    },
    /// The run failed
    Error { message: String },
}

impl PipelineState {
    /// Get the step this state belongs to
    pub fn step(&self) -> PipelineStep {
        match self {
            PipelineState::Upload => PipelineStep::Upload,
            PipelineState::AnalyzingSchema { .. } => PipelineStep::AnalyzingSchema,
            PipelineState::ReviewSchema { .. } => PipelineStep::ReviewSchema,
            PipelineState::GeneratingSql { .. } => PipelineStep::GeneratingSql,
            PipelineState::ReviewSql { .. } => PipelineStep::ReviewSql,
            PipelineState::ProcessingDb { .. } => PipelineStep::ProcessingDb,
            PipelineState::Done { .. } => PipelineStep::Done,
            PipelineState::Error { .. } => PipelineStep::Error,
        }
    }

    /// The parsed file, once parsing succeeded
    pub fn file(&self) -> Option<&ParsedFile> {
        match self {
            PipelineState::ReviewSchema { file, .. }
            | PipelineState::ReviewSql { file, .. }
            | PipelineState::Done { file, .. } => Some(file),
            _ => None,
        }
    }

    /// Column analyses, once inference succeeded
    pub fn columns(&self) -> Option<&[ColumnAnalysis]> {
        match self {
            PipelineState::ReviewSchema { columns, .. }
            | PipelineState::ReviewSql { columns, .. }
            | PipelineState::Done { columns, .. } => Some(columns),
            _ => None,
        }
    }

    /// The generated schema, once SQL generation succeeded
    pub fn schema(&self) -> Option<&GeneratedSchema> {
        match self {
            PipelineState::ReviewSql { schema, .. } | PipelineState::Done { schema, .. } => {
                Some(schema)
            }
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&[Row]> {
        match self {
            PipelineState::Done { preview, .. } => Some(preview),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            PipelineState::Done { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// The error message, when in `Error`
    pub fn error(&self) -> Option<&str> {
        match self {
            PipelineState::Error { message } => Some(message),
            _ => None,
        }
    }
}
