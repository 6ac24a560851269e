//! Append-only pipeline log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique, increasing identifier
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

/// Ordered log of everything the pipeline did
///
/// Entries survive pipeline resets. Ids keep increasing across [`PipelineLog::clear`].
#[derive(Debug, Default)]
pub struct PipelineLog {
    entries: Vec<LogEntry>,
    next_id: u64,
}

impl PipelineLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and mirror it to `tracing`
    pub fn append(&mut self, message: impl Into<String>, severity: Severity) -> &LogEntry {
        let message = message.into();
        match severity {
            Severity::Info | Severity::Success => {
                tracing::info!(severity = severity.name(), "{message}")
            }
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }

        self.next_id += 1;
        self.entries.push(LogEntry {
            id: self.next_id,
            timestamp: Utc::now(),
            message,
            severity,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// All entries in order
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries appended after the entry with id `id`
    pub fn since(&self, id: u64) -> &[LogEntry] {
        let start = self.entries.partition_point(|e| e.id <= id);
        &self.entries[start..]
    }

    /// Entries with the given severity
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.severity == severity)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
