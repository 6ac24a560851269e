//! Error types for catalog operations

use thiserror::Error;

/// Errors that can occur in the catalog store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The database could not be opened
    #[error("Failed to open catalog database: {0}")]
    Init(String),

    /// A DDL or DML statement failed
    #[error("Statement failed: {0}")]
    Execution(String),

    /// The batch insert failed and was rolled back
    #[error("Insert failed{}: {message}", row.map(|r| format!(" at row {r}")).unwrap_or_default())]
    Insert {
        /// Zero-based index of the failing row, if a row was being written
        row: Option<usize>,
        message: String,
    },

    /// A read-back query failed
    #[error("Query error: {0}")]
    Query(String),

    /// No connection is open
    #[error("Catalog database is not open")]
    NotOpen,
}

impl From<duckdb::Error> for CatalogError {
    fn from(err: duckdb::Error) -> Self {
        CatalogError::Execution(err.to_string())
    }
}

impl CatalogError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::Insert { .. } => format!(
                "{self}\n\nNo rows were loaded. \
                Hint: Check that the generated column types accept the file's values."
            ),
            CatalogError::Execution(msg) => format!(
                "Statement failed: {msg}\n\nHint: Review the generated CREATE TABLE statement."
            ),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_error_display() {
        let err = CatalogError::Insert {
            row: Some(4),
            message: "Constraint Error".to_string(),
        };
        assert_eq!(err.to_string(), "Insert failed at row 4: Constraint Error");

        let err = CatalogError::Insert {
            row: None,
            message: "bad statement".to_string(),
        };
        assert_eq!(err.to_string(), "Insert failed: bad statement");
        assert!(err.user_message().contains("No rows were loaded"));
    }

    #[test]
    fn test_not_open_display() {
        assert_eq!(
            CatalogError::NotOpen.to_string(),
            "Catalog database is not open"
        );
    }
}
