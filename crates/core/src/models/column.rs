//! Column analysis produced by LLM schema inference

use serde::{Deserialize, Serialize};

/// Analysis of a single column, one per column of the uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAnalysis {
    /// Column name as it appears in the file
    #[serde(alias = "column_name")]
    pub column_name: String,
    /// SQL type suggested for the column (e.g. `INTEGER`, `VARCHAR`)
    #[serde(alias = "inferred_sql_type")]
    pub inferred_sql_type: String,
    /// What the values represent (e.g. "email", "currency")
    #[serde(default, alias = "semantic_type")]
    pub semantic_type: String,
    /// Short human readable description
    #[serde(default)]
    pub description: String,
    /// Data quality problems spotted in the sample
    #[serde(default, alias = "quality_issues")]
    pub quality_issues: Vec<String>,
}

impl ColumnAnalysis {
    /// Create an analysis with a name and SQL type
    pub fn new(column_name: impl Into<String>, inferred_sql_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            inferred_sql_type: inferred_sql_type.into(),
            semantic_type: String::new(),
            description: String::new(),
            quality_issues: Vec::new(),
        }
    }

    pub fn with_semantic_type(mut self, semantic_type: impl Into<String>) -> Self {
        self.semantic_type = semantic_type.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_quality_issue(mut self, issue: impl Into<String>) -> Self {
        self.quality_issues.push(issue.into());
        self
    }

    /// Check if any quality issues were reported
    pub fn has_issues(&self) -> bool {
        !self.quality_issues.is_empty()
    }
}
