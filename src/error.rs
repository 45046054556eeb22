//! Error types for the readmission pipeline
//!
//! Normalization failures abort a run. Statistical failures are carried per
//! step inside the reports so the remaining steps still produce output.

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the analysis pipeline
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisError {
    /// A configured column is absent or has an incompatible type
    #[error("schema error in {dataset}: column '{column}' {reason}")]
    Schema {
        dataset: String,
        column: String,
        reason: String,
    },

    /// A key that must be unique occurs more than once
    #[error("duplicate key in {dataset}: {key}")]
    DuplicateKey { dataset: String, key: String },

    /// The data cannot support the requested statistic
    #[error("not applicable: {0}")]
    StatisticalPrecondition(String),

    /// A chained step could not run because its prerequisite failed
    #[error("{step} skipped: {cause}")]
    DependencyFailed { step: String, cause: String },

    #[error("unknown grouping field '{0}'")]
    UnknownGroupingField(String),

    #[error("polars: {0}")]
    Polars(String),
}

impl AnalysisError {
    pub fn schema(dataset: &str, column: &str, reason: &str) -> Self {
        AnalysisError::Schema {
            dataset: dataset.to_string(),
            column: column.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        AnalysisError::StatisticalPrecondition(message.into())
    }

    /// Wrap a failed prerequisite for a dependent step
    pub fn dependency(step: &str, cause: &AnalysisError) -> Self {
        AnalysisError::DependencyFailed {
            step: step.to_string(),
            cause: cause.to_string(),
        }
    }

    /// True when the failure means "insufficient data" rather than a bug in the input
    pub fn is_not_applicable(&self) -> bool {
        matches!(
            self,
            AnalysisError::StatisticalPrecondition(_) | AnalysisError::DependencyFailed { .. }
        )
    }
}

impl From<polars::error::PolarsError> for AnalysisError {
    fn from(err: polars::error::PolarsError) -> Self {
        AnalysisError::Polars(err.to_string())
    }
}

/// Outcome of one analysis step
pub type StepOutcome<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_applicable_classification() {
        assert!(AnalysisError::precondition("one level").is_not_applicable());

        let dep = AnalysisError::dependency("type III", &AnalysisError::precondition("x"));
        assert!(dep.is_not_applicable());
        assert!(dep.to_string().contains("type III"));

        let schema = AnalysisError::schema("hospitals", "Facility ID", "is missing");
        assert!(!schema.is_not_applicable());
        assert!(schema.to_string().contains("Facility ID"));
    }
}
