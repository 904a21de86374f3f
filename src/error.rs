//! Errors surfaced to callers of the gradebook service.

use std::time::Duration;
use thiserror::Error;

/// Result type for gradebook queries
pub type GradebookResult<T> = Result<T, GradebookError>;

#[derive(Error, Debug)]
pub enum GradebookError {
    /// The record source failed; the underlying error is kept as-is.
    #[error("failed to fetch grade records: {0:#}")]
    UpstreamFetch(#[source] anyhow::Error),

    /// The record source did not answer in time.
    #[error("grade record fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    /// The learner has no weighted score in any class, including having no records at all.
    #[error("no score data for learner {learner_id}")]
    NoScoreData { learner_id: i64 },

    /// No learner in scope has a weighted score, so there is nothing to roll up.
    #[error("no learners with score data in {scope}")]
    EmptyPopulation { scope: String },
}

impl GradebookError {
    /// True for the outcomes a caller should report as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GradebookError::NoScoreData { .. } | GradebookError::EmptyPopulation { .. }
        )
    }
}
