use std::time::Duration;

use tracing::{info, warn};

use crate::analyzers::aggregate::RollupAggregator;
use crate::analyzers::types::{ClassAverage, GradeRecord};
use crate::config::DEFAULT_FETCH_TIMEOUT;
use crate::error::{GradebookError, GradebookResult};
use crate::fetch::{RecordFilter, RecordSource};
use crate::parser::check_scores;
use crate::stats::PopulationStats;

/// Answers grade queries by fetching one snapshot from `source` and
/// aggregating it in memory.
///
/// Fetch failures are returned unchanged inside [`GradebookError::UpstreamFetch`];
/// nothing is retried. "No data" outcomes come back as empty results or `None`,
/// leaving the not-found decision to the caller.
pub struct Gradebook<S> {
    source: S,
    aggregator: RollupAggregator,
    fetch_timeout: Duration,
}

impl<S: RecordSource> Gradebook<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            aggregator: RollupAggregator::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_aggregator(mut self, aggregator: RollupAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Weighted average of the learner's scores in each class, ordered by class.
    #[tracing::instrument(skip(self))]
    pub async fn learner_class_averages(&self, learner_id: i64) -> GradebookResult<Vec<ClassAverage>> {
        let records = self.fetch(RecordFilter::learner(learner_id)).await?;
        let rows = self.aggregator.by_learner_class(&records, learner_id);

        let missing = rows.iter().filter(|r| r.average.is_none()).count();
        info!(records = records.len(), classes = rows.len(), missing, "Learner averages computed");
        Ok(rows)
    }

    /// Pass-rate statistics over every learner in the store.
    #[tracing::instrument(skip(self))]
    pub async fn global_stats(&self) -> GradebookResult<Option<PopulationStats>> {
        let records = self.fetch(RecordFilter::all()).await?;
        let stats = self.aggregator.global_stats(&records);
        log_stats("all classes", records.len(), stats.as_ref());
        Ok(stats)
    }

    /// Pass-rate statistics for the learners of one class.
    #[tracing::instrument(skip(self))]
    pub async fn class_stats(&self, class_id: i64) -> GradebookResult<Option<PopulationStats>> {
        let records = self.fetch(RecordFilter::class(class_id)).await?;
        let stats = self.aggregator.class_stats(&records, class_id);
        log_stats(&format!("class {class_id}"), records.len(), stats.as_ref());
        Ok(stats)
    }

    /// Pass-rate statistics for one class, or for everyone when `class_id` is `None`.
    pub async fn stats(&self, class_id: Option<i64>) -> GradebookResult<Option<PopulationStats>> {
        match class_id {
            Some(id) => self.class_stats(id).await,
            None => self.global_stats().await,
        }
    }

    async fn fetch(&self, filter: RecordFilter) -> GradebookResult<Vec<GradeRecord>> {
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch_records(&filter)).await {
            Ok(Ok(records)) => {
                check_scores(&records).map_err(GradebookError::UpstreamFetch)?;
                Ok(records)
            }
            Ok(Err(e)) => {
                warn!(error = %e, ?filter, "Record fetch failed");
                Err(GradebookError::UpstreamFetch(e))
            }
            Err(_) => {
                warn!(timeout = ?self.fetch_timeout, ?filter, "Record fetch timed out");
                Err(GradebookError::FetchTimeout(self.fetch_timeout))
            }
        }
    }
}

/// Fails with [`GradebookError::NoScoreData`] unless some class has a weighted average.
///
/// Rows with a `null` average are still valid output; this is the check a
/// caller applies when it wants "nothing to report" treated as not found.
pub fn require_scored(learner_id: i64, rows: &[ClassAverage]) -> GradebookResult<()> {
    if rows.iter().any(|r| r.average.is_some()) {
        Ok(())
    } else {
        Err(GradebookError::NoScoreData { learner_id })
    }
}

fn log_stats(scope: &str, records: usize, stats: Option<&PopulationStats>) {
    match stats {
        Some(s) => info!(
            scope,
            records,
            total = s.total_entities,
            above = s.above_threshold,
            pct = s.percentage_above_threshold,
            "Population stats computed"
        ),
        None => info!(scope, records, "No learners with score data"),
    }
}
