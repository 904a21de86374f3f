use crate::analyzers::classify::classify;
use crate::analyzers::types::{ClassAverage, GradeRecord, WeightedResult, Weights};
use crate::analyzers::utility::group_by;
use crate::analyzers::weighted::weighted_average;
use crate::stats::{PASSING_THRESHOLD, PopulationStats};
use tracing::debug;

/// Turns grade records into per-key weighted averages and population stats.
///
/// Holds only the fixed weight table and the passing threshold, so one
/// aggregator can serve any number of concurrent queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollupAggregator {
    weights: Weights,
    threshold: f64,
}

impl Default for RollupAggregator {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            threshold: PASSING_THRESHOLD,
        }
    }
}

impl RollupAggregator {
    pub fn with_threshold(self, threshold: f64) -> Self {
        Self { threshold, ..self }
    }

    /// Groups `records` by `key_fn` and computes one weighted result per group.
    ///
    /// Scores from every record in a group are pooled before classification.
    /// Results are ordered by ascending key.
    pub fn averages_by<'a, I, F>(&self, records: I, key_fn: F) -> Vec<WeightedResult>
    where
        I: IntoIterator<Item = &'a GradeRecord>,
        F: Fn(&GradeRecord) -> i64,
    {
        group_by(records, |record| key_fn(record))
            .into_iter()
            .map(|(key, group)| {
                let buckets = classify(group.iter().flat_map(|record| record.scores.iter()));
                WeightedResult {
                    key,
                    average: weighted_average(&buckets, &self.weights),
                }
            })
            .collect()
    }

    /// Weighted average of one learner's scores in each of their classes.
    ///
    /// Classes without any weighted score are kept with an empty average.
    pub fn by_learner_class(&self, records: &[GradeRecord], learner_id: i64) -> Vec<ClassAverage> {
        let rows: Vec<ClassAverage> = self
            .averages_by(
                records.iter().filter(|r| r.learner_id == learner_id),
                |r| r.class_id,
            )
            .into_iter()
            .map(ClassAverage::from)
            .collect();

        debug!(learner_id, classes = rows.len(), "Computed class averages");
        rows
    }

    /// Per-learner averages pooled across every class in `records`.
    pub fn learner_averages(&self, records: &[GradeRecord]) -> Vec<WeightedResult> {
        self.averages_by(records, |r| r.learner_id)
    }

    /// Share of learners above the threshold across all classes.
    ///
    /// Returns `None` when no learner has a weighted score.
    pub fn global_stats(&self, records: &[GradeRecord]) -> Option<PopulationStats> {
        let learners = self.learner_averages(records);
        let stats = PopulationStats::from_results(&learners, self.threshold);
        debug!(learners = learners.len(), has_data = stats.is_some(), "Computed global stats");
        stats
    }

    /// Share of learners above the threshold within one class.
    ///
    /// Returns `None` when the class has no learner with a weighted score.
    pub fn class_stats(&self, records: &[GradeRecord], class_id: i64) -> Option<PopulationStats> {
        let learners = self.averages_by(
            records.iter().filter(|r| r.class_id == class_id),
            |r| r.learner_id,
        );
        let stats = PopulationStats::from_results(&learners, self.threshold);
        debug!(
            class_id,
            learners = learners.len(),
            has_data = stats.is_some(),
            "Computed class stats"
        );
        stats
    }
}
