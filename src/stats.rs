use serde::Serialize;

use crate::analyzers::types::WeightedResult;

/// Minimum weighted average a learner must exceed to count as passing.
pub const PASSING_THRESHOLD: f64 = 70.0;

/// Second-stage rollup over per-learner averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationStats {
    pub total_entities: usize,
    pub above_threshold: usize,
    pub percentage_above_threshold: f64,
}

impl PopulationStats {
    /// Rolls up per-learner results against `threshold`.
    ///
    /// Results without an average are left out of the population. Returns
    /// `None` when no result has an average, before any division happens.
    pub fn from_results(results: &[WeightedResult], threshold: f64) -> Option<Self> {
        let averages: Vec<f64> = results.iter().filter_map(|r| r.average).collect();
        let total_entities = averages.len();
        let above_threshold = averages.iter().filter(|avg| **avg > threshold).count();

        let percentage_above_threshold = Self::pct(above_threshold, total_entities)?;

        Some(PopulationStats {
            total_entities,
            above_threshold,
            percentage_above_threshold,
        })
    }

    /// `part / total * 100`, or `None` when `total` is zero.
    pub fn pct(part: usize, total: usize) -> Option<f64> {
        if total == 0 {
            None
        } else {
            Some((part as f64 / total as f64) * 100.0)
        }
    }
}
