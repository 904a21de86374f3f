use crate::analyzers::types::{Category, CategoryBuckets, Weights};
use crate::analyzers::utility::mean;

/// Computes the weighted average of classified scores.
///
/// Each non-empty bucket contributes `mean * weight`. An empty bucket adds
/// nothing and its weight is not redistributed, so a learner missing all
/// homework can reach at most 80 with the default table. Returns `None` when
/// every bucket is empty.
pub fn weighted_average(buckets: &CategoryBuckets, weights: &Weights) -> Option<f64> {
    Category::WEIGHTED
        .iter()
        .filter_map(|c| mean(buckets.get(*c)).map(|m| m * weights.weight(*c)))
        .reduce(|total, term| total + term)
}
