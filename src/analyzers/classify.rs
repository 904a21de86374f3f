use crate::analyzers::types::{CategoryBuckets, ScoreEntry};
use tracing::trace;

/// Splits score entries into per-category buckets in a single pass.
///
/// Entries whose type is not exam, quiz or homework are dropped. Scores keep
/// their input order inside each bucket.
pub fn classify<'a, I>(scores: I) -> CategoryBuckets
where
    I: IntoIterator<Item = &'a ScoreEntry>,
{
    let mut buckets = CategoryBuckets::default();
    let mut dropped = 0usize;

    for entry in scores {
        if !buckets.push(entry.category, entry.score) {
            dropped += 1;
        }
    }

    if dropped > 0 {
        trace!(dropped, kept = buckets.len(), "Dropped unweighted score entries");
    }

    buckets
}
