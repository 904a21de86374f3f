//! Record sources: the boundary between the aggregation pipeline and the grades store.
//!
//! [`RecordSource`] is the async trait every store implements. Sources only
//! read; each call returns an independent snapshot the caller owns.

mod basic;
mod file;
mod http;
mod memory;
mod s3;
pub mod auth;

pub use basic::BasicClient;
pub use file::FileRecordSource;
pub use http::{HttpClient, HttpRecordSource, fetch_bytes};
pub use memory::MemoryRecordSource;
pub use s3::S3RecordSource;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::analyzers::types::GradeRecord;
use crate::config::Settings;

/// Narrows a fetch to one learner, one class, or both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub learner_id: Option<i64>,
    pub class_id: Option<i64>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn learner(learner_id: i64) -> Self {
        Self {
            learner_id: Some(learner_id),
            class_id: None,
        }
    }

    pub fn class(class_id: i64) -> Self {
        Self {
            learner_id: None,
            class_id: Some(class_id),
        }
    }

    pub fn matches(&self, record: &GradeRecord) -> bool {
        self.learner_id.is_none_or(|id| record.learner_id == id)
            && self.class_id.is_none_or(|id| record.class_id == id)
    }

    /// Keeps only the records this filter matches.
    pub fn apply(&self, records: Vec<GradeRecord>) -> Vec<GradeRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Supplies grade records to the aggregation pipeline.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Returns every stored record matching `filter`.
    async fn fetch_records(&self, filter: &RecordFilter) -> Result<Vec<GradeRecord>>;
}

#[async_trait]
impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    async fn fetch_records(&self, filter: &RecordFilter) -> Result<Vec<GradeRecord>> {
        (**self).fetch_records(filter).await
    }
}

/// Opens the record source named by `location`.
///
/// `http://` and `https://` URLs are queried as a grades endpoint,
/// `s3://bucket/key` reads one object, and anything else is a local path.
pub async fn open_source(location: &str, settings: &Settings) -> Result<Box<dyn RecordSource>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let url = location
            .parse()
            .with_context(|| format!("invalid grades URL '{location}'"))?;
        info!(url = %location, authenticated = settings.api_token.is_some(), "Using HTTP record source");

        let source: Box<dyn RecordSource> = match &settings.api_token {
            Some(token) => Box::new(HttpRecordSource::new(
                auth::ApiKey::bearer(BasicClient::new()?, token)?,
                url,
            )),
            None => Box::new(HttpRecordSource::new(BasicClient::new()?, url)),
        };
        return Ok(source);
    }

    if let Some(object) = location.strip_prefix("s3://") {
        let (bucket, key) = object
            .split_once('/')
            .filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
            .with_context(|| format!("expected s3://bucket/key, got '{location}'"))?;
        info!(bucket, key, "Using S3 record source");

        let config = aws_config::load_from_env().await;
        return Ok(Box::new(S3RecordSource::new(
            aws_sdk_s3::Client::new(&config),
            bucket,
            key,
        )));
    }

    info!(path = location, "Using file record source");
    Ok(Box::new(FileRecordSource::new(location)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(learner_id: i64, class_id: i64) -> GradeRecord {
        GradeRecord {
            learner_id,
            class_id,
            scores: vec![],
        }
    }

    #[test]
    fn test_filter_all_matches_everything() {
        assert!(RecordFilter::all().matches(&record(1, 2)));
    }

    #[test]
    fn test_filter_by_learner_and_class() {
        let filter = RecordFilter {
            learner_id: Some(1),
            class_id: Some(2),
        };
        assert!(filter.matches(&record(1, 2)));
        assert!(!filter.matches(&record(1, 3)));
        assert!(!filter.matches(&record(4, 2)));

        let kept = RecordFilter::class(2).apply(vec![record(1, 2), record(3, 4), record(5, 2)]);
        assert_eq!(kept.len(), 2);
    }

    #[tokio::test]
    async fn test_open_source_defaults_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.json");
        std::fs::write(&path, r#"[{"learner_id":1,"class_id":2,"scores":[]}]"#).unwrap();

        let source = open_source(path.to_str().unwrap(), &Settings::default())
            .await
            .unwrap();
        let records = source.fetch_records(&RecordFilter::all()).await.unwrap();
        assert_eq!(records, vec![record(1, 2)]);
    }

    #[tokio::test]
    async fn test_open_source_rejects_bad_s3_location() {
        let result = open_source("s3://bucket-only", &Settings::default()).await;
        assert!(result.is_err());
    }
}
