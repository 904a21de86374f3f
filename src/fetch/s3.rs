use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{RecordFilter, RecordSource};
use crate::analyzers::types::GradeRecord;
use crate::parser::{RecordFormat, parse_records};

/// Reads grade records from a single S3 object.
///
/// The object key decides the format the same way a local file name does.
pub struct S3RecordSource {
    client: aws_sdk_s3::Client,
    bucket: String,
    key: String,
    format: RecordFormat,
}

impl S3RecordSource {
    pub fn new(client: aws_sdk_s3::Client, bucket: &str, key: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            key: key.to_string(),
            format: RecordFormat::from_path(key),
        }
    }
}

#[async_trait]
impl RecordSource for S3RecordSource {
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket, key = %self.key))]
    async fn fetch_records(&self, filter: &RecordFilter) -> Result<Vec<GradeRecord>> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .with_context(|| format!("S3 GetObject failed for s3://{}/{}", self.bucket, self.key))?;

        let body: bytes::Bytes = object
            .body
            .collect()
            .await
            .context("failed to read S3 object body")?
            .into_bytes();
        debug!(bytes = body.len(), "S3 object downloaded");

        let records = parse_records(&body, self.format)?;
        Ok(filter.apply(records))
    }
}
