use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{RecordFilter, RecordSource};
use crate::analyzers::types::GradeRecord;
use crate::parser::{RecordFormat, parse_records};

/// Reads grade records from a local JSON, JSON-lines or CSV file, optionally gzipped.
///
/// The file is re-read on every fetch so each query sees its own snapshot.
#[derive(Debug, Clone)]
pub struct FileRecordSource {
    path: PathBuf,
    format: RecordFormat,
}

impl FileRecordSource {
    /// Infers the format from the file extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = RecordFormat::from_path(&path);
        Self { path, format }
    }

    pub fn with_format(path: impl Into<PathBuf>, format: RecordFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }
}

#[async_trait]
impl RecordSource for FileRecordSource {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_records(&self, filter: &RecordFilter) -> Result<Vec<GradeRecord>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        debug!(bytes = bytes.len(), format = ?self.format, "Grade file loaded");

        let records = parse_records(&bytes, self.format)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(filter.apply(records))
    }
}
