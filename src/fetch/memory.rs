use anyhow::Result;
use async_trait::async_trait;

use super::{RecordFilter, RecordSource};
use crate::analyzers::types::GradeRecord;

/// Serves records from an owned in-memory snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    records: Vec<GradeRecord>,
}

impl MemoryRecordSource {
    pub fn new(records: Vec<GradeRecord>) -> Self {
        Self { records }
    }
}

impl From<Vec<GradeRecord>> for MemoryRecordSource {
    fn from(records: Vec<GradeRecord>) -> Self {
        Self::new(records)
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn fetch_records(&self, filter: &RecordFilter) -> Result<Vec<GradeRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}
