//! Output formatting and persistence for query results.
//!
//! Supports pretty JSON on any writer or S3 object, and CSV append of stats
//! snapshots.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::stats::PopulationStats;

/// One row of the stats history CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub scope: String,
    pub threshold: f64,
    pub total_entities: usize,
    pub above_threshold: usize,
    pub percentage_above_threshold: f64,
}

impl StatsSnapshot {
    /// Stamps `stats` with the current time. `class_id` of `None` means all classes.
    pub fn new(class_id: Option<i64>, threshold: f64, stats: &PopulationStats) -> Self {
        StatsSnapshot {
            timestamp: Utc::now(),
            scope: scope_label(class_id),
            threshold,
            total_entities: stats.total_entities,
            above_threshold: stats.above_threshold,
            percentage_above_threshold: stats.percentage_above_threshold,
        }
    }
}

/// Human label for a stats scope, as used in logs and history rows.
pub fn scope_label(class_id: Option<i64>) -> String {
    match class_id {
        Some(id) => format!("class {id}"),
        None => "all classes".to_string(),
    }
}

/// Writes `value` as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(mut writer: W, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Renders `value` exactly as [`write_json`] prints it.
pub fn json_body(value: &impl Serialize) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    write_json(&mut body, value)?;
    Ok(body)
}

/// Uploads `value` as a JSON object, byte-for-byte the same as the stdout output.
pub async fn upload_json(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = json_body(value)?;
    let size = body.len();

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json")
        .send()
        .await
        .with_context(|| format!("failed to upload result to s3://{bucket}/{key}"))?;

    info!(bucket, key, size, "Result uploaded to S3");
    Ok(())
}

/// Appends a [`StatsSnapshot`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &Path, snapshot: &StatsSnapshot) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending stats snapshot");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(snapshot)?;
    writer.flush()?;

    Ok(())
}
