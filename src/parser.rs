//! Decoding of stored grade records.

use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use flate2::read::GzDecoder;
use serde::Deserialize;

use crate::analyzers::types::{Category, GradeRecord, ScoreEntry};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Layout of a serialized record collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// A JSON array of records.
    Json,
    /// One JSON record per line.
    JsonLines,
    /// Flat `learner_id,class_id,type,score` rows, one score per row.
    Csv,
}

impl RecordFormat {
    /// Picks the format from a file name, looking through a trailing `.gz`.
    /// Unknown extensions fall back to [`RecordFormat::Json`].
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let inner = match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Path::new(path.file_stem().unwrap_or_default()),
            _ => path,
        };

        match inner.extension().and_then(|e| e.to_str()) {
            Some("jsonl") | Some("ndjson") => RecordFormat::JsonLines,
            Some("csv") => RecordFormat::Csv,
            _ => RecordFormat::Json,
        }
    }
}

#[derive(Deserialize)]
struct CsvRow {
    learner_id: i64,
    class_id: i64,
    #[serde(rename = "type")]
    category: String,
    score: f64,
}

/// Decodes records from raw bytes, inflating gzip input first.
///
/// # Errors
///
/// Returns an error if the gzip stream is corrupt, the payload does not
/// match `format`, or any score is NaN or infinite.
pub fn parse_records(bytes: &[u8], format: RecordFormat) -> Result<Vec<GradeRecord>> {
    let bytes = decompress(bytes)?;

    let records: Vec<GradeRecord> = match format {
        RecordFormat::Json => {
            serde_json::from_slice(&bytes).context("invalid JSON grade record array")?
        }
        RecordFormat::JsonLines => parse_json_lines(&bytes)?,
        RecordFormat::Csv => parse_csv(&bytes)?,
    };

    check_scores(&records)?;
    Ok(records)
}

/// Fails on the first score that is not a finite number.
pub fn check_scores(records: &[GradeRecord]) -> Result<()> {
    for record in records {
        if let Some(entry) = record.scores.iter().find(|e| !e.score.is_finite()) {
            bail!(
                "non-finite {:?} score {} for learner {} in class {}",
                entry.category,
                entry.score,
                record.learner_id,
                record.class_id
            );
        }
    }
    Ok(())
}

/// Returns `bytes` unchanged unless they start with the gzip magic number.
pub fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .context("failed to inflate gzip payload")?;
    Ok(Cow::Owned(out))
}

fn parse_json_lines(bytes: &[u8]) -> Result<Vec<GradeRecord>> {
    let text = std::str::from_utf8(bytes).context("grade records are not valid UTF-8")?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid grade record on line {}", index + 1))
        })
        .collect()
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<GradeRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
    let mut records = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let row: CsvRow = result.context("invalid grade CSV row")?;
        // Row numbers count the header as row 1.
        ensure!(
            row.score.is_finite(),
            "non-finite score '{}' on CSV row {}",
            row.score,
            index + 2
        );
        records.push(GradeRecord {
            learner_id: row.learner_id,
            class_id: row.class_id,
            scores: vec![ScoreEntry::new(Category::from_tag(&row.category), row.score)],
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const JSON: &str = r#"[
        {"learner_id":1,"class_id":10,"scores":[{"type":"exam","score":80},{"type":"quiz","score":70}]},
        {"learner_id":2,"class_id":10,"scores":[]}
    ]"#;

    #[test]
    fn test_format_from_path() {
        assert_eq!(RecordFormat::from_path("grades.json"), RecordFormat::Json);
        assert_eq!(RecordFormat::from_path("grades.jsonl"), RecordFormat::JsonLines);
        assert_eq!(RecordFormat::from_path("grades.ndjson.gz"), RecordFormat::JsonLines);
        assert_eq!(RecordFormat::from_path("dir/grades.csv.gz"), RecordFormat::Csv);
        assert_eq!(RecordFormat::from_path("grades"), RecordFormat::Json);
    }

    #[test]
    fn test_parse_json_array() {
        let records = parse_records(JSON.as_bytes(), RecordFormat::Json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].scores.len(), 2);
        assert!(records[1].scores.is_empty());
    }

    #[test]
    fn test_parse_json_lines_skips_blank_lines() {
        let text = "{\"learner_id\":1,\"class_id\":10,\"scores\":[]}\n\n{\"learner_id\":2,\"class_id\":11,\"scores\":[]}\n";
        let records = parse_records(text.as_bytes(), RecordFormat::JsonLines).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].class_id, 11);
    }

    #[test]
    fn test_parse_json_lines_reports_line() {
        let text = "{\"learner_id\":1,\"class_id\":10}\nnot json\n";
        let err = parse_records(text.as_bytes(), RecordFormat::JsonLines).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_csv_rows() {
        let text = "learner_id,class_id,type,score\n1,10,exam,80\n1, 10, essay ,55\n";
        let records = parse_records(text.as_bytes(), RecordFormat::Csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].scores[0], ScoreEntry::new(Category::Exam, 80.0));
        assert_eq!(records[1].scores[0].category, Category::Other);
    }

    #[test]
    fn test_parse_csv_rejects_non_finite_scores() {
        for bad in ["NaN", "inf", "-inf"] {
            let text = format!("learner_id,class_id,type,score\n1,10,exam,80\n2,10,exam,{bad}\n");
            let err = parse_records(text.as_bytes(), RecordFormat::Csv).unwrap_err();
            assert!(err.to_string().contains("CSV row 3"), "{bad}: {err}");
        }
    }

    #[test]
    fn test_check_scores_rejects_non_finite_records() {
        let mut records = parse_records(JSON.as_bytes(), RecordFormat::Json).unwrap();
        assert!(check_scores(&records).is_ok());

        records[0].scores[1].score = f64::NAN;
        let err = check_scores(&records).unwrap_err();
        assert!(err.to_string().contains("learner 1 in class 10"));
    }

    #[test]
    fn test_parse_json_rejects_out_of_range_score() {
        let text = r#"[{"learner_id":1,"class_id":10,"scores":[{"type":"exam","score":1e400}]}]"#;
        assert!(parse_records(text.as_bytes(), RecordFormat::Json).is_err());
    }

    #[test]
    fn test_parse_gzip_json() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(JSON.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let records = parse_records(&compressed, RecordFormat::Json).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let result = parse_records(&[0xFF, 0xFE, 0x00, 0x01], RecordFormat::Json);
        assert!(result.is_err());
    }
}
