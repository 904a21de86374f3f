//! CLI entry point for the grade rollup tool.
//!
//! Provides subcommands for a learner's per-class weighted averages and for
//! pass-rate statistics across all learners or within one class.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use grade_rollup::analyzers::analyzer::require_scored;
use grade_rollup::config::Settings;
use grade_rollup::fetch::{RecordSource, open_source};
use grade_rollup::output::{StatsSnapshot, append_record, scope_label, upload_json, write_json};
use grade_rollup::stats::PASSING_THRESHOLD;
use grade_rollup::{Gradebook, GradebookError, RollupAggregator};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "grade_rollup")]
#[command(about = "Weighted grade averages and pass-rate statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Weighted average of a learner's scores in each class
    Learner {
        /// Learner to report on
        learner_id: i64,

        #[command(flatten)]
        io: IoArgs,
    },
    /// Share of learners whose weighted average is above the passing threshold
    Stats {
        /// Restrict the rollup to one class
        #[arg(short, long = "class")]
        class_id: Option<i64>,

        /// Averages strictly above this value count as passing
        #[arg(short, long, default_value_t = PASSING_THRESHOLD)]
        threshold: f64,

        /// CSV file to append a timestamped stats row to
        #[arg(long)]
        history: Option<PathBuf>,

        #[command(flatten)]
        io: IoArgs,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Record source: a file path, an http(s) URL or s3://bucket/key (defaults to GRADES_SOURCE)
    #[arg(short, long)]
    source: Option<String>,

    /// Optional: S3 bucket to upload the JSON result to
    #[arg(long, requires = "s3_key")]
    s3_bucket: Option<String>,

    /// Object key for the uploaded result
    #[arg(long, requires = "s3_bucket")]
    s3_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let settings = Settings::from_env()?;

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = Path::new(&settings.log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&settings.log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("grade_rollup.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Learner { learner_id, io } => {
            let gradebook = gradebook(&io, &settings, RollupAggregator::default()).await?;
            let rows = gradebook.learner_class_averages(learner_id).await?;

            require_scored(learner_id, &rows).map_err(not_found)?;

            emit(&io, &rows).await?;
        }
        Commands::Stats {
            class_id,
            threshold,
            history,
            io,
        } => {
            let aggregator = RollupAggregator::default().with_threshold(threshold);
            let gradebook = gradebook(&io, &settings, aggregator).await?;

            let Some(stats) = gradebook.stats(class_id).await? else {
                return Err(not_found(GradebookError::EmptyPopulation {
                    scope: scope_label(class_id),
                }));
            };

            if let Some(path) = history {
                append_record(&path, &StatsSnapshot::new(class_id, threshold, &stats))
                    .with_context(|| format!("failed to append to {}", path.display()))?;
                info!(path = %path.display(), "Stats snapshot appended");
            }

            emit(&io, &stats).await?;
        }
    }

    Ok(())
}

/// Opens the configured record source behind a [`Gradebook`].
async fn gradebook(
    io: &IoArgs,
    settings: &Settings,
    aggregator: RollupAggregator,
) -> Result<Gradebook<Box<dyn RecordSource>>> {
    let location = io
        .source
        .as_deref()
        .or(settings.source.as_deref())
        .context("no record source given: pass --source or set GRADES_SOURCE")?;

    let source = open_source(location, settings).await?;
    Ok(Gradebook::new(source)
        .with_aggregator(aggregator)
        .with_fetch_timeout(settings.fetch_timeout))
}

/// Prints the result to stdout and uploads it when an S3 target was given.
async fn emit(io: &IoArgs, value: &impl Serialize) -> Result<()> {
    write_json(std::io::stdout().lock(), value)?;

    if let (Some(bucket), Some(key)) = (&io.s3_bucket, &io.s3_key) {
        let config = aws_config::load_from_env().await;
        let s3 = aws_sdk_s3::Client::new(&config);
        upload_json(&s3, bucket, key, value).await?;
    }

    Ok(())
}

fn not_found(err: GradebookError) -> anyhow::Error {
    warn!(error = %err, "Not found");
    err.into()
}
