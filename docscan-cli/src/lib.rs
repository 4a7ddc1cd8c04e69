//! docscan CLI - scan a MongoDB deployment and export the inferred schema.
//!
//! The binary is a thin wrapper: arguments map one-to-one onto
//! [`ScanOptions`], the scan runs through [`Scanner`], and the result is
//! written with the formatter selected by `--format`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use docscan::formatters::OutputFormat;
use docscan::logging::setup::LoggingConfig;
use docscan::scanner::{ScanOptions, Scanner};
use docscan::sources::DocumentSource;
use docscan::types::ScanResult;
use tracing::{debug, info, warn};

/// Scan a MongoDB deployment and generate a schema report.
///
/// Every user database and collection is sampled and reported with its
/// field types, type distribution, presence and nested fields.
#[derive(Parser, Debug, Clone)]
#[command(name = "docscan", author, version, about, long_about = None)]
pub struct CliArgs {
    /// MongoDB connection string
    #[arg(long)]
    pub uri: String,

    /// Output file path
    #[arg(long, default_value = "./schema.json")]
    pub output: PathBuf,

    /// Output format: json, yaml, or csv
    #[arg(long, default_value = "json")]
    pub format: String,

    /// Comma-separated database name patterns (regex supported)
    #[arg(long)]
    pub db_filter: Option<String>,

    /// Scan timeout in seconds
    #[arg(long, default_value_t = 10_000)]
    pub timeout: u64,

    /// Maximum documents to sample per collection
    #[arg(long, default_value_t = 75_000)]
    pub max_docs: u64,

    /// Concurrent databases, and concurrent collections per database
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl CliArgs {
    /// Splits `--db-filter` on commas, trimming and dropping empty patterns.
    pub fn db_filters(&self) -> Vec<String> {
        self.db_filter
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::builder(self.uri.clone())
            .timeout(Duration::from_secs(self.timeout))
            .max_docs(self.max_docs)
            .db_filter(self.db_filters())
            .concurrency(self.concurrency)
            .build()
    }

    pub fn output_format(&self) -> docscan::Result<OutputFormat> {
        self.format.parse()
    }

    pub fn logging_config(&self) -> LoggingConfig {
        let config = if self.verbose {
            LoggingConfig::development()
        } else {
            LoggingConfig::default()
        };
        config.with_json_format(self.json_logs)
    }
}

/// Runs a scan over `source` and exports the result as configured by `args`.
pub async fn scan_and_export(
    source: Arc<dyn DocumentSource>,
    args: &CliArgs,
) -> Result<ScanResult> {
    let format = args.output_format()?;
    let options = args.scan_options();

    debug!(
        output = %args.output.display(),
        %format,
        timeout_secs = args.timeout,
        max_docs = args.max_docs,
        concurrency = args.concurrency,
        "scan configuration"
    );

    let scanner = Scanner::new(source, options).context("invalid scan options")?;
    let result = scanner.scan().await.context("scan failed")?;

    format
        .formatter()
        .export_to_file(&result, &args.output)
        .with_context(|| format!("failed to export results to {}", args.output.display()))?;

    info!(output = %args.output.display(), "schema exported");
    log_summary(&result);

    Ok(result)
}

/// Logs the end-of-scan summary.
pub fn log_summary(result: &ScanResult) {
    let summary = &result.summary;
    info!(
        cluster = %result.cluster_name,
        databases = result.databases.len(),
        collections = result.total_collections(),
        total_fields = result.total_fields(),
        skipped = summary.collections_skipped,
        first_n_fallbacks = summary.first_n_fallbacks,
        elapsed_ms = summary.elapsed_ms,
        "scan summary"
    );

    if summary.degraded_operations > 0 {
        warn!(
            degraded = summary.degraded_operations,
            "some counts, indexes or sizes fell back to defaults"
        );
    }

    for failure in &summary.failures {
        warn!(
            unit = %failure.unit,
            kind = ?failure.kind,
            message = %failure.message,
            "not included in the report"
        );
    }
}
