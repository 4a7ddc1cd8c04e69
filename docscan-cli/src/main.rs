use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use docscan::logging::mask_uri;
use docscan::logging::setup::init_logging;
use docscan::sources::MongoSource;
use docscan_cli::{scan_and_export, CliArgs};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    init_logging(args.logging_config())
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    // Reject a bad format before connecting.
    args.output_format()?;

    info!(uri = %mask_uri(&args.uri), "starting schema scan");

    let source = MongoSource::connect(&args.uri)
        .await
        .context("failed to connect to MongoDB")?;

    scan_and_export(Arc::new(source), &args).await?;

    Ok(())
}
