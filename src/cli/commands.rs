//! Command handler wiring the application layer together

use std::sync::Arc;

use tracing::info;

use crate::app::{Pipeline, PipelineConfig, PinnedClient, Toolchain, XzToolchain};
use crate::cli::args::Args;
use crate::cli::progress;
use crate::errors::Result;

/// Runs the full fetch-and-repack pipeline for the parsed arguments
pub async fn run(args: Args) -> Result<()> {
    let client = Arc::new(PinnedClient::new()?);
    let toolchain: Arc<dyn Toolchain> = Arc::new(XzToolchain);

    let config = PipelineConfig::default()
        .with_index_url(args.index_url)
        .with_max_concurrent(args.max_concurrent);
    let pipeline = Pipeline::new(config, client, toolchain);

    let (progress_tx, reporter) = progress::spawn_reporter();
    let result = pipeline.run(&args.target_dir, Some(progress_tx)).await;

    // All sender clones are gone once run returns; wait for the last lines
    reporter.await?;

    if result.is_ok() {
        info!("run complete: {}", args.target_dir.display());
    }
    result
}
