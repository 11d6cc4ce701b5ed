//! Run command implementation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::fs_abstraction::RealFileSystem;
use crate::lock::LockGuard;
use crate::pipeline;

/// Run the full ingestion and aggregation
pub async fn run(
    feeds_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    config_path: &Path,
) -> Result<()> {
    let mut config = Config::load(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    if let Some(dir) = feeds_dir {
        config.feeds_dir = dir;
    }
    if let Some(output) = output {
        config.output = (output != Path::new("-")).then_some(output);
    }

    let lock = LockGuard::acquire(&config.lock_file)?;
    debug!("Holding run lock {}", lock.path().display());

    info!("Scanning feeds from {}", config.feed_source);
    let result = pipeline::run(&config, Arc::new(RealFileSystem)).await?;

    if result.summary.oversized_networks > 0 {
        info!(
            "{} networks skipped (more than {} hosts)",
            result.summary.oversized_networks, config.max_network_hosts
        );
    }

    pipeline::write_output(&result.records, config.output.as_deref())
}
