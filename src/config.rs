//! Configuration management for feedhits.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timer interval validation (e.g., "4h", "30m", "1d")
/// Requires ASCII-only input to prevent Unicode-related edge cases
fn is_valid_interval(interval: &str) -> bool {
    parse_interval(interval).is_some()
}

fn parse_interval(interval: &str) -> Option<Duration> {
    if !interval.is_ascii() || interval.len() < 2 {
        return None;
    }

    let (num_part, suffix) = interval.split_at(interval.len() - 1);
    if !num_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u64 = num_part.parse().ok()?;
    let secs = match suffix {
        "s" => n,
        "m" => n.checked_mul(60)?,
        "h" => n.checked_mul(3600)?,
        "d" => n.checked_mul(86_400)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Repository the feeds are synced from (informational)
    pub feed_source: String,

    /// Local directory holding the synced feed files
    pub feeds_dir: PathBuf,

    /// How often the feeds are expected to be synced
    pub sync_interval: String,

    /// Feeds declaring more unique IPs than this are skipped
    pub unique_ips_limit: u64,

    /// Networks expanding to more hosts than this are skipped
    pub max_network_hosts: u64,

    /// Parallel feed workers (default: available CPUs)
    pub workers: Option<usize>,

    /// Feed files per dispatched chunk
    pub chunk_size: usize,

    /// JSON output file (stdout when unset)
    pub output: Option<PathBuf>,

    /// Lock file preventing concurrent runs
    pub lock_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_source: "https://github.com/firehol/blocklist-ipsets.git".to_string(),
            feeds_dir: PathBuf::from("/var/lib/feedhits/blocklist-ipsets"),
            sync_interval: "4h".to_string(),
            unique_ips_limit: 200_000,
            max_network_hosts: 65_534,
            workers: None,
            chunk_size: 8,
            output: None,
            lock_file: PathBuf::from("/var/run/feedhits.lock"),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !is_valid_interval(&self.sync_interval) {
            anyhow::bail!(
                "Invalid sync_interval '{}'. Use format like '4h', '30m', '1d'",
                self.sync_interval
            );
        }

        if !self.feed_source.is_empty() && !self.feed_source.starts_with("https://") {
            anyhow::bail!("Feed source URL must use HTTPS: {}", self.feed_source);
        }

        if self.feeds_dir.as_os_str().is_empty() {
            anyhow::bail!("feeds_dir must be set");
        }

        if self.unique_ips_limit == 0 {
            anyhow::bail!("unique_ips_limit must be greater than 0");
        }

        if self.max_network_hosts == 0 {
            anyhow::bail!("max_network_hosts must be greater than 0");
        }

        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than 0");
        }

        if self.workers == Some(0) {
            anyhow::bail!("workers must be greater than 0");
        }

        Ok(())
    }

    /// Sync interval as a duration. Falls back to 4h if unparsable.
    pub fn sync_period(&self) -> Duration {
        parse_interval(&self.sync_interval).unwrap_or(Duration::from_secs(4 * 3600))
    }

    /// Number of feed workers to run in parallel
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
