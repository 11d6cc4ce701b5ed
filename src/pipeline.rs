//! Feed ingestion pipeline: discover, scan in parallel, aggregate, hand off.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::aggregator::{aggregate_records, AggregatedRecord, IpKey};
use crate::config::Config;
use crate::feed::{collect_hits, feed_name, is_feed_file, FeedHeader, FeedScan, HISTORY_SUFFIX};
use crate::fs_abstraction::FileSystem;
use crate::utils::format_count;

/// Per-feed limits applied before records reach the aggregator.
#[derive(Debug, Clone, Copy)]
pub struct FeedLimits {
    pub unique_ips_limit: u64,
    pub max_network_hosts: u64,
}

impl From<&Config> for FeedLimits {
    fn from(config: &Config) -> Self {
        Self {
            unique_ips_limit: config.unique_ips_limit,
            max_network_hosts: config.max_network_hosts,
        }
    }
}

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub feeds_found: usize,
    pub feeds_scanned: usize,
    pub feeds_over_limit: Vec<String>,
    /// Feeds whose history sidecar was unusable and were dated by header
    pub feeds_history_ignored: Vec<String>,
    pub hit_records: usize,
    pub unique_ips: usize,
    pub rejected_tokens: usize,
    pub oversized_networks: usize,
}

/// Aggregated records plus the run's counters.
#[derive(Debug)]
pub struct RunOutput {
    pub records: BTreeMap<IpKey, AggregatedRecord>,
    pub summary: RunSummary,
}

/// What one feed contributed.
#[derive(Debug)]
enum FeedOutcome {
    Scanned(FeedScan),
    HistoryIgnored { name: String, scan: FeedScan },
    OverLimit { name: String, unique_ips: u64 },
}

/// List the primary feed files of a directory, sorted by path.
pub fn discover_feeds(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut feeds: Vec<PathBuf> = fs
        .list_files(dir)
        .with_context(|| format!("Failed to list feed directory {}", dir.display()))?
        .into_iter()
        .filter(|path| {
            let keep = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_feed_file);
            if !keep {
                debug!("Skipping {}", path.display());
            }
            keep
        })
        .collect();
    feeds.sort();
    Ok(feeds)
}

/// Warn when the newest feed file is older than twice the sync interval.
pub fn check_freshness(fs: &dyn FileSystem, feeds: &[PathBuf], config: &Config) {
    let newest = feeds.iter().filter_map(|p| fs.modified(p).ok()).max();
    let Some(newest) = newest else {
        return;
    };
    let age = SystemTime::now()
        .duration_since(newest)
        .unwrap_or_default();
    let Some(threshold) = config.sync_period().checked_mul(2) else {
        return;
    };
    if age > threshold {
        warn!(
            "Feeds in {} look stale: newest file is {}h old (sync interval {})",
            config.feeds_dir.display(),
            age.as_secs() / 3600,
            config.sync_interval
        );
    }
}

/// Read and scan one feed file.
fn scan_feed(fs: &dyn FileSystem, path: &Path, limits: FeedLimits) -> Result<FeedOutcome> {
    let name = feed_name(path);
    let content = fs
        .read_to_string(path)
        .with_context(|| format!("Failed to read feed {}", path.display()))?;

    if let Some(unique_ips) = FeedHeader::parse(&content).unique_ips {
        if unique_ips > limits.unique_ips_limit {
            warn!(
                "{}: {} unique IPs exceeds limit {}, skipping",
                name,
                format_count(unique_ips),
                format_count(limits.unique_ips_limit)
            );
            return Ok(FeedOutcome::OverLimit { name, unique_ips });
        }
    }

    let mut history_path = path.as_os_str().to_owned();
    history_path.push(HISTORY_SUFFIX);
    let history_path = PathBuf::from(history_path);
    let history = if fs.exists(&history_path) {
        Some(
            fs.read_to_string(&history_path)
                .with_context(|| format!("Failed to read history {}", history_path.display()))?,
        )
    } else {
        None
    };

    let outcome = match collect_hits(
        &name,
        &content,
        history.as_deref(),
        limits.max_network_hosts,
    ) {
        Ok(scan) => FeedOutcome::Scanned(scan),
        Err(e) => {
            warn!("{}: {}, dating entries by file header instead", name, e);
            let scan = collect_hits(&name, &content, None, limits.max_network_hosts)
                .with_context(|| format!("Failed to scan feed {}", name))?;
            FeedOutcome::HistoryIgnored { name: name.clone(), scan }
        }
    };
    if let FeedOutcome::Scanned(scan) | FeedOutcome::HistoryIgnored { scan, .. } = &outcome {
        debug!(
            "{}: {} IPs ({} rejected tokens)",
            name,
            scan.records.len(),
            scan.rejected
        );
    }
    Ok(outcome)
}

fn scan_chunk(
    fs: &dyn FileSystem,
    chunk: &[PathBuf],
    limits: FeedLimits,
) -> Result<Vec<FeedOutcome>> {
    chunk
        .iter()
        .map(|path| scan_feed(fs, path, limits))
        .collect()
}

/// Run the full ingestion over `config.feeds_dir`.
///
/// Feed files are split into chunks of `chunk_size` and scanned on the
/// blocking pool, at most `workers` chunks at a time. Results are merged in
/// feed order so that each IP's hits follow the sorted feed list, then
/// aggregated once.
pub async fn run(config: &Config, fs: Arc<dyn FileSystem>) -> Result<RunOutput> {
    let feeds = discover_feeds(fs.as_ref(), &config.feeds_dir)?;
    info!(
        "Found {} feeds in {}",
        feeds.len(),
        config.feeds_dir.display()
    );
    check_freshness(fs.as_ref(), &feeds, config);

    let limits = FeedLimits::from(config);
    let workers = config.effective_workers().max(1);
    let chunks: Vec<Vec<PathBuf>> = feeds
        .chunks(config.chunk_size.max(1))
        .map(<[_]>::to_vec)
        .collect();

    let results: Vec<Result<Vec<FeedOutcome>>> = stream::iter(chunks.into_iter().map(|chunk| {
        let fs = Arc::clone(&fs);
        async move {
            tokio::task::spawn_blocking(move || scan_chunk(fs.as_ref(), &chunk, limits))
                .await
                .context("Feed worker panicked")?
        }
    }))
    .buffered(workers)
    .collect()
    .await;

    let mut summary = RunSummary {
        feeds_found: feeds.len(),
        ..RunSummary::default()
    };
    let mut all_records = Vec::new();

    let outcomes = results.into_iter().collect::<Result<Vec<_>>>()?;
    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            FeedOutcome::Scanned(scan) => {
                summary.feeds_scanned += 1;
                summary.rejected_tokens += scan.rejected;
                summary.oversized_networks += scan.oversized;
                all_records.extend(scan.records);
            }
            FeedOutcome::HistoryIgnored { name, scan } => {
                summary.feeds_scanned += 1;
                summary.feeds_history_ignored.push(name);
                summary.rejected_tokens += scan.rejected;
                summary.oversized_networks += scan.oversized;
                all_records.extend(scan.records);
            }
            FeedOutcome::OverLimit { name, unique_ips } => {
                debug!("{} contributed no records ({} unique IPs)", name, unique_ips);
                summary.feeds_over_limit.push(name);
            }
        }
    }

    summary.hit_records = all_records.len();
    let records = aggregate_records(all_records);
    summary.unique_ips = records.len();

    info!(
        "Aggregated {} hits into {} IPs from {} feeds ({} over limit)",
        format_count(summary.hit_records as u64),
        format_count(summary.unique_ips as u64),
        summary.feeds_scanned,
        summary.feeds_over_limit.len()
    );

    Ok(RunOutput { records, summary })
}

/// Write the aggregated mapping as JSON to `output`, or stdout when `None`.
///
/// File output uses tempfile + rename so readers never see a partial file.
pub fn write_output(
    records: &BTreeMap<IpKey, AggregatedRecord>,
    output: Option<&Path>,
) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;

    let Some(path) = output else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", json)?;
        return Ok(());
    };

    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
        .with_context(|| format!("Failed to create temporary file in {}", parent_dir.display()))?;
    temp_file.write_all(json.as_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file
        .persist(path)
        .with_context(|| format!("Failed to write output {}", path.display()))?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
