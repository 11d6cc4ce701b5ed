//! Expand command implementation.

use anyhow::Result;
use std::io::Write;

use crate::expand::{expand_hosts, host_count};
use crate::utils::format_count_with_separator;
use crate::validation::Network;

/// Run the expand command
pub fn run(network: &str, limit: Option<usize>) -> Result<()> {
    let net: Network = network.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let total = host_count(net)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for host in expand_hosts(net)?.take(limit.unwrap_or(usize::MAX)) {
        writeln!(out, "{}", host)?;
    }

    if limit.is_some_and(|l| (l as u64) < total) {
        eprintln!(
            "... {} of {} hosts shown",
            format_count_with_separator(limit.unwrap_or_default() as u64),
            format_count_with_separator(total)
        );
    }

    Ok(())
}
