//! Feed file parsing: naming, FireHOL headers, diff history and hit records.
//!
//! A feed is a `.ipset`/`.netset` file listing one address or network per
//! line under a `#` comment header. Its optional history sidecar
//! (`<file>.history`) holds the diff log of the feed file, produced with:
//!
//! ```text
//! git log --reverse -p --date=short --format='Date: %ad' -- <file>
//! ```
//!
//! Lines added by a commit (`+8.8.8.8`) date when an entry entered the feed.

use chrono::NaiveDate;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::{error, warn};

use crate::aggregator::HitRecord;
use crate::error::FeedError;
use crate::expand::{expand_hosts, host_count};
use crate::validation::{classify, is_public, Token};

/// Suffix of the history sidecar next to a feed file.
pub const HISTORY_SUFFIX: &str = ".history";

/// Feed file extensions.
const FEED_EXTENSIONS: &[&str] = &[".ipset", ".netset"];

/// Check whether a file name is a primary feed.
///
/// Periodic views of another feed (`name_7d.ipset`, `name_30d.netset`) are
/// excluded since their entries already appear in the primary feed.
///
/// # Examples
/// ```
/// use feedhits::feed::is_feed_file;
/// assert!(is_feed_file("firehol_level1.netset"));
/// assert!(is_feed_file("blocklist_de.ipset"));
/// assert!(!is_feed_file("blocklist_de_7d.ipset"));
/// assert!(!is_feed_file("README.md"));
/// ```
pub fn is_feed_file(name: &str) -> bool {
    let Some(stem) = FEED_EXTENSIONS
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
    else {
        return false;
    };
    !is_periodic_stem(stem)
}

/// `..._<1-3 digits>d`
fn is_periodic_stem(stem: &str) -> bool {
    let Some(rest) = stem.strip_suffix('d') else {
        return false;
    };
    let Some((_, days)) = rest.rsplit_once('_') else {
        return false;
    };
    (1..=3).contains(&days.len()) && days.bytes().all(|b| b.is_ascii_digit())
}

/// Feed name used as the hit category: the file name without extension.
pub fn feed_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Metadata read from a FireHOL feed's comment header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedHeader {
    /// Declared number of unique IPs (`# Entries : 12 subnets, 3456 unique IPs`)
    pub unique_ips: Option<u64>,
    /// Date the file was generated (`# This File Date : Sat Oct 19 10:22:07 UTC 2024`)
    pub file_date: Option<NaiveDate>,
}

impl FeedHeader {
    /// Parse the leading `#` lines of a feed file. Unknown lines are ignored.
    pub fn parse(content: &str) -> Self {
        let mut header = FeedHeader::default();
        for line in content.lines().map(str::trim) {
            let Some(comment) = line.strip_prefix('#') else {
                if line.is_empty() {
                    continue;
                }
                break;
            };
            if header.unique_ips.is_none() {
                header.unique_ips = parse_unique_ips(comment);
            }
            if header.file_date.is_none() {
                if let Some(value) = header_value(comment, "This File Date") {
                    header.file_date = parse_header_date(value);
                }
            }
        }
        header
    }
}

fn header_value<'a>(comment: &'a str, key: &str) -> Option<&'a str> {
    let (name, value) = comment.split_once(':')?;
    (name.trim() == key).then(|| value.trim())
}

/// Number immediately before ` unique IPs`.
fn parse_unique_ips(comment: &str) -> Option<u64> {
    let (before, _) = comment.split_once(" unique IPs")?;
    before.split_whitespace().last()?.parse().ok()
}

/// `date(1)` style timestamp, e.g. `Sat Oct 19 10:22:07 UTC 2024`.
fn parse_header_date(value: &str) -> Option<NaiveDate> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    let [_, month, day, _, _, year] = fields.as_slice() else {
        return None;
    };
    NaiveDate::parse_from_str(&format!("{} {} {}", month, day, year), "%b %d %Y").ok()
}

/// Token carried by an added line of a unified diff.
///
/// # Examples
/// ```
/// use feedhits::feed::extract_added;
/// assert_eq!(extract_added("+8.8.8.8"), Some("8.8.8.8"));
/// assert_eq!(extract_added("+1.2.3.0/24 # note"), Some("1.2.3.0/24"));
/// assert_eq!(extract_added("+++ b/feed.ipset"), None);
/// assert_eq!(extract_added("-8.8.8.8"), None);
/// assert_eq!(extract_added("+# Entries : 3 subnets"), None);
/// ```
pub fn extract_added(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('+')?;
    if rest.starts_with("++") {
        return None;
    }
    rest.split_whitespace().next().filter(|token| !token.starts_with('#'))
}

/// Parse a feed history into `(commit date, added token)` pairs, oldest first.
///
/// Added lines that appear before any `Date:` line have no known date and
/// are ignored.
///
/// # Errors
/// Returns [`FeedError::InvalidDate`] on a `Date:` line that is not `YYYY-MM-DD`.
pub fn parse_history(content: &str) -> Result<Vec<(NaiveDate, &str)>, FeedError> {
    let mut current = None;
    let mut added = Vec::new();

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("Date:") {
            let value = value.trim();
            let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| FeedError::InvalidDate(value.to_string()))?;
            current = Some(date);
        } else if let (Some(date), Some(token)) = (current, extract_added(line)) {
            added.push((date, token));
        }
    }

    Ok(added)
}

/// Everything one feed contributes to a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedScan {
    pub records: Vec<HitRecord>,
    /// Malformed or private tokens
    pub rejected: usize,
    /// Networks above the expansion limit
    pub oversized: usize,
}

/// Produce one [`HitRecord`] per IP listed by a feed.
///
/// With a history, each IP's `first_seen` is the date it was first added and
/// `last_added` the date it was most recently added. Without one, the current
/// entries are dated by the header's file date. Current entries that the
/// history never added (a truncated history, e.g. from a shallow clone) also
/// fall back to the file date.
///
/// Networks expanding to more than `max_network_hosts` hosts are skipped.
pub fn collect_hits(
    feed: &str,
    content: &str,
    history: Option<&str>,
    max_network_hosts: u64,
) -> Result<FeedScan, FeedError> {
    let file_date = FeedHeader::parse(content).file_date;
    let current = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let mut scan = FeedScan::default();
    let mut dates: BTreeMap<Ipv4Addr, (Option<NaiveDate>, Option<NaiveDate>)> = BTreeMap::new();

    match history {
        Some(history) => {
            let added = parse_history(history)?;
            let known: HashSet<&str> = added.iter().map(|&(_, token)| token).collect();
            for (date, token) in added {
                for ip in public_hosts(feed, token, max_network_hosts, &mut scan) {
                    record_date(&mut dates, ip, Some(date));
                }
            }

            let mut undated = 0usize;
            for token in current.filter(|token| !known.contains(token)) {
                for ip in public_hosts(feed, token, max_network_hosts, &mut scan) {
                    if let Entry::Vacant(entry) = dates.entry(ip) {
                        entry.insert((file_date, file_date));
                        undated += 1;
                    }
                }
            }
            if undated > 0 {
                warn!(
                    "{}: {} IPs missing from history, dated by file header",
                    feed, undated
                );
            }
        }
        None => {
            for token in current {
                for ip in public_hosts(feed, token, max_network_hosts, &mut scan) {
                    record_date(&mut dates, ip, file_date);
                }
            }
        }
    }

    scan.records = dates
        .into_iter()
        .map(|(ip, (first_seen, last_added))| HitRecord {
            ip: Some(ip),
            category: Some(feed.to_string()),
            first_seen,
            last_added,
        })
        .collect();

    Ok(scan)
}

fn record_date(
    dates: &mut BTreeMap<Ipv4Addr, (Option<NaiveDate>, Option<NaiveDate>)>,
    ip: Ipv4Addr,
    date: Option<NaiveDate>,
) {
    let (first, last) = dates.entry(ip).or_insert((date, date));
    *first = (*first).into_iter().chain(date).min();
    *last = (*last).max(date);
}

/// Hosts a single token stands for, or nothing if it is unusable.
fn public_hosts(
    feed: &str,
    token: &str,
    max_network_hosts: u64,
    scan: &mut FeedScan,
) -> Vec<Ipv4Addr> {
    let classified = classify(token);
    if !is_public(&classified) {
        scan.rejected += 1;
        return Vec::new();
    }

    match classified {
        Token::Address(ip) => vec![ip],
        Token::Network(net) => {
            let expanded = host_count(net).and_then(|count| {
                if count > max_network_hosts {
                    Ok(None)
                } else {
                    expand_hosts(net).map(Some)
                }
            });
            match expanded {
                Ok(Some(hosts)) => hosts.collect(),
                Ok(None) => {
                    warn!(
                        "{}: skipping {} (more than {} hosts)",
                        feed, net, max_network_hosts
                    );
                    scan.oversized += 1;
                    Vec::new()
                }
                Err(e) => {
                    // classify() never yields such a network
                    error!("{}: {}", feed, e);
                    scan.rejected += 1;
                    Vec::new()
                }
            }
        }
        Token::Invalid => Vec::new(),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Parsing arbitrary content never panics
        #[test]
        fn prop_collect_hits_no_panic(content in "[0-9./#+ a-z\\n]{0,200}") {
            let _ = collect_hits("x", &content, None, 256);
            let _ = FeedHeader::parse(&content);
        }

        /// Every produced record carries a public IP
        #[test]
        fn prop_records_are_public(
            lines in prop::collection::vec((0u8..=255, 0u8..=255, 0u8..=255, 0u8..=255), 0..30)
        ) {
            let content: String = lines
                .iter()
                .map(|(a, b, c, d)| format!("{}.{}.{}.{}\n", a, b, c, d))
                .collect();
            let scan = collect_hits("x", &content, None, 256).unwrap();
            for record in scan.records {
                prop_assert!(!crate::validation::is_reserved_addr(record.ip.unwrap()));
            }
        }
    }
}
