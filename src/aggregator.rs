//! Per-IP aggregation of feed hits.
//!
//! Every feed that lists an IP contributes one [`HitRecord`]. The aggregator
//! groups those records by IP and derives one [`AggregatedRecord`] per IP:
//! how many feeds flagged it, which categories they belong to, and the
//! earliest/latest dates it was seen.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv4Addr;

/// One observation of an IP by one feed.
///
/// `ip` is required by contract; a `None` comes from an upstream bug and is
/// grouped under [`IpKey::Absent`] instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRecord {
    pub ip: Option<Ipv4Addr>,
    pub category: Option<String>,
    pub first_seen: Option<NaiveDate>,
    pub last_added: Option<NaiveDate>,
}

impl HitRecord {
    pub fn new(
        ip: Ipv4Addr,
        category: impl Into<String>,
        first_seen: NaiveDate,
        last_added: NaiveDate,
    ) -> Self {
        Self {
            ip: Some(ip),
            category: Some(category.into()),
            first_seen: Some(first_seen),
            last_added: Some(last_added),
        }
    }

    /// Split off the grouping key, leaving the record body.
    pub fn into_parts(self) -> (IpKey, Hit) {
        let key = self.ip.map_or(IpKey::Absent, IpKey::Ip);
        let hit = Hit {
            category: self.category,
            first_seen: self.first_seen,
            last_added: self.last_added,
        };
        (key, hit)
    }
}

/// A [`HitRecord`] without its IP, which lives in the enclosing map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hit {
    pub category: Option<String>,
    pub first_seen: Option<NaiveDate>,
    pub last_added: Option<NaiveDate>,
}

/// Grouping key: an IP, or the sentinel bucket for keyless records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpKey {
    Absent,
    Ip(Ipv4Addr),
}

impl fmt::Display for IpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpKey::Absent => f.write_str("absent"),
            IpKey::Ip(ip) => write!(f, "{}", ip),
        }
    }
}

impl Serialize for IpKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Summary of every hit recorded against one IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedRecord {
    pub ip: IpKey,
    pub hits_count: usize,
    pub categories: BTreeSet<String>,
    pub first_seen: Option<NaiveDate>,
    pub last_added: Option<NaiveDate>,
    pub hits: Vec<Hit>,
}

impl AggregatedRecord {
    /// Summarize one IP's group.
    ///
    /// Duplicate hits from the same category are counted separately.
    /// Missing dates and categories are skipped when deriving statistics; a
    /// group without any date yields `None`.
    pub fn from_hits(ip: IpKey, hits: Vec<Hit>) -> Self {
        let categories = hits.iter().filter_map(|h| h.category.clone()).collect();
        let first_seen = hits.iter().filter_map(|h| h.first_seen).min();
        let last_added = hits.iter().filter_map(|h| h.last_added).max();

        Self {
            ip,
            hits_count: hits.len(),
            categories,
            first_seen,
            last_added,
            hits,
        }
    }
}

/// Group records by IP, keeping each group in input order.
pub fn group_by_ip<I>(records: I) -> BTreeMap<IpKey, Vec<Hit>>
where
    I: IntoIterator<Item = HitRecord>,
{
    records
        .into_iter()
        .map(HitRecord::into_parts)
        .fold(BTreeMap::new(), |mut groups, (key, hit)| {
            groups.entry(key).or_insert_with(Vec::new).push(hit);
            groups
        })
}

/// Derive one [`AggregatedRecord`] per group.
pub fn aggregate(grouped: BTreeMap<IpKey, Vec<Hit>>) -> BTreeMap<IpKey, AggregatedRecord> {
    grouped
        .into_iter()
        .map(|(ip, hits)| (ip, AggregatedRecord::from_hits(ip, hits)))
        .collect()
}

/// Group and aggregate in one step.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use feedhits::aggregator::{aggregate_records, HitRecord, IpKey};
/// use std::net::Ipv4Addr;
///
/// let ip = Ipv4Addr::new(8, 8, 8, 8);
/// let day = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
/// let records = vec![
///     HitRecord::new(ip, "X", day("2020-01-01"), day("2020-06-01")),
///     HitRecord::new(ip, "Y", day("2019-01-01"), day("2021-01-01")),
/// ];
/// let out = aggregate_records(records);
/// let rec = &out[&IpKey::Ip(ip)];
/// assert_eq!(rec.hits_count, 2);
/// assert_eq!(rec.first_seen, Some(day("2019-01-01")));
/// assert_eq!(rec.last_added, Some(day("2021-01-01")));
/// ```
pub fn aggregate_records<I>(records: I) -> BTreeMap<IpKey, AggregatedRecord>
where
    I: IntoIterator<Item = HitRecord>,
{
    aggregate(group_by_ip(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn record(addr: &str, cat: &str, fs: &str, la: &str) -> HitRecord {
        HitRecord::new(ip(addr), cat, day(fs), day(la))
    }

    #[test]
    fn test_aggregate_two_feeds_either_order() {
        let a = record("8.8.8.8", "X", "2020-01-01", "2020-06-01");
        let b = record("8.8.8.8", "Y", "2019-01-01", "2021-01-01");

        for records in [vec![a.clone(), b.clone()], vec![b, a]] {
            let out = aggregate_records(records);
            let rec = &out[&IpKey::Ip(ip("8.8.8.8"))];
            assert_eq!(rec.hits_count, 2);
            assert_eq!(
                rec.categories,
                BTreeSet::from(["X".to_string(), "Y".to_string()])
            );
            assert_eq!(rec.first_seen, Some(day("2019-01-01")));
            assert_eq!(rec.last_added, Some(day("2021-01-01")));
        }
    }

    #[test]
    fn test_group_by_ip_is_stable() {
        let records = vec![
            record("1.1.1.1", "first", "2020-01-01", "2020-01-01"),
            record("2.2.2.2", "other", "2020-01-01", "2020-01-01"),
            record("1.1.1.1", "second", "2020-01-01", "2020-01-01"),
            record("1.1.1.1", "third", "2020-01-01", "2020-01-01"),
        ];
        let grouped = group_by_ip(records);
        let cats: Vec<_> = grouped[&IpKey::Ip(ip("1.1.1.1"))]
            .iter()
            .map(|h| h.category.as_deref().unwrap())
            .collect();
        assert_eq!(cats, ["first", "second", "third"]);
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn test_hits_preserve_input_order() {
        let records = vec![
            record("1.1.1.1", "b", "2021-01-01", "2021-01-01"),
            record("1.1.1.1", "a", "2020-01-01", "2020-01-01"),
        ];
        let out = aggregate_records(records);
        let hits = &out[&IpKey::Ip(ip("1.1.1.1"))].hits;
        assert_eq!(hits[0].category.as_deref(), Some("b"));
        assert_eq!(hits[1].category.as_deref(), Some("a"));
    }

    #[test]
    fn test_duplicate_category_counts_twice() {
        let records = vec![
            record("1.1.1.1", "spam", "2020-01-01", "2020-01-01"),
            record("1.1.1.1", "spam", "2020-02-01", "2020-02-01"),
        ];
        let out = aggregate_records(records);
        let rec = &out[&IpKey::Ip(ip("1.1.1.1"))];
        assert_eq!(rec.hits_count, 2);
        assert_eq!(rec.categories.len(), 1);
    }

    #[test]
    fn test_missing_ip_goes_to_absent_bucket() {
        let keyless = HitRecord {
            ip: None,
            category: Some("broken".to_string()),
            first_seen: None,
            last_added: None,
        };
        let records = vec![
            keyless.clone(),
            record("1.1.1.1", "ok", "2020-01-01", "2020-01-01"),
            keyless,
        ];
        let out = aggregate_records(records);
        assert_eq!(out.len(), 2);
        assert_eq!(out[&IpKey::Absent].hits_count, 2);
    }

    #[test]
    fn test_missing_fields_still_grouped() {
        let partial = HitRecord {
            ip: Some(ip("1.1.1.1")),
            category: None,
            first_seen: None,
            last_added: None,
        };
        let records = vec![
            partial.clone(),
            record("1.1.1.1", "ok", "2020-03-01", "2020-04-01"),
        ];
        let out = aggregate_records(records);
        let rec = &out[&IpKey::Ip(ip("1.1.1.1"))];
        assert_eq!(rec.hits_count, 2);
        assert_eq!(rec.categories.len(), 1);
        assert_eq!(rec.first_seen, Some(day("2020-03-01")));
        assert_eq!(rec.last_added, Some(day("2020-04-01")));

        let alone = aggregate_records(vec![partial]);
        let rec = &alone[&IpKey::Ip(ip("1.1.1.1"))];
        assert_eq!(rec.first_seen, None);
        assert_eq!(rec.last_added, None);
        assert!(rec.categories.is_empty());
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_records(Vec::new()).is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let out = aggregate_records(vec![record("8.8.8.8", "X", "2020-01-01", "2020-06-01")]);
        let json = serde_json::to_value(&out[&IpKey::Ip(ip("8.8.8.8"))]).unwrap();
        assert_eq!(json["ip"], "8.8.8.8");
        assert_eq!(json["hits_count"], 1);
        assert_eq!(json["categories"][0], "X");
        assert_eq!(json["first_seen"], "2020-01-01");
        assert_eq!(json["last_added"], "2020-06-01");
        assert_eq!(json["hits"][0]["category"], "X");
        assert!(json["hits"][0].get("ip").is_none());
    }

    #[test]
    fn test_ip_key_display() {
        assert_eq!(IpKey::Absent.to_string(), "absent");
        assert_eq!(IpKey::Ip(ip("1.2.3.4")).to_string(), "1.2.3.4");
        assert!(IpKey::Absent < IpKey::Ip(Ipv4Addr::UNSPECIFIED));
    }
}
