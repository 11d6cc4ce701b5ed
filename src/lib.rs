//! # feedhits - Blocklist feed normalization and per-IP hit aggregation
//!
//! Turns a directory of heterogeneous IP blocklist feeds (FireHOL-style
//! `.ipset` / `.netset` files) into one record per IPv4 address, listing
//! every feed that reported it and the first/last dates it was seen.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        feedhits                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: run, check, expand, version                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Feed directory, limits, workers, output              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pipeline (tokio + futures)                                 │
//! │    ├── Feed discovery and freshness check                   │
//! │    └── Chunked parallel scan, ordered merge                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Feed (chrono)                                              │
//! │    └── Headers, git-log history, dated hit records          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Validation / Expand (ipnet)                                │
//! │    ├── Token classification, reserved-range filter          │
//! │    └── Network to usable host expansion                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Aggregator (serde)                                         │
//! │    └── Group by IP, categories, first/last seen             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use feedhits::aggregator::{aggregate_records, HitRecord, IpKey};
//! use feedhits::expand::expand_hosts;
//! use feedhits::validation::{classify, validate, Token};
//! use chrono::NaiveDate;
//! use std::net::Ipv4Addr;
//!
//! let seen = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//!
//! assert!(validate("8.8.8.8"));
//! assert!(!validate("192.168.1.1"));
//!
//! let Token::Network(net) = classify("8.8.8.0/30") else { unreachable!() };
//! let records: Vec<HitRecord> = expand_hosts(net)
//!     .unwrap()
//!     .map(|ip| HitRecord::new(ip, "feed_a", seen, seen))
//!     .collect();
//!
//! let aggregated = aggregate_records(records);
//! assert_eq!(aggregated.len(), 2);
//! assert_eq!(aggregated[&IpKey::Ip(Ipv4Addr::new(8, 8, 8, 1))].hits_count, 1);
//! ```
//!
//! ## Modules
//!
//! - [`aggregator`] - Per-IP grouping and summary statistics
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Typed errors of the core
//! - [`expand`] - CIDR to host expansion
//! - [`feed`] - Feed file parsing (headers, history, hit records)
//! - [`fs_abstraction`] - Filesystem trait for testable feed reads
//! - [`lock`] - File locking for concurrent execution prevention
//! - [`pipeline`] - Feed discovery, parallel scan and output
//! - [`utils`] - Count formatting
//! - [`validation`] - Token classification and reserved-range filtering

pub mod aggregator;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod expand;
pub mod feed;
pub mod fs_abstraction;
pub mod lock;
pub mod pipeline;
pub mod utils;
pub mod validation;

pub use aggregator::{aggregate, group_by_ip, AggregatedRecord, HitRecord, IpKey};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::FeedError;
pub use expand::expand_hosts;
pub use validation::{classify, validate, Network, Token};
