//! Error types for feedhits.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Invalid network: {base}/{prefix_len} (prefix must be 0-32)")]
    InvalidNetwork { base: std::net::Ipv4Addr, prefix_len: u8 },

    #[error("Invalid date in feed history: {0}")]
    InvalidDate(String),
}
