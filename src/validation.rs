//! Token classification and public-range validation.
//!
//! A feed line carries either a bare IPv4 address (`8.8.8.8`) or a CIDR
//! network (`8.8.8.0/24`). This module provides:
//! - [`classify`] - strict grammar check returning a typed [`Token`]
//! - [`validate`] - accept only tokens outside private/reserved blocks
//!
//! The grammar is deliberately narrow: four decimal octets 0-255 without
//! leading zeros, optionally followed by `/` and a prefix 0-32, also without
//! leading zeros.

use ipnet::Ipv4Net;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Blocks that are never meaningful in a public threat blocklist.
const RESERVED_V4: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),       // "this" network
    (Ipv4Addr::new(10, 0, 0, 0), 8),      // RFC 1918
    (Ipv4Addr::new(100, 64, 0, 0), 10),   // shared address space (CGNAT)
    (Ipv4Addr::new(127, 0, 0, 0), 8),     // loopback
    (Ipv4Addr::new(169, 254, 0, 0), 16),  // link-local
    (Ipv4Addr::new(172, 16, 0, 0), 12),   // RFC 1918
    (Ipv4Addr::new(192, 0, 0, 0), 24),    // IETF protocol assignments
    (Ipv4Addr::new(192, 0, 2, 0), 24),    // TEST-NET-1
    (Ipv4Addr::new(192, 168, 0, 0), 16),  // RFC 1918
    (Ipv4Addr::new(198, 18, 0, 0), 15),   // benchmarking
    (Ipv4Addr::new(198, 51, 100, 0), 24), // TEST-NET-2
    (Ipv4Addr::new(203, 0, 113, 0), 24),  // TEST-NET-3
    (Ipv4Addr::new(224, 0, 0, 0), 4),     // multicast
    (Ipv4Addr::new(240, 0, 0, 0), 4),     // reserved + limited broadcast
];

/// An IPv4 network as written in a feed: base address plus prefix length.
///
/// Unlike [`Ipv4Net`], the prefix is not checked on construction, so a
/// value built by hand can carry an out-of-range prefix. [`classify`] only
/// ever produces in-range networks; [`crate::expand::expand_hosts`] rejects
/// the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Network {
    pub base: Ipv4Addr,
    pub prefix_len: u8,
}

impl Network {
    pub const fn new(base: Ipv4Addr, prefix_len: u8) -> Self {
        Self { base, prefix_len }
    }

    /// Convert to an [`Ipv4Net`], or `None` if the prefix is out of range.
    pub fn to_ipnet(self) -> Option<Ipv4Net> {
        Ipv4Net::new(self.base, self.prefix_len).ok()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

/// Result of classifying a raw feed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Address(Ipv4Addr),
    Network(Network),
    Invalid,
}

impl Token {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Token::Invalid)
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match classify(s) {
            Token::Network(net) => Ok(net),
            _ => Err(format!("Invalid CIDR: {}", s)),
        }
    }
}

/// Classify a raw token as an address, a network, or neither.
///
/// # Examples
/// ```
/// use feedhits::validation::{classify, Token};
/// assert!(matches!(classify("192.168.1.1"), Token::Address(_)));
/// assert!(matches!(classify("8.8.8.0/24"), Token::Network(_)));
/// assert_eq!(classify("999.1.1.1"), Token::Invalid);
/// assert_eq!(classify("8.8.8.8/33"), Token::Invalid);
/// ```
pub fn classify(token: &str) -> Token {
    match token.split_once('/') {
        None => parse_dotted_quad(token).map_or(Token::Invalid, Token::Address),
        Some((addr, prefix)) => match (parse_dotted_quad(addr), parse_prefix(prefix)) {
            (Some(base), Some(prefix_len)) => Token::Network(Network::new(base, prefix_len)),
            _ => Token::Invalid,
        },
    }
}

/// Check that a token is a well-formed, publicly routable address or network.
///
/// Malformed and private tokens are both simply "not usable"; callers skip
/// them without logging.
///
/// # Examples
/// ```
/// use feedhits::validation::validate;
/// assert!(validate("8.8.8.8"));
/// assert!(validate("8.8.8.0/24"));
/// assert!(!validate("10.1.2.3"));
/// assert!(!validate("not-an-ip"));
/// ```
pub fn validate(token: &str) -> bool {
    is_public(&classify(token))
}

/// Check an already classified token against the reserved blocks.
pub fn is_public(token: &Token) -> bool {
    match *token {
        Token::Address(addr) => !is_reserved_addr(addr),
        Token::Network(net) => net.to_ipnet().is_some_and(|n| !is_reserved_net(&n)),
        Token::Invalid => false,
    }
}

/// Check whether an address lies inside a private/reserved block.
pub fn is_reserved_addr(addr: Ipv4Addr) -> bool {
    reserved_blocks().any(|block| block.contains(&addr))
}

/// Check whether a network lies entirely inside a private/reserved block.
///
/// Networks that only overlap a reserved block (`0.0.0.0/0` overlaps all of
/// them) are not reserved.
pub fn is_reserved_net(net: &Ipv4Net) -> bool {
    let net = net.trunc();
    reserved_blocks().any(|block| block.contains(&net))
}

fn reserved_blocks() -> impl Iterator<Item = Ipv4Net> {
    RESERVED_V4
        .iter()
        .filter_map(|&(addr, prefix)| Ipv4Net::new(addr, prefix).ok())
}

fn parse_dotted_quad(s: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = s.split('.');
    for octet in octets.iter_mut() {
        *octet = parse_bounded(parts.next()?, 255)?.try_into().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}

fn parse_prefix(s: &str) -> Option<u8> {
    parse_bounded(s, 32)?.try_into().ok()
}

/// Parse a canonical decimal number no greater than `max`.
///
/// Canonical means ASCII digits only, 1-3 of them, and no leading zero
/// unless the number is zero itself.
fn parse_bounded(s: &str, max: u16) -> Option<u16> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 3 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    let value = bytes
        .iter()
        .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));
    (value <= max).then_some(value)
}
