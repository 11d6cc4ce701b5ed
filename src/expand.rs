//! CIDR network expansion into usable host addresses.

use ipnet::Ipv4AddrRange;
use std::net::Ipv4Addr;

use crate::error::FeedError;
use crate::validation::Network;

/// Lazy, ascending sequence of the usable hosts of one network.
///
/// A clone continues from the same position; call [`expand_hosts`] again
/// to start over from the first host.
#[derive(Debug, Clone)]
pub struct Hosts(Ipv4AddrRange);

impl Iterator for Hosts {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

/// Expand a network into its usable host addresses.
///
/// The base address and, for prefixes up to /30, the broadcast address are
/// excluded. A /31 yields both of its addresses (point-to-point link) and a
/// /32 yields the single address. Host bits set in `network.base` are
/// ignored.
///
/// # Errors
/// Returns [`FeedError::InvalidNetwork`] if the prefix is greater than 32.
///
/// # Examples
/// ```
/// use feedhits::expand::expand_hosts;
/// let hosts: Vec<String> = expand_hosts("203.0.113.0/30".parse().unwrap())
///     .unwrap()
///     .map(|ip| ip.to_string())
///     .collect();
/// assert_eq!(hosts, ["203.0.113.1", "203.0.113.2"]);
/// ```
pub fn expand_hosts(network: Network) -> Result<Hosts, FeedError> {
    let net = checked(network)?;
    Ok(Hosts(net.hosts()))
}

/// Number of hosts [`expand_hosts`] yields for `network`, without iterating.
pub fn host_count(network: Network) -> Result<u64, FeedError> {
    let net = checked(network)?;
    Ok(match net.prefix_len() {
        32 => 1,
        31 => 2,
        p => (1u64 << (32 - p)) - 2,
    })
}

fn checked(network: Network) -> Result<ipnet::Ipv4Net, FeedError> {
    network.to_ipnet().ok_or(FeedError::InvalidNetwork {
        base: network.base,
        prefix_len: network.prefix_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Network {
        s.parse().unwrap()
    }

    fn hosts(s: &str) -> Vec<String> {
        expand_hosts(net(s))
            .unwrap()
            .map(|ip| ip.to_string())
            .collect()
    }

    #[test]
    fn test_expand_slash_30() {
        assert_eq!(hosts("203.0.113.0/30"), ["203.0.113.1", "203.0.113.2"]);
    }

    #[test]
    fn test_expand_slash_24_count() {
        let all: Vec<Ipv4Addr> = expand_hosts(net("8.8.8.0/24")).unwrap().collect();
        assert_eq!(all.len(), 254);
        assert_eq!(all[0], Ipv4Addr::new(8, 8, 8, 1));
        assert_eq!(all[253], Ipv4Addr::new(8, 8, 8, 254));
    }

    #[test]
    fn test_expand_slash_31() {
        assert_eq!(hosts("8.8.8.0/31"), ["8.8.8.0", "8.8.8.1"]);
    }

    #[test]
    fn test_expand_slash_32() {
        assert_eq!(hosts("8.8.8.8/32"), ["8.8.8.8"]);
    }

    #[test]
    fn test_expand_masks_host_bits() {
        assert_eq!(hosts("203.0.113.2/30"), ["203.0.113.1", "203.0.113.2"]);
    }

    #[test]
    fn test_expand_ascending() {
        let all: Vec<Ipv4Addr> = expand_hosts(net("8.8.0.0/22")).unwrap().collect();
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_expand_restartable() {
        let n = net("45.0.0.0/28");
        let first: Vec<_> = expand_hosts(n).unwrap().collect();
        let second: Vec<_> = expand_hosts(n).unwrap().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_expand_slash_0_is_lazy() {
        let mut all = expand_hosts(net("0.0.0.0/0")).unwrap();
        assert_eq!(all.next(), Some(Ipv4Addr::new(0, 0, 0, 1)));
        assert_eq!(all.next(), Some(Ipv4Addr::new(0, 0, 0, 2)));
    }

    #[test]
    fn test_expand_invalid_prefix() {
        let bad = Network::new(Ipv4Addr::new(8, 8, 8, 0), 33);
        let err = expand_hosts(bad).unwrap_err();
        assert_eq!(
            err,
            FeedError::InvalidNetwork {
                base: Ipv4Addr::new(8, 8, 8, 0),
                prefix_len: 33
            }
        );
        assert!(err.to_string().contains("8.8.8.0/33"));
    }

    #[test]
    fn test_host_count() {
        assert_eq!(host_count(net("8.8.8.0/24")).unwrap(), 254);
        assert_eq!(host_count(net("8.8.8.0/30")).unwrap(), 2);
        assert_eq!(host_count(net("8.8.8.0/31")).unwrap(), 2);
        assert_eq!(host_count(net("8.8.8.8/32")).unwrap(), 1);
        assert_eq!(host_count(net("0.0.0.0/0")).unwrap(), (1u64 << 32) - 2);
        assert!(host_count(Network::new(Ipv4Addr::UNSPECIFIED, 64)).is_err());
    }
}
