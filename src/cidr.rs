//! Decomposition of arbitrary IPv4 ranges into aligned CIDR subnets.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Decompose an inclusive address range into the minimum sequence of
/// maximal CIDR subnets whose union is exactly `[begin, end]`.
///
/// Subnets are emitted in ascending network-address order. An empty
/// sequence is returned when `begin > end`.
///
/// # Examples
/// ```
/// use mmdbgen::range_to_subnets;
///
/// let subnets = range_to_subnets("10.0.0.0".parse().unwrap(), "10.0.0.255".parse().unwrap());
/// assert_eq!(subnets.len(), 1);
/// assert_eq!(subnets[0].to_string(), "10.0.0.0/24");
/// ```
pub fn range_to_subnets(begin: Ipv4Addr, end: Ipv4Addr) -> Vec<Ipv4Net> {
    let mut a = u32::from(begin);
    let b = u32::from(end);
    let mut out = Vec::new();

    while a <= b {
        // Widest aligned block starting at `a`, shrunk until it fits
        // inside the range. The 2^32 block only survives for the full
        // address space.
        let mut span = if a == 0 { 32 } else { a.trailing_zeros() };
        while u64::from(a) + (1u64 << span) - 1 > u64::from(b) {
            span -= 1;
        }

        let prefix_len = (32 - span) as u8;
        out.push(Ipv4Net::new(Ipv4Addr::from(a), prefix_len).expect("prefix length is at most 32"));

        if span == 32 {
            break;
        }
        match a.checked_add(1u32 << span) {
            Some(next) => a = next,
            // wrapped past 255.255.255.255
            None => break,
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnets(begin: &str, end: &str) -> Vec<String> {
        range_to_subnets(begin.parse().unwrap(), end.parse().unwrap())
            .iter()
            .map(|n| n.to_string())
            .collect()
    }

    /// The union must be exactly `[begin, end]`: contiguous, in order,
    /// and with no subnet mergeable into its neighbor.
    fn assert_exact_cover(begin: &str, end: &str) {
        let a = u32::from(begin.parse::<Ipv4Addr>().unwrap());
        let b = u32::from(end.parse::<Ipv4Addr>().unwrap());
        let nets = range_to_subnets(Ipv4Addr::from(a), Ipv4Addr::from(b));

        let mut next = u64::from(a);
        for net in &nets {
            assert_eq!(u64::from(u32::from(net.network())), next, "gap before {}", net);
            next += 1u64 << (32 - net.prefix_len());
        }
        assert_eq!(next, u64::from(b) + 1, "cover does not end at {}", end);

        // minimality: no two adjacent subnets form an aligned pair
        for pair in nets.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if lo.prefix_len() == hi.prefix_len() && lo.prefix_len() > 0 {
                let size = 1u64 << (32 - lo.prefix_len());
                let merged_aligned =
                    u64::from(u32::from(lo.network())) % (size * 2) == 0;
                assert!(
                    !(merged_aligned
                        && u64::from(u32::from(hi.network()))
                            == u64::from(u32::from(lo.network())) + size),
                    "{} and {} could merge",
                    lo,
                    hi
                );
            }
        }
    }

    #[test]
    fn test_aligned_block() {
        assert_eq!(subnets("10.0.0.0", "10.0.0.255"), vec!["10.0.0.0/24"]);
        assert_eq!(subnets("192.168.0.0", "192.168.255.255"), vec!["192.168.0.0/16"]);
    }

    #[test]
    fn test_single_address() {
        assert_eq!(subnets("10.0.0.5", "10.0.0.5"), vec!["10.0.0.5/32"]);
        assert_eq!(
            subnets("255.255.255.255", "255.255.255.255"),
            vec!["255.255.255.255/32"]
        );
    }

    #[test]
    fn test_unaligned_range_spanning_byte_boundary() {
        assert_eq!(
            subnets("10.0.0.5", "10.0.1.10"),
            vec![
                "10.0.0.5/32",
                "10.0.0.6/31",
                "10.0.0.8/29",
                "10.0.0.16/28",
                "10.0.0.32/27",
                "10.0.0.64/26",
                "10.0.0.128/25",
                "10.0.1.0/29",
                "10.0.1.8/31",
                "10.0.1.10/32",
            ]
        );
        assert_exact_cover("10.0.0.5", "10.0.1.10");
    }

    #[test]
    fn test_full_address_space() {
        assert_eq!(subnets("0.0.0.0", "255.255.255.255"), vec!["0.0.0.0/0"]);
    }

    #[test]
    fn test_range_ending_at_address_space_top() {
        assert_eq!(
            subnets("255.255.255.254", "255.255.255.255"),
            vec!["255.255.255.254/31"]
        );
        assert_exact_cover("255.255.0.1", "255.255.255.255");
    }

    #[test]
    fn test_empty_when_begin_after_end() {
        assert!(subnets("10.0.0.1", "10.0.0.0").is_empty());
    }

    #[test]
    fn test_exact_cover_properties() {
        assert_exact_cover("0.0.0.1", "0.0.0.14");
        assert_exact_cover("1.2.3.4", "5.6.7.8");
        assert_exact_cover("10.0.0.0", "10.0.0.255");
        assert_exact_cover("172.16.254.1", "172.17.0.9");
        assert_exact_cover("0.0.0.0", "127.255.255.255");
    }
}
