use crate::error::NetworkError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// IP address range (e.g. "192.168.1.100-192.168.1.110" or "192.168.1.100").
///
/// `start == end` denotes a single fixed address. A range whose start lies
/// after its end (or whose bounds are of different families) parses but
/// contains no addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    pub start: IpAddr,
    pub end: IpAddr,
}

impl IpRange {
    pub fn single(ip: IpAddr) -> Self {
        Self { start: ip, end: ip }
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn is_empty(&self) -> bool {
        !same_family(self.start, self.end) || octets(self.start) > octets(self.end)
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        if self.is_empty() || !same_family(ip, self.start) {
            return false;
        }
        let ip = octets(ip);
        octets(self.start) <= ip && ip <= octets(self.end)
    }

    /// Addresses from start to end inclusive, in address order.
    pub fn iter(&self) -> Addresses {
        Addresses {
            next: (!self.is_empty()).then_some(self.start),
            end: self.end,
        }
    }
}

impl FromStr for IpRange {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ip) = s.trim().parse::<IpAddr>() {
            return Ok(Self::single(ip));
        }

        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 2 {
            return Err(NetworkError::invalid(s, "expected an address or start-end"));
        }

        let start = parse_addr(s, parts[0])?;
        let end = parse_addr(s, parts[1])?;

        Ok(Self { start, end })
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

fn parse_addr(range: &str, part: &str) -> Result<IpAddr, NetworkError> {
    let part = part.trim();
    part.parse::<IpAddr>()
        .map_err(|_| NetworkError::invalid(range, format!("'{part}' is not an IP address")))
}

fn same_family(a: IpAddr, b: IpAddr) -> bool {
    a.is_ipv4() == b.is_ipv4()
}

fn octets(ip: IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Next address by incrementing the last byte with carry. Wraps at the top of
/// the address space.
pub fn next_ip(ip: IpAddr) -> IpAddr {
    let mut bytes = octets(ip);
    for byte in bytes.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }

    match ip {
        IpAddr::V4(_) => {
            let mut v4 = [0u8; 4];
            v4.copy_from_slice(&bytes);
            IpAddr::V4(Ipv4Addr::from(v4))
        }
        IpAddr::V6(_) => {
            let mut v6 = [0u8; 16];
            v6.copy_from_slice(&bytes);
            IpAddr::V6(Ipv6Addr::from(v6))
        }
    }
}

/// Iterator over the addresses of an [`IpRange`].
#[derive(Debug, Clone)]
pub struct Addresses {
    next: Option<IpAddr>,
    end: IpAddr,
}

impl Iterator for Addresses {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        let current = self.next?;
        self.next = if current == self.end {
            None
        } else {
            Some(next_ip(current))
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single() {
        let range: IpRange = " 192.168.1.1 ".parse().unwrap();
        assert!(range.is_single());
        assert_eq!(range.to_string(), "192.168.1.1");
    }

    #[test]
    fn test_parse_range_with_whitespace() {
        let range: IpRange = "192.168.1.1 - 192.168.1.3".parse().unwrap();
        assert!(!range.is_single());
        assert_eq!(range.to_string(), "192.168.1.1-192.168.1.3");
        assert_eq!(range.iter().count(), 3);
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["invalid-range", "", "192.168.1.1-", "1.1.1.1-2.2.2.2-3.3.3.3", "300.1.1.1"] {
            let result = input.parse::<IpRange>();
            assert!(
                matches!(result, Err(NetworkError::InvalidRange { .. })),
                "expected parse failure for {input:?}"
            );
        }
    }

    #[test]
    fn test_mixed_families_yield_no_addresses() {
        let range: IpRange = "192.168.1.1-::1".parse().unwrap();
        assert!(range.is_empty());
        assert_eq!(range.iter().count(), 0);
    }

    #[test]
    fn test_reversed_range_yields_no_addresses() {
        let range: IpRange = "192.168.1.3-192.168.1.1".parse().unwrap();
        assert!(range.is_empty());
        assert!(!range.is_single());
        assert_eq!(range.iter().count(), 0);
        assert!(!range.contains("192.168.1.2".parse().unwrap()));
    }

    #[test]
    fn test_iteration_carries_across_octets() {
        let range: IpRange = "10.0.0.254-10.0.1.1".parse().unwrap();
        let addresses: Vec<String> = range.iter().map(|ip| ip.to_string()).collect();
        assert_eq!(addresses, vec!["10.0.0.254", "10.0.0.255", "10.0.1.0", "10.0.1.1"]);
    }

    #[test]
    fn test_iteration_ipv6() {
        let range: IpRange = "fd00::fffe-fd00::1:1".parse().unwrap();
        let addresses: Vec<String> = range.iter().map(|ip| ip.to_string()).collect();
        assert_eq!(addresses, vec!["fd00::fffe", "fd00::ffff", "fd00::1:0", "fd00::1:1"]);
    }

    #[test]
    fn test_iteration_stops_at_top_of_space() {
        let range: IpRange = "255.255.255.254-255.255.255.255".parse().unwrap();
        assert_eq!(range.iter().count(), 2);
        assert_eq!(next_ip("255.255.255.255".parse().unwrap()).to_string(), "0.0.0.0");
    }

    #[test]
    fn test_contains() {
        let range: IpRange = "192.168.1.10-192.168.1.20".parse().unwrap();
        assert!(range.contains("192.168.1.15".parse().unwrap()));
        assert!(!range.contains("192.168.1.21".parse().unwrap()));
        assert!(!range.contains("::1".parse().unwrap()));
    }
}
