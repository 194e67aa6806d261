//! Target parsing utilities
//!
//! Turns a target string into the ordered set of addresses to probe:
//! - explicit CIDR blocks, IPv4 or IPv6 (`192.168.10.0/24`, `fd00::/120`)
//! - a bare IPv4 address, widened to its legacy classful network
//!   (`10.x` → /8, `172.16.x` → /16, `192.168.x` → /24)
//!
//! A bare IPv6 address is rejected: there is no sensible default prefix.

use crate::error::ScanError;
use ipnetwork::IpNetwork;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A contiguous block of addresses, enumerated in ascending order from the
/// network base. Network and broadcast addresses are included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    base: IpAddr,
    prefix: u8,
}

impl AddressRange {
    /// Build a range from an address and prefix length. Host bits of `addr`
    /// are cleared.
    pub fn new(addr: IpAddr, prefix: u8) -> crate::Result<Self> {
        let width = address_width(&addr);
        if prefix > width {
            return Err(ScanError::UnsupportedRange(format!(
                "prefix length /{} exceeds {} bits",
                prefix, width
            )));
        }

        let base = from_bits(to_bits(&addr) & network_mask(width, prefix), addr.is_ipv4());
        Ok(Self { base, prefix })
    }

    /// Range for a bare IPv4 address, sized by its legacy address class.
    pub fn classful(addr: Ipv4Addr) -> Self {
        let prefix = classful_prefix(addr);
        let bits = u32::from(addr) & (u32::MAX << (32 - prefix));
        Self {
            base: IpAddr::V4(Ipv4Addr::from(bits)),
            prefix,
        }
    }

    /// First address of the block
    pub fn network(&self) -> IpAddr {
        self.base
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn host_bits(&self) -> u8 {
        address_width(&self.base) - self.prefix
    }

    fn first_bits(&self) -> u128 {
        to_bits(&self.base)
    }

    fn last_bits(&self) -> u128 {
        self.first_bits() | host_mask(self.host_bits())
    }

    /// Last address of the block
    pub fn last(&self) -> IpAddr {
        from_bits(self.last_bits(), self.base.is_ipv4())
    }

    /// Number of addresses in the block. Saturates for an IPv6 `/0`.
    pub fn len(&self) -> u128 {
        match self.host_bits() {
            128 => u128::MAX,
            bits => 1u128 << bits,
        }
    }

    /// Always false, a block holds at least one address. Present for API
    /// symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        if addr.is_ipv4() != self.base.is_ipv4() {
            return false;
        }
        let bits = to_bits(&addr);
        bits >= self.first_bits() && bits <= self.last_bits()
    }

    /// Lazily enumerate the block in ascending order
    pub fn iter(&self) -> AddressIter {
        AddressIter {
            next: self.first_bits(),
            last: self.last_bits(),
            ipv4: self.base.is_ipv4(),
            done: false,
        }
    }
}

impl From<IpNetwork> for AddressRange {
    fn from(network: IpNetwork) -> Self {
        let prefix = network.prefix();
        let base = from_bits(
            to_bits(&network.ip()) & network_mask(address_width(&network.ip()), prefix),
            network.is_ipv4(),
        );
        Self { base, prefix }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

impl IntoIterator for AddressRange {
    type Item = IpAddr;
    type IntoIter = AddressIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &AddressRange {
    type Item = IpAddr;
    type IntoIter = AddressIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over an [`AddressRange`]
#[derive(Debug, Clone)]
pub struct AddressIter {
    next: u128,
    last: u128,
    ipv4: bool,
    done: bool,
}

impl Iterator for AddressIter {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        if self.done {
            return None;
        }

        let current = self.next;
        if current == self.last {
            self.done = true;
        } else {
            self.next += 1;
        }
        Some(from_bits(current, self.ipv4))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        match (self.last - self.next).checked_add(1).map(usize::try_from) {
            Some(Ok(remaining)) => (remaining, Some(remaining)),
            _ => (usize::MAX, None),
        }
    }
}

/// Resolve a target string into the addresses to probe.
///
/// An explicit CIDR wins. Without a prefix, a bare IPv4 address is widened
/// to its classful network and a bare IPv6 address is rejected. When the
/// string is neither, the CIDR parse error is returned.
pub fn resolve(spec: &str) -> crate::Result<AddressRange> {
    let spec = spec.trim();

    let cidr_error = match parse_cidr(spec) {
        Ok(range) => return Ok(range),
        Err(e) => e,
    };

    match spec.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => Ok(AddressRange::classful(addr)),
        Ok(IpAddr::V6(addr)) => Err(ScanError::UnsupportedRange(format!(
            "IPv6 address {} needs an explicit prefix length",
            addr
        ))),
        Err(_) => Err(cidr_error),
    }
}

/// Parse IPv4 or IPv6 CIDR notation
fn parse_cidr(spec: &str) -> crate::Result<AddressRange> {
    // ipnetwork reads a bare address as a host route; we want the fallback
    if !spec.contains('/') {
        return Err(ScanError::UnsupportedRange(format!(
            "invalid target {:?}: missing prefix length",
            spec
        )));
    }

    let network: IpNetwork = spec.parse().map_err(|e| {
        ScanError::UnsupportedRange(format!("invalid CIDR {:?}: {}", spec, e))
    })?;

    Ok(AddressRange::from(network))
}

/// Prefix length implied by the first octet under classful addressing
pub fn classful_prefix(addr: Ipv4Addr) -> u8 {
    match addr.octets()[0] {
        0x00..=0x7f => 8,
        0x80..=0xbf => 16,
        _ => 24,
    }
}

fn address_width(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn to_bits(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(*v4)),
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

fn from_bits(bits: u128, ipv4: bool) -> IpAddr {
    if ipv4 {
        IpAddr::V4(Ipv4Addr::from(bits as u32))
    } else {
        IpAddr::V6(Ipv6Addr::from(bits))
    }
}

fn host_mask(host_bits: u8) -> u128 {
    match host_bits {
        128 => u128::MAX,
        bits => (1u128 << bits) - 1,
    }
}

fn network_mask(width: u8, prefix: u8) -> u128 {
    let width_mask = host_mask(width);
    width_mask & !host_mask(width - prefix)
}
