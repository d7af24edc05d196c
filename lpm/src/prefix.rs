// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv4 network prefixes.

use ipnet::Ipv4Net;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display};
pub use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrefixError {
    #[error("Invalid Prefix: {0}")]
    Invalid(String),
    #[error("Mask length {0} is invalid")]
    InvalidLength(u8),
}

pub trait IpPrefixCovering<Other> {
    fn covers(&self, other: &Other) -> bool;
}

/// Network mask of the given length, as a host-order integer.
fn mask(len: u8) -> u32 {
    u32::MAX.unbounded_shl(u32::from(Prefix::MAX_LEN - len))
}

/// Value of bit `pos` of an address, counting from the most significant bit.
#[must_use]
pub fn ip_bit(addr: Ipv4Addr, pos: u8) -> bool {
    if pos >= Prefix::MAX_LEN {
        return false;
    }
    (addr.to_bits() >> (31 - u32::from(pos))) & 1 == 1
}

////////////////////////////////////////////////////////////
// IPv4 Prefix
////////////////////////////////////////////////////////////

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Prefix(Ipv4Net);

impl Prefix {
    pub const MAX_LEN: u8 = 32;

    pub const ROOT: Prefix = Prefix(match Ipv4Net::new(Ipv4Addr::new(0, 0, 0, 0), 0) {
        Ok(root) => root,
        Err(_) => {
            panic!("unreachable")
        }
    });

    /// Build a prefix from a network address and a length.
    ///
    /// # Errors
    ///
    /// Returns an error if the length is greater than [`Prefix::MAX_LEN`] or if
    /// the address has host bits set.
    pub fn new(addr_in: Ipv4Addr, len: u8) -> Result<Self, PrefixError> {
        if len > Self::MAX_LEN {
            return Err(PrefixError::InvalidLength(len));
        }
        let addr = Ipv4Addr::from_bits(addr_in.to_bits() & mask(len));
        if addr_in != addr {
            let err = format!(
                "{addr_in}/{len} has host bits set: address in binary is {:b}, {:b} would be correct",
                addr_in.to_bits(),
                addr.to_bits()
            );
            return Err(PrefixError::Invalid(err));
        }
        Ok(Self(
            Ipv4Net::new(addr, len).map_err(|e| PrefixError::Invalid(e.to_string()))?,
        ))
    }

    /// Build the prefix of the given length that contains `addr`, zeroing host bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the length is greater than [`Prefix::MAX_LEN`].
    pub fn containing(addr: Ipv4Addr, len: u8) -> Result<Self, PrefixError> {
        if len > Self::MAX_LEN {
            return Err(PrefixError::InvalidLength(len));
        }
        Self::new(Ipv4Addr::from_bits(addr.to_bits() & mask(len)), len)
    }

    /// The /32 prefix of a single address.
    #[must_use]
    pub fn host(addr: Ipv4Addr) -> Self {
        Self(Ipv4Net::new_assert(addr, Self::MAX_LEN))
    }

    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }

    #[must_use]
    pub fn last_address(&self) -> Ipv4Addr {
        self.0.broadcast()
    }

    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u8 {
        self.0.prefix_len()
    }

    /// Number of addresses covered by this prefix.
    #[must_use]
    pub fn size(&self) -> u64 {
        1u64 << (Self::MAX_LEN - self.len())
    }

    /// Value of the address bit at `pos`. Used to branch in the trie: the bit right after a
    /// node's prefix length tells whether a descendant goes left (0) or right (1).
    #[must_use]
    pub fn bit_at(&self, pos: u8) -> bool {
        ip_bit(self.network(), pos)
    }

    /// The longest prefix that covers both `self` and `other`.
    #[must_use]
    pub fn longest_common_prefix(&self, other: &Prefix) -> Prefix {
        let diff = self.network().to_bits() ^ other.network().to_bits();
        let common = u8::try_from(diff.leading_zeros()).unwrap_or(Self::MAX_LEN);
        let len = common.min(self.len()).min(other.len());
        let addr = Ipv4Addr::from_bits(self.network().to_bits() & mask(len));
        Prefix(Ipv4Net::new_assert(addr, len))
    }

    /// First usable host address. Network and broadcast addresses are excluded for
    /// prefixes shorter than /31.
    #[must_use]
    pub fn first_host_ip(&self) -> Ipv4Addr {
        if self.len() >= 31 {
            self.network()
        } else {
            Ipv4Addr::from_bits(self.network().to_bits() + 1)
        }
    }

    /// Last usable host address, see [`Prefix::first_host_ip`].
    #[must_use]
    pub fn last_host_ip(&self) -> Ipv4Addr {
        if self.len() >= 31 {
            self.last_address()
        } else {
            Ipv4Addr::from_bits(self.last_address().to_bits() - 1)
        }
    }

    /// Tell if prefix is a host
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.len() == Self::MAX_LEN
    }
}

impl Debug for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl Default for Prefix {
    fn default() -> Self {
        Prefix::ROOT
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl IpPrefixCovering<Ipv4Addr> for Prefix {
    fn covers(&self, other: &Ipv4Addr) -> bool {
        self.0.contains(other)
    }
}

impl IpPrefixCovering<Prefix> for Prefix {
    fn covers(&self, other: &Prefix) -> bool {
        self.0.contains(&other.0)
    }
}

impl From<Ipv4Addr> for Prefix {
    fn from(addr: Ipv4Addr) -> Self {
        Self::host(addr)
    }
}

impl From<Ipv4Net> for Prefix {
    /// Convert an [`Ipv4Net`] into a [`Prefix`].
    ///
    /// This conversion will zero any host bits set in the address as they make no sense in the
    /// context of a prefix.
    fn from(value: Ipv4Net) -> Self {
        Prefix(value.trunc())
    }
}

impl From<Prefix> for Ipv4Net {
    fn from(value: Prefix) -> Self {
        value.0
    }
}

impl FromStr for Prefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or(PrefixError::Invalid(s.to_string()))?;
        let addr = addr
            .parse::<Ipv4Addr>()
            .map_err(|_| PrefixError::Invalid(s.to_string()))?;
        let len = len
            .parse::<u8>()
            .map_err(|_| PrefixError::Invalid(s.to_string()))?;
        Self::new(addr, len)
    }
}

impl Serialize for Prefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Prefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Only for testing. Will panic with badly formatted prefix strings
#[cfg(any(test, feature = "testing"))]
impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|e| panic!("bad prefix {s}: {e}"))
    }
}

#[cfg(any(test, feature = "testing"))]
mod contract {
    use crate::prefix::Prefix;
    use bolero::{Driver, TypeGenerator};
    use std::net::Ipv4Addr;
    use std::ops::Bound;

    impl TypeGenerator for Prefix {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let addr = Ipv4Addr::from_bits(driver.produce()?);
            let len = driver.gen_u8(Bound::Included(&0), Bound::Included(&Prefix::MAX_LEN))?;
            Some(Prefix::containing(addr, len).unwrap_or_else(|_| unreachable!()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_from_str() {
        let prefix = "192.168.1.0/24".parse::<Prefix>().unwrap();
        assert_eq!(prefix.network(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(prefix.len(), 24);
        assert_eq!(prefix.to_string(), "192.168.1.0/24");

        assert!(matches!(
            "192.168.1.1/24".parse::<Prefix>(),
            Err(PrefixError::Invalid(_))
        ));
        assert_eq!(
            "192.168.1.0/33".parse::<Prefix>(),
            Err(PrefixError::InvalidLength(33))
        );
        assert!("192.168.1.0".parse::<Prefix>().is_err());
    }

    #[test]
    fn test_covers() {
        // IP Address is covered by prefix
        let prefix = Prefix::from("192.168.1.0/24");
        assert!(prefix.covers(&Ipv4Addr::new(192, 168, 1, 1)));
        assert!(!prefix.covers(&Ipv4Addr::new(192, 168, 2, 1)));

        // Prefix is covered by prefix
        assert!(prefix.covers(&prefix));
        assert!(prefix.covers(&Prefix::from("192.168.1.0/25")));
        assert!(!prefix.covers(&Prefix::from("192.168.4.0/23")));

        // Big prefix covers small prefix
        let big_prefix = Prefix::from("128.0.0.0/1");
        assert!(big_prefix.covers(&prefix));
        assert!(!prefix.covers(&big_prefix));

        // Prefixes with same length but different network are not covered
        let p1 = Prefix::from("192.168.1.0/24");
        let p2 = Prefix::from("192.168.2.0/24");
        assert!(!p1.covers(&p2));
        assert!(!p2.covers(&p1));
    }

    #[test]
    fn test_containing_zeroes_host_bits() {
        let p = Prefix::containing(Ipv4Addr::new(10, 1, 2, 3), 16).unwrap();
        assert_eq!(p, Prefix::from("10.1.0.0/16"));
        assert_eq!(
            Prefix::containing(Ipv4Addr::new(10, 1, 2, 3), 40),
            Err(PrefixError::InvalidLength(40))
        );
    }

    #[test]
    fn test_longest_common_prefix() {
        let a = Prefix::from("10.0.0.0/24");
        let b = Prefix::from("10.0.1.0/24");
        assert_eq!(a.longest_common_prefix(&b), Prefix::from("10.0.0.0/23"));
        let c = Prefix::from("10.0.0.0/8");
        assert_eq!(a.longest_common_prefix(&c), c);
        assert_eq!(a.longest_common_prefix(&a), a);
        let d = Prefix::from("192.168.0.0/16");
        assert_eq!(a.longest_common_prefix(&d), Prefix::ROOT);
    }

    #[test]
    fn test_bits() {
        let p = Prefix::from("128.0.0.0/1");
        assert!(p.bit_at(0));
        assert!(!p.bit_at(1));
        assert!(ip_bit(Ipv4Addr::new(0, 0, 0, 1), 31));
        assert!(!ip_bit(Ipv4Addr::new(255, 255, 255, 255), 32));
    }

    #[test]
    fn test_host_ips() {
        let p = Prefix::from("10.0.0.0/24");
        assert_eq!(p.first_host_ip(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(p.last_host_ip(), Ipv4Addr::new(10, 0, 0, 254));
        assert_eq!(p.size(), 256);
        let p31 = Prefix::from("10.0.1.0/31");
        assert_eq!(p31.first_host_ip(), Ipv4Addr::new(10, 0, 1, 0));
        assert_eq!(p31.last_host_ip(), Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(Prefix::ROOT.size(), 1u64 << 32);
        assert!(Prefix::host(Ipv4Addr::new(1, 2, 3, 4)).is_host());
    }

    #[test]
    fn test_serde_yaml() {
        let prefix = Prefix::from("172.16.0.0/12");
        let yaml = serde_yaml_ng::to_string(&prefix).unwrap();
        assert_eq!(yaml.trim(), "172.16.0.0/12");
        let back: Prefix = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(back, prefix);
        assert!(serde_yaml_ng::from_str::<Prefix>("172.16.0.1/12").is_err());
    }

    fn prefix_contract(prefix: &Prefix) {
        assert!(Prefix::ROOT.covers(prefix));
        let len = prefix.len();
        if len > 0 {
            assert!(!prefix.covers(&Prefix::ROOT));
        }
        assert_eq!(Prefix::new(prefix.network(), prefix.len()).unwrap(), *prefix);
        assert!(prefix.covers(&prefix.network()));
        assert!(prefix.covers(&prefix.last_address()));
        let host_prefix = (len..=Prefix::MAX_LEN)
            .map(|len| Prefix::new(prefix.network(), len).unwrap())
            .fold(*prefix, |parent, child| {
                assert!(parent.covers(&child));
                assert_eq!(parent.longest_common_prefix(&child), parent);
                if parent.len() < child.len() {
                    assert!(!child.covers(&parent));
                }
                child
            });
        assert_eq!(host_prefix.len(), Prefix::MAX_LEN);
        let root_prefix = (0..=len)
            .rev()
            .map(|len| Prefix::containing(prefix.network(), len).unwrap())
            .fold(*prefix, |child, parent| {
                assert!(parent.covers(&child));
                parent
            });
        assert_eq!(root_prefix, Prefix::ROOT);
    }

    #[test]
    fn ipv4_prefix_contract() {
        bolero::check!()
            .with_type::<Prefix>()
            .for_each(prefix_contract);
    }
}
