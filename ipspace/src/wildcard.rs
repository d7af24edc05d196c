// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Wildcard address matchers and wildcard-set address spaces.

use crate::range::IpRangeSet;
use lpm::prefix::{Prefix, PrefixError};
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IpSpaceError {
    #[error("Invalid wildcard: {0}")]
    InvalidWildcard(String),
    #[error(transparent)]
    Prefix(#[from] PrefixError),
}

/// An address and a wildcard mask. Bits set in the mask are "don't care" bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IpWildcard {
    ip: Ipv4Addr,
    wildcard: u32,
}

impl IpWildcard {
    /// Build a wildcard, clearing address bits covered by the mask.
    #[must_use]
    pub fn new(ip: Ipv4Addr, wildcard: u32) -> Self {
        Self {
            ip: Ipv4Addr::from_bits(ip.to_bits() & !wildcard),
            wildcard,
        }
    }

    #[must_use]
    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    #[must_use]
    pub fn wildcard(&self) -> u32 {
        self.wildcard
    }

    #[must_use]
    pub fn contains_ip(&self, addr: Ipv4Addr) -> bool {
        addr.to_bits() & !self.wildcard == self.ip.to_bits()
    }

    /// The equivalent prefix, if the wildcard mask is contiguous.
    #[must_use]
    pub fn to_prefix(&self) -> Option<Prefix> {
        let host_bits = self.wildcard.trailing_ones();
        if self.wildcard.checked_shr(host_bits).unwrap_or(0) != 0 {
            return None;
        }
        let len = u8::try_from(32 - host_bits).ok()?;
        Prefix::new(self.ip, len).ok()
    }

    /// Exact address set. Non-contiguous masks expand into one range per combination of the
    /// "don't care" bits above the lowest fixed bit.
    #[must_use]
    pub fn to_range_set(&self) -> IpRangeSet {
        if let Some(prefix) = self.to_prefix() {
            return IpRangeSet::from_prefix(&prefix);
        }
        let host_bits = self.wildcard.trailing_ones();
        let block = self.wildcard & u32::MAX.unbounded_shr(32 - host_bits);
        let spread = self.wildcard & !block;
        // enumerate the subsets of `spread`
        let mut ranges = Vec::new();
        let mut subset: u32 = 0;
        loop {
            let start = self.ip.to_bits() | subset;
            ranges.push((start, start | block));
            subset = subset.wrapping_sub(spread) & spread;
            if subset == 0 {
                break;
            }
        }
        IpRangeSet::from_unsorted(ranges)
    }
}

impl From<Prefix> for IpWildcard {
    fn from(prefix: Prefix) -> Self {
        Self::new(
            prefix.network(),
            u32::MAX.unbounded_shr(u32::from(prefix.len())),
        )
    }
}

impl From<Ipv4Addr> for IpWildcard {
    fn from(addr: Ipv4Addr) -> Self {
        Self::new(addr, 0)
    }
}

impl Display for IpWildcard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_prefix() {
            Some(prefix) => write!(f, "{prefix}"),
            None => write!(f, "{}:{}", self.ip, Ipv4Addr::from_bits(self.wildcard)),
        }
    }
}

impl FromStr for IpWildcard {
    type Err = IpSpaceError;

    /// Accepts `a.b.c.d`, `a.b.c.d/len` and `a.b.c.d:w.x.y.z` (address and wildcard mask).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('/') {
            return Ok(s.parse::<Prefix>()?.into());
        }
        let (ip, wildcard) = s.split_once(':').unwrap_or((s, "0.0.0.0"));
        let ip = ip
            .parse::<Ipv4Addr>()
            .map_err(|_| IpSpaceError::InvalidWildcard(s.to_string()))?;
        let wildcard = wildcard
            .parse::<Ipv4Addr>()
            .map_err(|_| IpSpaceError::InvalidWildcard(s.to_string()))?;
        Ok(Self::new(ip, wildcard.to_bits()))
    }
}

/// Addresses matched by any whitelisted wildcard and by no blacklisted one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IpWildcardSetIpSpace {
    whitelist: Vec<IpWildcard>,
    blacklist: Vec<IpWildcard>,
}

impl IpWildcardSetIpSpace {
    #[must_use]
    pub fn new(whitelist: Vec<IpWildcard>, blacklist: Vec<IpWildcard>) -> Self {
        Self {
            whitelist,
            blacklist,
        }
    }

    #[must_use]
    pub fn whitelist(&self) -> &[IpWildcard] {
        &self.whitelist
    }

    #[must_use]
    pub fn blacklist(&self) -> &[IpWildcard] {
        &self.blacklist
    }

    #[must_use]
    pub fn contains_ip(&self, addr: Ipv4Addr) -> bool {
        self.whitelist.iter().any(|w| w.contains_ip(addr))
            && !self.blacklist.iter().any(|w| w.contains_ip(addr))
    }

    #[must_use]
    pub fn to_range_set(&self) -> IpRangeSet {
        let union = |wildcards: &[IpWildcard]| {
            IpRangeSet::union_all(wildcards.iter().map(IpWildcard::to_range_set))
        };
        union(&self.whitelist).difference(&union(&self.blacklist))
    }
}

impl Display for IpWildcardSetIpSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let list = |l: &[IpWildcard]| {
            l.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "[{}]", list(&self.whitelist))?;
        if !self.blacklist.is_empty() {
            write!(f, " except [{}]", list(&self.blacklist))?;
        }
        Ok(())
    }
}
