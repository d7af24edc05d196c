// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Exact representation of address sets as sorted, disjoint, inclusive ranges.

use lpm::prefix::Prefix;
use std::fmt::Display;
use std::net::Ipv4Addr;

/// A set of IPv4 addresses stored as sorted, non-overlapping, non-adjacent inclusive ranges.
///
/// Two sets are equal if and only if they contain the same addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IpRangeSet {
    ranges: Vec<(u32, u32)>,
}

impl IpRangeSet {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn universe() -> Self {
        Self {
            ranges: vec![(0, u32::MAX)],
        }
    }

    /// The inclusive range `[start, end]`. Empty if `start > end`.
    #[must_use]
    pub fn from_range(start: Ipv4Addr, end: Ipv4Addr) -> Self {
        let (start, end) = (start.to_bits(), end.to_bits());
        if start > end {
            return Self::empty();
        }
        Self {
            ranges: vec![(start, end)],
        }
    }

    #[must_use]
    pub fn from_prefix(prefix: &Prefix) -> Self {
        Self::from_range(prefix.network(), prefix.last_address())
    }

    /// Build a set from arbitrary, possibly overlapping, ranges.
    pub(crate) fn from_unsorted(mut ranges: Vec<(u32, u32)>) -> Self {
        ranges.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some((_, last_end)) if u64::from(start) <= u64::from(*last_end) + 1 => {
                    *last_end = (*last_end).max(end);
                }
                _ => merged.push((start, end)),
            }
        }
        Self { ranges: merged }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of addresses in the set.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|(start, end)| u64::from(*end) - u64::from(*start) + 1)
            .sum()
    }

    #[must_use]
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let addr = addr.to_bits();
        let idx = self.ranges.partition_point(|(_, end)| *end < addr);
        self.ranges
            .get(idx)
            .is_some_and(|(start, _)| *start <= addr)
    }

    /// The ranges of the set, as inclusive address pairs.
    pub fn ranges(&self) -> impl Iterator<Item = (Ipv4Addr, Ipv4Addr)> + '_ {
        self.ranges
            .iter()
            .map(|(start, end)| (Ipv4Addr::from_bits(*start), Ipv4Addr::from_bits(*end)))
    }

    #[must_use]
    pub fn union(&self, other: &IpRangeSet) -> IpRangeSet {
        let mut ranges = self.ranges.clone();
        ranges.extend_from_slice(&other.ranges);
        Self::from_unsorted(ranges)
    }

    /// Union of any number of sets, merged in one pass.
    #[must_use]
    pub fn union_all(sets: impl IntoIterator<Item = IpRangeSet>) -> IpRangeSet {
        Self::from_unsorted(sets.into_iter().flat_map(|set| set.ranges).collect())
    }

    /// Whether every address of `self` is in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &IpRangeSet) -> bool {
        self.ranges.iter().all(|(start, end)| {
            let idx = other.ranges.partition_point(|(_, other_end)| other_end < start);
            other
                .ranges
                .get(idx)
                .is_some_and(|(other_start, other_end)| other_start <= start && end <= other_end)
        })
    }

    #[must_use]
    pub fn complement(&self) -> IpRangeSet {
        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        let mut next: u64 = 0;
        for (start, end) in &self.ranges {
            if u64::from(*start) > next {
                ranges.push((Self::narrow(next), *start - 1));
            }
            next = u64::from(*end) + 1;
        }
        if next <= u64::from(u32::MAX) {
            ranges.push((Self::narrow(next), u32::MAX));
        }
        Self { ranges }
    }

    #[must_use]
    pub fn intersection(&self, other: &IpRangeSet) -> IpRangeSet {
        let mut ranges = Vec::new();
        let (mut i, mut j) = (0, 0);
        while let (Some(a), Some(b)) = (self.ranges.get(i), other.ranges.get(j)) {
            let start = a.0.max(b.0);
            let end = a.1.min(b.1);
            if start <= end {
                ranges.push((start, end));
            }
            if a.1 < b.1 {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { ranges }
    }

    #[must_use]
    pub fn difference(&self, other: &IpRangeSet) -> IpRangeSet {
        self.intersection(&other.complement())
    }

    /// Decompose the set into the minimal list of CIDR prefixes that cover it exactly.
    #[must_use]
    pub fn prefixes(&self) -> Vec<Prefix> {
        let mut prefixes = Vec::new();
        for (start, end) in &self.ranges {
            let mut current = u64::from(*start);
            let end = u64::from(*end);
            while current <= end {
                // largest aligned block starting at `current` that does not overrun `end`
                let mut size_log = if current == 0 {
                    32
                } else {
                    current.trailing_zeros().min(32)
                };
                while current + (1u64 << size_log) - 1 > end {
                    size_log -= 1;
                }
                let len = u8::try_from(32 - size_log).unwrap_or(Prefix::MAX_LEN);
                let addr = Ipv4Addr::from_bits(Self::narrow(current));
                if let Ok(prefix) = Prefix::new(addr, len) {
                    prefixes.push(prefix);
                }
                current += 1u64 << size_log;
            }
        }
        prefixes
    }

    /// Callers guarantee `value` fits in 32 bits.
    fn narrow(value: u64) -> u32 {
        u32::try_from(value).unwrap_or(u32::MAX)
    }
}

impl Display for IpRangeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ranges.is_empty() {
            return write!(f, "{{}}");
        }
        let mut first = true;
        for prefix in self.prefixes() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{prefix}")?;
            first = false;
        }
        Ok(())
    }
}
