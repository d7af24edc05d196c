// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::acl::{AclIpSpace, AclIpSpaceBuilder};
use crate::range::IpRangeSet;
use crate::wildcard::IpWildcardSetIpSpace;
use lpm::prefix::{IpPrefixCovering, Prefix};
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// A set of IPv4 addresses.
///
/// Set operations build new spaces symbolically; they never enumerate addresses. Use
/// [`IpSpace::to_range_set`] (or [`IpSpace::is_empty`] / [`IpSpace::equivalent`]) for exact
/// answers. Derived equality is structural: two spaces with the same addresses may differ.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum IpSpace {
    #[default]
    Empty,
    Universe,
    Prefix(Prefix),
    WildcardSet(IpWildcardSetIpSpace),
    Acl(Arc<AclIpSpace>),
}

impl IpSpace {
    /// The space of a single address.
    #[must_use]
    pub fn host(addr: Ipv4Addr) -> Self {
        IpSpace::Prefix(Prefix::host(addr))
    }

    /// Usable host addresses of a subnet: network and broadcast addresses are left out for
    /// prefixes shorter than /31.
    #[must_use]
    pub fn subnet_hosts(prefix: &Prefix) -> Self {
        if prefix.len() >= 31 {
            return IpSpace::Prefix(*prefix);
        }
        AclIpSpace::rejecting(IpSpace::host(prefix.network()))
            .then_rejecting(IpSpace::host(prefix.last_address()))
            .then_permitting(*prefix)
            .build()
    }

    #[must_use]
    pub fn contains_ip(&self, addr: Ipv4Addr) -> bool {
        match self {
            IpSpace::Empty => false,
            IpSpace::Universe => true,
            IpSpace::Prefix(prefix) => prefix.covers(&addr),
            IpSpace::WildcardSet(set) => set.contains_ip(addr),
            IpSpace::Acl(acl) => acl.contains_ip(addr),
        }
    }

    #[must_use]
    pub fn union(&self, other: &IpSpace) -> IpSpace {
        Self::union_all([self.clone(), other.clone()])
    }

    /// Union of any number of spaces.
    pub fn union_all(spaces: impl IntoIterator<Item = IpSpace>) -> IpSpace {
        let mut members: Vec<IpSpace> = Vec::new();
        for space in spaces {
            match space {
                IpSpace::Empty => {}
                IpSpace::Universe => return IpSpace::Universe,
                space if !members.contains(&space) => members.push(space),
                _ => {}
            }
        }
        members
            .into_iter()
            .fold(AclIpSpaceBuilder::default(), |builder, space| {
                builder.then_permitting(space)
            })
            .build()
    }

    #[must_use]
    pub fn intersection(&self, other: &IpSpace) -> IpSpace {
        match (self, other) {
            (IpSpace::Empty, _) | (_, IpSpace::Empty) => IpSpace::Empty,
            (IpSpace::Universe, space) | (space, IpSpace::Universe) => space.clone(),
            (a, b) if a == b => a.clone(),
            (IpSpace::Prefix(a), IpSpace::Prefix(b)) => {
                if a.covers(b) {
                    IpSpace::Prefix(*b)
                } else if b.covers(a) {
                    IpSpace::Prefix(*a)
                } else {
                    IpSpace::Empty
                }
            }
            (a, b) => a.difference(&b.complement()),
        }
    }

    /// Intersection of any number of spaces. The intersection of no spaces is the universe.
    pub fn intersection_all(spaces: impl IntoIterator<Item = IpSpace>) -> IpSpace {
        spaces
            .into_iter()
            .fold(IpSpace::Universe, |acc, space| acc.intersection(&space))
    }

    /// Addresses in `self` and not in `other`.
    #[must_use]
    pub fn difference(&self, other: &IpSpace) -> IpSpace {
        match (self, other) {
            (IpSpace::Empty, _) | (_, IpSpace::Universe) => IpSpace::Empty,
            (space, IpSpace::Empty) => space.clone(),
            (a, b) if a == b => IpSpace::Empty,
            (IpSpace::Prefix(a), IpSpace::Prefix(b)) if !a.covers(b) && !b.covers(a) => {
                IpSpace::Prefix(*a)
            }
            (a, b) => AclIpSpace::rejecting(b.clone())
                .then_permitting(a.clone())
                .build(),
        }
    }

    #[must_use]
    pub fn complement(&self) -> IpSpace {
        match self {
            IpSpace::Empty => IpSpace::Universe,
            IpSpace::Universe => IpSpace::Empty,
            IpSpace::Acl(acl) => match acl.complemented() {
                Some(space) => space.clone(),
                None => IpSpace::Universe.difference(self),
            },
            space => IpSpace::Universe.difference(space),
        }
    }

    /// Exact normalisation into address ranges.
    #[must_use]
    pub fn to_range_set(&self) -> IpRangeSet {
        match self {
            IpSpace::Empty => IpRangeSet::empty(),
            IpSpace::Universe => IpRangeSet::universe(),
            IpSpace::Prefix(prefix) => IpRangeSet::from_prefix(prefix),
            IpSpace::WildcardSet(set) => set.to_range_set(),
            IpSpace::Acl(acl) => acl.to_range_set(),
        }
    }

    /// Whether no address belongs to this space.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            IpSpace::Empty => true,
            IpSpace::Universe | IpSpace::Prefix(_) => false,
            space => space.to_range_set().is_empty(),
        }
    }

    /// Whether both spaces hold exactly the same addresses.
    #[must_use]
    pub fn equivalent(&self, other: &IpSpace) -> bool {
        self == other || self.to_range_set() == other.to_range_set()
    }
}

impl From<Prefix> for IpSpace {
    fn from(prefix: Prefix) -> Self {
        IpSpace::Prefix(prefix)
    }
}

impl From<Ipv4Addr> for IpSpace {
    fn from(addr: Ipv4Addr) -> Self {
        IpSpace::host(addr)
    }
}

impl From<IpWildcardSetIpSpace> for IpSpace {
    fn from(set: IpWildcardSetIpSpace) -> Self {
        IpSpace::WildcardSet(set)
    }
}

impl From<AclIpSpace> for IpSpace {
    fn from(acl: AclIpSpace) -> Self {
        IpSpace::Acl(Arc::new(acl))
    }
}

impl Display for IpSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpSpace::Empty => write!(f, "none"),
            IpSpace::Universe => write!(f, "any"),
            IpSpace::Prefix(prefix) => write!(f, "{prefix}"),
            IpSpace::WildcardSet(set) => write!(f, "{set}"),
            IpSpace::Acl(acl) => write!(f, "{acl}"),
        }
    }
}
