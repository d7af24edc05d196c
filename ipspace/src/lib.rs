// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Symbolic sets of IPv4 addresses.
//!
//! An [`IpSpace`] is a boolean predicate over addresses, closed under union, intersection,
//! difference and complement. Spaces stay symbolic (prefixes, wildcards, ordered ACLs) and can
//! be normalised into an [`IpRangeSet`] when an exact answer is needed.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod acl;
mod range;
mod space;
mod wildcard;

pub use acl::{AclIpSpace, AclIpSpaceBuilder, AclIpSpaceLine, LineAction};
pub use range::IpRangeSet;
pub use space::IpSpace;
pub use wildcard::{IpSpaceError, IpWildcard, IpWildcardSetIpSpace};
