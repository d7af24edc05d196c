// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ordered lists of permit/reject lines over address spaces.

use crate::range::IpRangeSet;
use crate::space::IpSpace;
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineAction {
    Permit,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AclIpSpaceLine {
    pub action: LineAction,
    pub space: IpSpace,
}

/// An address space defined by ordered lines. The first line whose space contains an address
/// decides; addresses matched by no line are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AclIpSpace {
    lines: Vec<AclIpSpaceLine>,
}

impl AclIpSpace {
    #[must_use]
    pub fn builder() -> AclIpSpaceBuilder {
        AclIpSpaceBuilder::default()
    }

    #[must_use]
    pub fn permitting(space: impl Into<IpSpace>) -> AclIpSpaceBuilder {
        Self::builder().then_permitting(space)
    }

    #[must_use]
    pub fn rejecting(space: impl Into<IpSpace>) -> AclIpSpaceBuilder {
        Self::builder().then_rejecting(space)
    }

    #[must_use]
    pub fn lines(&self) -> &[AclIpSpaceLine] {
        &self.lines
    }

    /// Action of the first line matching `addr`, if any.
    #[must_use]
    pub fn action_for(&self, addr: Ipv4Addr) -> Option<LineAction> {
        self.lines
            .iter()
            .find(|line| line.space.contains_ip(addr))
            .map(|line| line.action)
    }

    #[must_use]
    pub fn contains_ip(&self, addr: Ipv4Addr) -> bool {
        self.action_for(addr) == Some(LineAction::Permit)
    }

    #[must_use]
    pub fn to_range_set(&self) -> IpRangeSet {
        let mut decided = IpRangeSet::empty();
        let mut permitted = IpRangeSet::empty();
        // consecutive lines with the same action are merged at once
        for run in self.lines.chunk_by(|a, b| a.action == b.action) {
            let space = IpRangeSet::union_all(run.iter().map(|line| line.space.to_range_set()));
            if run.first().is_some_and(|line| line.action == LineAction::Permit) {
                permitted = permitted.union(&space.difference(&decided));
            }
            decided = decided.union(&space);
        }
        permitted
    }

    /// The space this ACL is the complement of, if it has the form `reject X, permit any`.
    pub(crate) fn complemented(&self) -> Option<&IpSpace> {
        match self.lines.as_slice() {
            [
                AclIpSpaceLine {
                    action: LineAction::Reject,
                    space,
                },
                AclIpSpaceLine {
                    action: LineAction::Permit,
                    space: IpSpace::Universe,
                },
            ] => Some(space),
            _ => None,
        }
    }
}

impl Display for AclIpSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "acl[")?;
        for (n, line) in self.lines.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            let sign = match line.action {
                LineAction::Permit => '+',
                LineAction::Reject => '-',
            };
            write!(f, "{sign}{}", line.space)?;
        }
        write!(f, "]")
    }
}

/// Accumulates ACL lines in order; [`AclIpSpaceBuilder::build`] simplifies the result.
#[derive(Debug, Clone, Default)]
pub struct AclIpSpaceBuilder {
    lines: Vec<AclIpSpaceLine>,
}

impl AclIpSpaceBuilder {
    #[must_use]
    pub fn then_action(mut self, action: LineAction, space: impl Into<IpSpace>) -> Self {
        self.lines.push(AclIpSpaceLine {
            action,
            space: space.into(),
        });
        self
    }

    #[must_use]
    pub fn then_permitting(self, space: impl Into<IpSpace>) -> Self {
        self.then_action(LineAction::Permit, space)
    }

    #[must_use]
    pub fn then_rejecting(self, space: impl Into<IpSpace>) -> Self {
        self.then_action(LineAction::Reject, space)
    }

    /// Build the space. Empty lines, lines shadowed by an earlier universe line, and trailing
    /// reject lines are dropped; a lone permit line collapses into its space.
    #[must_use]
    pub fn build(self) -> IpSpace {
        let mut lines = Vec::with_capacity(self.lines.len());
        for line in self.lines {
            if line.space == IpSpace::Empty {
                continue;
            }
            let terminal = line.space == IpSpace::Universe;
            lines.push(line);
            if terminal {
                break;
            }
        }
        while lines
            .last()
            .is_some_and(|line| line.action == LineAction::Reject)
        {
            lines.pop();
        }
        if lines.len() <= 1 {
            return lines.pop().map_or(IpSpace::Empty, |line| line.space);
        }
        IpSpace::Acl(Arc::new(AclIpSpace { lines }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpm::prefix::Prefix;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn pfx(s: &str) -> IpSpace {
        IpSpace::Prefix(Prefix::from(s))
    }

    #[test]
    fn test_first_match_wins() {
        let space = AclIpSpace::permitting(pfx("10.0.0.1/32"))
            .then_rejecting(pfx("10.0.0.0/24"))
            .then_permitting(pfx("10.0.0.0/8"))
            .build();
        let IpSpace::Acl(acl) = &space else {
            panic!("expected an ACL, got {space}");
        };
        assert_eq!(acl.lines().len(), 3);
        assert_eq!(acl.action_for(ip("10.0.0.1")), Some(LineAction::Permit));
        assert_eq!(acl.action_for(ip("10.0.0.2")), Some(LineAction::Reject));
        assert_eq!(acl.action_for(ip("11.0.0.0")), None);
        assert!(space.contains_ip(ip("10.0.0.1")));
        assert!(!space.contains_ip(ip("10.0.0.2")));
        assert!(space.contains_ip(ip("10.0.1.0")));
        assert!(space.contains_ip(ip("10.255.255.255")));
        assert!(!space.contains_ip(ip("11.0.0.0")));
        assert_eq!(space.to_string(), "acl[+10.0.0.1/32, -10.0.0.0/24, +10.0.0.0/8]");
        assert_eq!(space.to_range_set().len(), 1 + (1 << 24) - (1 << 8));
    }

    #[test]
    fn test_range_set_of_line_runs() {
        let space = AclIpSpace::rejecting(pfx("10.0.1.0/24"))
            .then_rejecting(pfx("10.0.3.0/24"))
            .then_permitting(pfx("10.0.0.0/22"))
            .then_permitting(pfx("10.0.8.0/24"))
            .then_rejecting(pfx("10.0.8.0/25"))
            .then_permitting(pfx("10.0.0.0/16"))
            .build();
        let ranges = space.to_range_set();
        assert!(ranges.contains(ip("10.0.0.1")));
        assert!(!ranges.contains(ip("10.0.1.1")));
        assert!(ranges.contains(ip("10.0.2.1")));
        assert!(!ranges.contains(ip("10.0.3.1")));
        // permitted by the earlier line of the run
        assert!(ranges.contains(ip("10.0.8.1")));
        assert!(ranges.contains(ip("10.0.200.1")));
        assert_eq!(ranges.len(), (1 << 16) - 2 * (1 << 8));
    }

    #[test]
    fn test_build_simplifies() {
        assert_eq!(AclIpSpace::builder().build(), IpSpace::Empty);
        assert_eq!(AclIpSpace::rejecting(pfx("10.0.0.0/8")).build(), IpSpace::Empty);
        assert_eq!(AclIpSpace::permitting(pfx("10.0.0.0/8")).build(), pfx("10.0.0.0/8"));
        assert_eq!(
            AclIpSpace::permitting(IpSpace::Empty)
                .then_permitting(pfx("10.0.0.0/8"))
                .then_rejecting(pfx("10.1.0.0/16"))
                .build(),
            pfx("10.0.0.0/8")
        );
        assert_eq!(
            AclIpSpace::permitting(IpSpace::Universe)
                .then_rejecting(pfx("10.0.0.0/8"))
                .build(),
            IpSpace::Universe
        );
        assert_eq!(
            AclIpSpace::rejecting(IpSpace::Universe)
                .then_permitting(pfx("10.0.0.0/8"))
                .build(),
            IpSpace::Empty
        );
    }
}
