// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! RIB state

pub mod route;

use ipspace::IpSpace;
use lpm::prefix::Prefix;
use lpm::trie::PrefixTrieMultiMap;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

pub use route::{NextHop, Route, RouteBuilder, RouteProtocol};

/// The frozen routing table of one VRF.
///
/// Besides the routes, a RIB precomputes for each of its networks the addresses it matches: the
/// network minus any more specific network present in the same RIB.
#[derive(Debug, Clone, Default)]
pub struct Rib {
    routes: PrefixTrieMultiMap<Route>,
    matching_ips: BTreeMap<Prefix, IpSpace>,
    routable_ips: IpSpace,
}

impl Rib {
    #[must_use]
    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        let mut trie = PrefixTrieMultiMap::new();
        for route in routes {
            trie.put(route.network, route);
        }
        let mut matching_ips = BTreeMap::new();
        let routable_ips = trie.fold(|prefix, routes, left, right| {
            let below = IpSpace::union_all(left.into_iter().chain(right));
            if routes.is_empty() {
                below
            } else {
                matching_ips.insert(prefix, IpSpace::from(prefix).difference(&below));
                IpSpace::from(prefix)
            }
        });
        Self {
            routes: trie,
            matching_ips,
            routable_ips,
        }
    }

    /// Every route, ordered by network (more specific first within a branch).
    pub fn routes(&self) -> impl Iterator<Item = (Prefix, &Route)> {
        self.routes
            .entries()
            .into_iter()
            .flat_map(|(prefix, routes)| routes.iter().map(move |route| (prefix, route)))
    }

    /// The routes for exactly `network`.
    #[must_use]
    pub fn routes_for(&self, network: &Prefix) -> Option<&BTreeSet<Route>> {
        self.routes.get(network)
    }

    #[must_use]
    pub fn num_routes(&self) -> usize {
        self.routes.num_elements()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Per network, the addresses for which a lookup lands on that network.
    #[must_use]
    pub fn matching_ips(&self) -> &BTreeMap<Prefix, IpSpace> {
        &self.matching_ips
    }

    /// The addresses matched by some route.
    #[must_use]
    pub fn routable_ips(&self) -> &IpSpace {
        &self.routable_ips
    }

    /// Longest prefix match of `addr` among the routes accepted by `admissible`.
    ///
    /// Returns the matched network and its admissible routes.
    pub fn longest_prefix_match<F>(
        &self,
        addr: Ipv4Addr,
        max_len: u8,
        admissible: F,
    ) -> Option<(Prefix, Vec<&Route>)>
    where
        F: Fn(&Route) -> bool,
    {
        self.routes
            .longest_prefix_match_filtered(addr, max_len, admissible)
    }
}

impl FromIterator<Route> for Rib {
    fn from_iter<I: IntoIterator<Item = Route>>(routes: I) -> Self {
        Rib::from_routes(routes)
    }
}
