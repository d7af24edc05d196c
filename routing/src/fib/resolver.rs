// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Recursive resolution of RIB routes into FIB entries

use derive_builder::Builder;
use lpm::prefix::Prefix;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::net::Ipv4Addr;
use tracing::{debug, warn};

use crate::errors::RoutingError;
use crate::fib::fibobjects::{FibAction, FibEntry};
use crate::fib::fibtable::Fib;
use crate::rib::Rib;
use crate::rib::route::{NextHop, Route, RouteProtocol};
use crate::vni::Vni;

/// Default bound on the number of recursive lookups done to resolve a route.
pub const MAX_DEPTH: usize = 10;

/// A predicate restricting which routes may resolve a next-hop address.
pub trait ResolutionRestriction: Sync {
    fn admits(&self, route: &Route) -> bool;
}

impl<F> ResolutionRestriction for F
where
    F: Fn(&Route) -> bool + Sync,
{
    fn admits(&self, route: &Route) -> bool {
        self(route)
    }
}

/// Let any route resolve next-hops.
#[must_use]
pub fn any_route(_route: &Route) -> bool {
    true
}

/// Do not let next-hops resolve via a default route.
#[must_use]
pub fn no_default_route(route: &Route) -> bool {
    route.network.len() > 0
}

/// Parameters of FIB computation.
#[derive(Builder, Clone, Debug, PartialEq, Eq)]
pub struct FibParams {
    /// Deepest recursion allowed when resolving next-hop addresses.
    #[builder(default = MAX_DEPTH)]
    pub max_depth: usize,

    /// Build the FIBs of distinct nodes in parallel.
    #[builder(default = true)]
    pub parallel: bool,
}

impl Default for FibParams {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            parallel: true,
        }
    }
}

impl Display for FibParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(f, "Fib params")?;
        writeln!(f, "  max depth : {}", self.max_depth)?;
        writeln!(f, "  parallel  : {}", self.parallel)
    }
}

/// A non-fatal problem found while resolving a route. The affected branch gets no FIB entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolutionWarning {
    /// Resolving `network` needed more than `depth` recursive lookups.
    MaxDepthExceeded {
        network: Prefix,
        next_hop_ip: Ipv4Addr,
        depth: usize,
    },
    /// No admissible route, or only a route already on the resolution path, matches the next-hop.
    Unresolvable {
        network: Prefix,
        next_hop_ip: Ipv4Addr,
    },
}

impl ResolutionWarning {
    #[must_use]
    pub fn network(&self) -> Prefix {
        match self {
            ResolutionWarning::MaxDepthExceeded { network, .. }
            | ResolutionWarning::Unresolvable { network, .. } => *network,
        }
    }
}

impl Display for ResolutionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionWarning::MaxDepthExceeded {
                network,
                next_hop_ip,
                depth,
            } => write!(
                f,
                "resolution of {network} exceeds max depth {depth} at next-hop {next_hop_ip}"
            ),
            ResolutionWarning::Unresolvable {
                network,
                next_hop_ip,
            } => write!(f, "next-hop {next_hop_ip} of {network} is unresolvable"),
        }
    }
}

/// The outcome of a FIB build: the table plus what was left out of it.
#[derive(Debug, Clone, Default)]
pub struct FibBuild {
    pub fib: Fib,
    pub warnings: Vec<ResolutionWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Pending,
    Unresolvable,
    Truncated,
}

#[derive(Debug)]
struct ResolutionNode<'r> {
    route: &'r Route,
    /// Address to ARP for; only meaningful on interface leaves.
    final_next_hop_ip: Option<Ipv4Addr>,
    children: Vec<usize>,
    state: NodeState,
}

/// Resolution tree of one route, as an arena. Node 0 is the root.
#[derive(Debug)]
struct ResolutionTree<'r> {
    nodes: Vec<ResolutionNode<'r>>,
}

impl<'r> ResolutionTree<'r> {
    fn new(route: &'r Route) -> Self {
        let mut tree = Self { nodes: vec![] };
        tree.push(route);
        tree
    }

    fn push(&mut self, route: &'r Route) -> usize {
        self.nodes.push(ResolutionNode {
            route,
            final_next_hop_ip: None,
            children: vec![],
            state: NodeState::Pending,
        });
        self.nodes.len() - 1
    }

    fn add_child(&mut self, parent: usize, route: &'r Route) -> usize {
        let child = self.push(route);
        self.nodes[parent].children.push(child);
        child
    }

    //////////////////////////////////////////////////////////////////////
    /// Collect one [`FibEntry`] per resolved leaf below `idx`. `path` holds
    /// the routes from the root down to the parent of `idx`.
    //////////////////////////////////////////////////////////////////////
    fn collect_entries(
        &self,
        idx: usize,
        path: &mut Vec<Route>,
        entries: &mut BTreeSet<FibEntry>,
    ) -> Result<(), RoutingError> {
        let node = &self.nodes[idx];
        if !node.children.is_empty() {
            path.push(node.route.clone());
            for child in &node.children {
                self.collect_entries(*child, path, entries)?;
            }
            path.pop();
            return Ok(());
        }
        if node.state != NodeState::Pending {
            return Ok(());
        }
        let action = match &node.route.next_hop {
            NextHop::Interface { name, .. } => FibAction::Forward {
                next_hop_ip: node.final_next_hop_ip,
                interface: name.clone(),
            },
            NextHop::Discard => FibAction::NullRoute,
            NextHop::Vrf { name, ip } => FibAction::NextVrf {
                vrf: name.clone(),
                ip: *ip,
            },
            NextHop::Vtep { vni, ip } => FibAction::Forward {
                next_hop_ip: Some(*ip),
                interface: vtep_interface_name(*vni),
            },
            NextHop::Ip(_) => {
                return Err(RoutingError::NonTerminalLeaf {
                    network: node.route.network,
                });
            }
        };
        entries.insert(FibEntry::new(action, path.clone()));
        Ok(())
    }
}

const VTEP_INTERFACE_PREFIX: &str = "vtep-";

/// Name of the interface that VXLAN-encapsulated traffic leaves through.
#[must_use]
pub fn vtep_interface_name(vni: Vni) -> String {
    format!("{VTEP_INTERFACE_PREFIX}{vni}")
}

/// Tell if `interface` is one synthesized by [`vtep_interface_name`].
#[must_use]
pub fn is_vtep_interface(interface: &str) -> bool {
    interface
        .strip_prefix(VTEP_INTERFACE_PREFIX)
        .is_some_and(|vni| vni.parse::<u32>().is_ok())
}

struct Resolver<'a, R: ResolutionRestriction + ?Sized> {
    rib: &'a Rib,
    restriction: &'a R,
    params: &'a FibParams,
    warnings: Vec<ResolutionWarning>,
}

impl<'a, R: ResolutionRestriction + ?Sized> Resolver<'a, R> {
    /// Non-recursive static routes resolve only via connected routes. Everything else obeys the
    /// restriction.
    fn admissible(&self, resolving: &Route, candidate: &Route) -> bool {
        if resolving.is_non_recursive_static() {
            candidate.protocol == RouteProtocol::Connected
        } else {
            self.restriction.admits(candidate)
        }
    }

    //////////////////////////////////////////////////////////////////////
    /// Resolve node `idx` of the tree of the route for `network`, given the
    /// networks already on the path and the last next-hop address looked up.
    //////////////////////////////////////////////////////////////////////
    fn resolve(
        &mut self,
        network: Prefix,
        tree: &mut ResolutionTree<'a>,
        idx: usize,
        visited: &mut BTreeSet<Prefix>,
        depth: usize,
        last_next_hop_ip: Option<Ipv4Addr>,
    ) -> Result<(), RoutingError> {
        let route = tree.nodes[idx].route;
        if !visited.insert(route.network) {
            return Err(RoutingError::ResolutionLoop {
                network: route.network,
            });
        }
        match &route.next_hop {
            NextHop::Interface { ip, .. } => {
                tree.nodes[idx].final_next_hop_ip = ip.or(last_next_hop_ip);
            }
            NextHop::Discard | NextHop::Vrf { .. } | NextHop::Vtep { .. } => {}
            NextHop::Ip(next_hop_ip) => {
                let next_hop_ip = *next_hop_ip;
                if depth >= self.params.max_depth {
                    tree.nodes[idx].state = NodeState::Truncated;
                    self.warn(ResolutionWarning::MaxDepthExceeded {
                        network,
                        next_hop_ip,
                        depth: self.params.max_depth,
                    });
                } else {
                    let rib = self.rib;
                    let candidates = rib.longest_prefix_match(next_hop_ip, Prefix::MAX_LEN, |c| {
                        self.admissible(route, c)
                    });
                    match candidates {
                        Some((matched, routes)) if !visited.contains(&matched) => {
                            for candidate in routes {
                                let child = tree.add_child(idx, candidate);
                                self.resolve(
                                    network,
                                    tree,
                                    child,
                                    visited,
                                    depth + 1,
                                    Some(next_hop_ip),
                                )?;
                            }
                        }
                        _ => {
                            tree.nodes[idx].state = NodeState::Unresolvable;
                            self.warn(ResolutionWarning::Unresolvable {
                                network,
                                next_hop_ip,
                            });
                        }
                    }
                }
            }
        }
        visited.remove(&route.network);
        Ok(())
    }

    fn warn(&mut self, warning: ResolutionWarning) {
        if !self.warnings.contains(&warning) {
            warn!("{warning}");
            self.warnings.push(warning);
        }
    }

    fn entries_for(&mut self, route: &'a Route) -> Result<BTreeSet<FibEntry>, RoutingError> {
        let mut tree = ResolutionTree::new(route);
        let mut visited = BTreeSet::new();
        self.resolve(route.network, &mut tree, 0, &mut visited, 0, None)?;
        let mut entries = BTreeSet::new();
        tree.collect_entries(0, &mut Vec::new(), &mut entries)?;
        Ok(entries)
    }
}

/// Build the FIB of a RIB.
///
/// Every forwarding route is resolved recursively down to interface, discard, VRF or VTEP
/// next-hops. Next-hop addresses are looked up in the same RIB among the routes admitted by
/// `restriction`; several matching routes fan out into several entries.
///
/// # Errors
///
/// Fails if resolution breaks one of its own invariants. Routing loops and unresolvable
/// next-hops are not errors: they are reported in [`FibBuild::warnings`].
pub fn build_fib<R>(
    rib: &Rib,
    restriction: &R,
    params: &FibParams,
) -> Result<FibBuild, RoutingError>
where
    R: ResolutionRestriction + ?Sized,
{
    let mut resolver = Resolver {
        rib,
        restriction,
        params,
        warnings: vec![],
    };
    let mut fib = Fib::new();
    for (network, route) in rib.routes() {
        if route.non_forwarding {
            continue;
        }
        let entries = resolver.entries_for(route)?;
        fib.insert(network, entries);
    }
    debug!(
        "Built fib with {} entries from {} routes ({} warnings)",
        fib.len(),
        rib.num_routes(),
        resolver.warnings.len()
    );
    Ok(FibBuild {
        fib,
        warnings: resolver.warnings,
    })
}
