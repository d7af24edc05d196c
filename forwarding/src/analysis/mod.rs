// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Forwarding analysis of a snapshot.
//!
//! Starting from the FIBs, RIBs, configurations and topology of a network, the analysis computes
//! for every interface the destinations it forwards, which of them some neighbor answers ARP
//! for, and what happens to the rest. Every map is computed eagerly, in dependency order, and
//! never changes afterwards. Nodes are independent within a stage and are analysed in parallel.

mod arp;
mod disposition;
mod params;
mod routes;

pub use disposition::Disposition;
pub use params::{AnalysisParams, AnalysisParamsBuilder, AnalysisParamsBuilderError};

use concurrency::map_keyed;
use config::Configuration;
use ipspace::IpSpace;
use routing::{FibTables, RibTables};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use tracing::{debug, info};

use crate::errors::ForwardingError;
use crate::owners::IpOwners;
use crate::topology::{Edge, NodeInterfacePair, Topology};
use arp::{InterfaceArp, interface_arp_replies, someone_replies};
use disposition::ArpFailure;
use routes::{FibNetworks, RibView};

use tracectl::trace_target;
trace_target!("forwarding-analysis", LevelFilter::INFO, &["forwarding"]);

/// Spaces by interface name.
pub type InterfaceSpaces = BTreeMap<String, IpSpace>;
/// Spaces by node, then VRF.
pub type NodeVrfSpaces = BTreeMap<String, BTreeMap<String, IpSpace>>;
/// Spaces by node, then interface.
pub type NodeInterfaceSpaces = BTreeMap<String, InterfaceSpaces>;
/// Spaces by node, then VRF, then interface.
pub type NodeVrfInterfaceSpaces = BTreeMap<String, BTreeMap<String, InterfaceSpaces>>;
/// Spaces by directed edge.
pub type EdgeSpaces = BTreeMap<Edge, IpSpace>;

static NO_SPACE: IpSpace = IpSpace::Empty;

fn lookup3<'a>(
    spaces: &'a NodeVrfInterfaceSpaces,
    node: &str,
    vrf: &str,
    interface: &str,
) -> &'a IpSpace {
    spaces
        .get(node)
        .and_then(|vrfs| vrfs.get(vrf))
        .and_then(|ifaces| ifaces.get(interface))
        .unwrap_or(&NO_SPACE)
}

/// The routes of one VRF, as seen by the analysis.
#[derive(Debug, Default)]
struct VrfRoutes {
    networks: FibNetworks,
    routable: IpSpace,
    null_routed: IpSpace,
    next_vrf: BTreeMap<String, IpSpace>,
    routed_out: InterfaceSpaces,
}

#[derive(Debug, Default)]
struct NodeRoutes {
    vrfs: BTreeMap<String, VrfRoutes>,
    /// By VRF, then interface.
    arp_replies: BTreeMap<String, InterfaceSpaces>,
}

/// The outcome of the analysis of one interface.
#[derive(Debug, Default)]
struct InterfaceOutcome {
    arp_false_dest_ip: IpSpace,
    arp_false_next_hop_ip: IpSpace,
    arp_false: IpSpace,
    neighbor_unreachable: IpSpace,
    delivered_to_subnet: IpSpace,
    exits_network: IpSpace,
    insufficient_info: IpSpace,
}

#[derive(Debug, Default)]
struct NodeOutcome {
    interfaces: BTreeMap<String, BTreeMap<String, InterfaceOutcome>>,
    arp_true_edge_dest_ip: EdgeSpaces,
    arp_true_edge_next_hop_ip: EdgeSpaces,
}

/// Everything the analysis reads, shared by the workers.
struct Inputs<'a> {
    configurations: &'a BTreeMap<String, Configuration>,
    ribs: &'a RibTables,
    fibs: &'a FibTables,
    topology: &'a Topology,
    owners: &'a IpOwners,
}

impl Inputs<'_> {
    fn rib_view<'v>(&'v self, node: &'v str, vrf: &'v str) -> Result<RibView<'v>, ForwardingError> {
        let rib = self
            .ribs
            .get(node)
            .and_then(|vrfs| vrfs.get(vrf))
            .ok_or_else(|| ForwardingError::MissingRib {
                node: node.to_owned(),
                vrf: vrf.to_owned(),
            })?;
        Ok(RibView { node, vrf, rib })
    }

    fn node_routes(
        &self,
        node: &str,
        config: &Configuration,
    ) -> Result<NodeRoutes, ForwardingError> {
        let mut routes = NodeRoutes::default();
        for (vrf, fib) in self.fibs.node_fibs(node).into_iter().flatten() {
            let view = self.rib_view(node, vrf)?;
            let networks = FibNetworks::new(config, vrf, fib)?;
            let next_vrf = networks
                .next_vrf
                .iter()
                .map(|(next, prefixes)| view.match_ips(prefixes).map(|space| (next.clone(), space)))
                .collect::<Result<BTreeMap<_, _>, ForwardingError>>()?;
            let routed_out = networks
                .forwarded
                .iter()
                .map(|(iface, next_hops)| {
                    view.match_ips(next_hops.keys())
                        .map(|space| (iface.clone(), space))
                })
                .collect::<Result<InterfaceSpaces, ForwardingError>>()?;
            let vrf_routes = VrfRoutes {
                routable: view.rib.routable_ips().clone(),
                null_routed: view.match_ips(&networks.null_routed)?,
                next_vrf,
                routed_out,
                networks,
            };
            routes.vrfs.insert(vrf.clone(), vrf_routes);
        }

        for interface in config.active_interfaces() {
            let (routable, routed_out) = routes.vrfs.get(&interface.vrf).map_or(
                (&NO_SPACE, &NO_SPACE),
                |vrf| {
                    (
                        &vrf.routable,
                        vrf.routed_out.get(&interface.name).unwrap_or(&NO_SPACE),
                    )
                },
            );
            let replies = interface_arp_replies(
                interface,
                self.owners.interface_owned_ips(node, &interface.name),
                routable,
                routed_out,
            );
            routes
                .arp_replies
                .entry(interface.vrf.clone())
                .or_default()
                .insert(interface.name.clone(), replies);
        }
        debug!(
            "{node}: {} vrfs, {} interfaces replying to ARP",
            routes.vrfs.len(),
            routes.arp_replies.values().map(BTreeMap::len).sum::<usize>()
        );
        Ok(routes)
    }

    fn node_outcome(
        &self,
        node: &str,
        routes: &NodeRoutes,
        arp_replies: &NodeInterfaceSpaces,
        someone_replies: &NodeInterfaceSpaces,
    ) -> Result<NodeOutcome, ForwardingError> {
        let mut outcome = NodeOutcome::default();
        for (vrf, vrf_routes) in &routes.vrfs {
            let view = self.rib_view(node, vrf)?;
            for (iface, next_hops) in &vrf_routes.networks.forwarded {
                let tail = NodeInterfacePair::new(node, iface);
                let arp = InterfaceArp::new(
                    view,
                    &tail,
                    next_hops,
                    self.topology,
                    arp_replies,
                    someone_replies,
                    self.owners.internal_ips(),
                )?;
                let host_subnet_ips = self.owners.host_subnet_ips(node, iface);
                let failure = ArpFailure {
                    dest_ip: &arp.arp_false_dest_ip,
                    external_next_hop_ip: &arp.arp_false_external_next_hop_ip,
                    internal_next_hop_ip: &arp.arp_false_internal_next_hop_ip,
                    host_subnet_ips: &host_subnet_ips,
                    owned_ips: self.owners.owned_ips(),
                    internal_ips: self.owners.internal_ips(),
                    missing_devices: self.owners.has_missing_devices(node, iface),
                };
                let interface_outcome = InterfaceOutcome {
                    arp_false_next_hop_ip: arp.arp_false_next_hop_ip(),
                    arp_false: arp.arp_false(),
                    neighbor_unreachable: failure.neighbor_unreachable(),
                    delivered_to_subnet: failure.delivered_to_subnet(),
                    exits_network: failure.exits_network(),
                    insufficient_info: failure.insufficient_info(),
                    arp_false_dest_ip: arp.arp_false_dest_ip,
                };
                outcome
                    .interfaces
                    .entry(vrf.clone())
                    .or_default()
                    .insert(iface.clone(), interface_outcome);
                outcome
                    .arp_true_edge_dest_ip
                    .extend(arp.arp_true_edge_dest_ip);
                outcome
                    .arp_true_edge_next_hop_ip
                    .extend(arp.arp_true_edge_next_hop_ip);
            }
        }
        Ok(outcome)
    }
}

/// The forwarding behavior of every interface and edge of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct ForwardingAnalysis {
    routable_ips: NodeVrfSpaces,
    null_routed_ips: NodeVrfSpaces,
    next_vrf_ips: BTreeMap<String, BTreeMap<String, BTreeMap<String, IpSpace>>>,
    ips_routed_out_interfaces: NodeVrfInterfaceSpaces,
    arp_replies: NodeVrfInterfaceSpaces,
    someone_replies: NodeInterfaceSpaces,
    arp_false_dest_ip: NodeVrfInterfaceSpaces,
    arp_false_next_hop_ip: NodeVrfInterfaceSpaces,
    arp_false: NodeVrfInterfaceSpaces,
    arp_true_edge_dest_ip: EdgeSpaces,
    arp_true_edge_next_hop_ip: EdgeSpaces,
    arp_true_edge: EdgeSpaces,
    neighbor_unreachable: NodeVrfInterfaceSpaces,
    delivered_to_subnet: NodeVrfInterfaceSpaces,
    exits_network: NodeVrfInterfaceSpaces,
    insufficient_info: NodeVrfInterfaceSpaces,
}

impl ForwardingAnalysis {
    /// Analyse a snapshot. `configurations` is keyed by node name.
    ///
    /// # Errors
    ///
    /// Fails if a RIB or FIB belongs to a node without configuration, if a FIB has no RIB, if a
    /// FIB forwards out of an interface its node does not have, or if a RIB lacks the matching
    /// addresses of one of its networks.
    pub fn new(
        configurations: &BTreeMap<String, Configuration>,
        ribs: &RibTables,
        fibs: &FibTables,
        topology: &Topology,
        owners: &IpOwners,
        params: &AnalysisParams,
    ) -> Result<Self, ForwardingError> {
        let fib_nodes = fibs.iter().map(|(node, _, _)| node);
        if let Some(node) = ribs
            .keys()
            .map(String::as_str)
            .chain(fib_nodes)
            .find(|node| !configurations.contains_key(*node))
        {
            return Err(ForwardingError::UnknownNode {
                node: node.to_owned(),
            });
        }
        let inputs = Inputs {
            configurations,
            ribs,
            fibs,
            topology,
            owners,
        };

        let routes = map_keyed(inputs.configurations, params.parallel, |node, config| {
            inputs.node_routes(node, config)
        })?;

        let arp_replies_by_interface: NodeInterfaceSpaces = routes
            .iter()
            .map(|(node, node_routes)| {
                let ifaces: InterfaceSpaces = node_routes
                    .arp_replies
                    .values()
                    .flat_map(|ifaces| ifaces.iter())
                    .map(|(iface, space)| (iface.clone(), space.clone()))
                    .collect();
                (node.clone(), ifaces)
            })
            .collect();
        let someone = someone_replies(topology, &arp_replies_by_interface);

        let outcomes = map_keyed(&routes, params.parallel, |node, node_routes| {
            inputs.node_outcome(node, node_routes, &arp_replies_by_interface, &someone)
        })?;

        let mut analysis = ForwardingAnalysis {
            someone_replies: someone,
            ..Default::default()
        };
        for (node, node_routes) in routes {
            for (vrf, vrf_routes) in node_routes.vrfs {
                analysis
                    .routable_ips
                    .entry(node.clone())
                    .or_default()
                    .insert(vrf.clone(), vrf_routes.routable);
                analysis
                    .null_routed_ips
                    .entry(node.clone())
                    .or_default()
                    .insert(vrf.clone(), vrf_routes.null_routed);
                analysis
                    .next_vrf_ips
                    .entry(node.clone())
                    .or_default()
                    .insert(vrf.clone(), vrf_routes.next_vrf);
                analysis
                    .ips_routed_out_interfaces
                    .entry(node.clone())
                    .or_default()
                    .insert(vrf, vrf_routes.routed_out);
            }
            analysis.arp_replies.insert(node, node_routes.arp_replies);
        }
        for (node, outcome) in outcomes {
            analysis.add_node_outcome(&node, outcome);
        }
        analysis.arp_true_edge = analysis
            .arp_true_edge_dest_ip
            .iter()
            .map(|(edge, dest_ip)| {
                let next_hop_ip = analysis
                    .arp_true_edge_next_hop_ip
                    .get(edge)
                    .unwrap_or(&NO_SPACE);
                (edge.clone(), dest_ip.union(next_hop_ip))
            })
            .collect();

        info!(
            "Analysed forwarding of {} nodes over {} edges",
            analysis.routable_ips.len(),
            analysis.arp_true_edge.len()
        );
        Ok(analysis)
    }

    fn add_node_outcome(&mut self, node: &str, outcome: NodeOutcome) {
        for (vrf, interfaces) in outcome.interfaces {
            for (iface, o) in interfaces {
                let targets = [
                    (&mut self.arp_false_dest_ip, o.arp_false_dest_ip),
                    (&mut self.arp_false_next_hop_ip, o.arp_false_next_hop_ip),
                    (&mut self.arp_false, o.arp_false),
                    (&mut self.neighbor_unreachable, o.neighbor_unreachable),
                    (&mut self.delivered_to_subnet, o.delivered_to_subnet),
                    (&mut self.exits_network, o.exits_network),
                    (&mut self.insufficient_info, o.insufficient_info),
                ];
                for (map, space) in targets {
                    map.entry(node.to_owned())
                        .or_default()
                        .entry(vrf.clone())
                        .or_default()
                        .insert(iface.clone(), space);
                }
            }
        }
        self.arp_true_edge_dest_ip
            .extend(outcome.arp_true_edge_dest_ip);
        self.arp_true_edge_next_hop_ip
            .extend(outcome.arp_true_edge_next_hop_ip);
    }

    /// Destinations each VRF has a route for.
    #[must_use]
    pub fn routable_ips(&self) -> &NodeVrfSpaces {
        &self.routable_ips
    }

    /// Destinations each VRF discards.
    #[must_use]
    pub fn null_routed_ips(&self) -> &NodeVrfSpaces {
        &self.null_routed_ips
    }

    /// Destinations each VRF hands to another VRF, by next VRF.
    #[must_use]
    pub fn next_vrf_ips(
        &self,
    ) -> &BTreeMap<String, BTreeMap<String, BTreeMap<String, IpSpace>>> {
        &self.next_vrf_ips
    }

    /// Destinations forwarded out of each interface.
    #[must_use]
    pub fn ips_routed_out_interfaces(&self) -> &NodeVrfInterfaceSpaces {
        &self.ips_routed_out_interfaces
    }

    /// Addresses each active interface answers ARP requests for.
    #[must_use]
    pub fn arp_replies(&self) -> &NodeVrfInterfaceSpaces {
        &self.arp_replies
    }

    /// Addresses some neighbor of each interface answers ARP requests for.
    #[must_use]
    pub fn someone_replies(&self) -> &NodeInterfaceSpaces {
        &self.someone_replies
    }

    #[must_use]
    pub fn arp_false_dest_ip(&self) -> &NodeVrfInterfaceSpaces {
        &self.arp_false_dest_ip
    }

    #[must_use]
    pub fn arp_false_next_hop_ip(&self) -> &NodeVrfInterfaceSpaces {
        &self.arp_false_next_hop_ip
    }

    /// Destinations for which ARP fails on each interface.
    #[must_use]
    pub fn arp_false(&self) -> &NodeVrfInterfaceSpaces {
        &self.arp_false
    }

    #[must_use]
    pub fn arp_true_edge_dest_ip(&self) -> &EdgeSpaces {
        &self.arp_true_edge_dest_ip
    }

    #[must_use]
    pub fn arp_true_edge_next_hop_ip(&self) -> &EdgeSpaces {
        &self.arp_true_edge_next_hop_ip
    }

    /// Destinations forwarded across each edge.
    #[must_use]
    pub fn arp_true_edge(&self) -> &EdgeSpaces {
        &self.arp_true_edge
    }

    #[must_use]
    pub fn neighbor_unreachable(&self) -> &NodeVrfInterfaceSpaces {
        &self.neighbor_unreachable
    }

    #[must_use]
    pub fn delivered_to_subnet(&self) -> &NodeVrfInterfaceSpaces {
        &self.delivered_to_subnet
    }

    #[must_use]
    pub fn exits_network(&self) -> &NodeVrfInterfaceSpaces {
        &self.exits_network
    }

    #[must_use]
    pub fn insufficient_info(&self) -> &NodeVrfInterfaceSpaces {
        &self.insufficient_info
    }

    /// The edges leaving `tail` with the destinations forwarded over each.
    fn edges_from<'a>(
        &'a self,
        tail: &'a NodeInterfacePair,
    ) -> impl Iterator<Item = (&'a Edge, &'a IpSpace)> + 'a {
        let first = Edge {
            tail: tail.clone(),
            head: NodeInterfacePair::new("", ""),
        };
        self.arp_true_edge
            .range(first..)
            .take_while(move |(edge, _)| edge.tail == *tail)
    }

    fn vrf_null_routed(&self, node: &str, vrf: &str) -> &IpSpace {
        self.null_routed_ips
            .get(node)
            .and_then(|vrfs| vrfs.get(vrf))
            .unwrap_or(&NO_SPACE)
    }

    fn interface_spaces(&self) -> [(Disposition, &NodeVrfInterfaceSpaces); 4] {
        [
            (Disposition::NeighborUnreachable, &self.neighbor_unreachable),
            (Disposition::DeliveredToSubnet, &self.delivered_to_subnet),
            (Disposition::ExitsNetwork, &self.exits_network),
            (Disposition::InsufficientInfo, &self.insufficient_info),
        ]
    }

    /// The destinations of each disposition for packets routed by `vrf` of `node` out of
    /// `interface`. Restricted to the addresses actually routed out of the interface, the spaces
    /// partition them, unless a network has several next-hops that disagree.
    #[must_use]
    pub fn disposition_spaces(
        &self,
        node: &str,
        vrf: &str,
        interface: &str,
    ) -> BTreeMap<Disposition, IpSpace> {
        let tail = NodeInterfacePair::new(node, interface);
        let forwarded = IpSpace::union_all(self.edges_from(&tail).map(|(_, space)| space.clone()));
        let mut spaces = BTreeMap::from([
            (Disposition::ForwardedOnEdge, forwarded),
            (Disposition::NullRouted, self.vrf_null_routed(node, vrf).clone()),
        ]);
        for (disposition, by_interface) in self.interface_spaces() {
            spaces.insert(
                disposition,
                lookup3(by_interface, node, vrf, interface).clone(),
            );
        }
        spaces
    }

    /// The dispositions of a packet for `ip` routed by `vrf` of `node` out of `interface`.
    ///
    /// A packet actually routed out of the interface has exactly one, except when the route
    /// has several next-hops that disagree. Destinations whose longest matching route did not
    /// resolve have none.
    #[must_use]
    pub fn dispositions(
        &self,
        node: &str,
        vrf: &str,
        interface: &str,
        ip: Ipv4Addr,
    ) -> BTreeSet<Disposition> {
        let mut dispositions = BTreeSet::new();
        if self.vrf_null_routed(node, vrf).contains_ip(ip) {
            dispositions.insert(Disposition::NullRouted);
        }
        let tail = NodeInterfacePair::new(node, interface);
        if self.edges_from(&tail).any(|(_, space)| space.contains_ip(ip)) {
            dispositions.insert(Disposition::ForwardedOnEdge);
        }
        for (disposition, by_interface) in self.interface_spaces() {
            if lookup3(by_interface, node, vrf, interface).contains_ip(ip) {
                dispositions.insert(disposition);
            }
        }
        dispositions
    }
}
