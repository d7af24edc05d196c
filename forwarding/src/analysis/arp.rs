// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Who answers ARP requests, and for which destinations ARP succeeds or fails.

use config::Interface;
use ipspace::{AclIpSpace, IpSpace};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::analysis::routes::{NextHopIps, RibView};
use crate::analysis::{EdgeSpaces, NodeInterfaceSpaces};
use crate::errors::ForwardingError;
use crate::owners::hosts_space;
use crate::topology::{NodeInterfacePair, Topology};

static NO_SPACE: IpSpace = IpSpace::Empty;

pub(crate) fn lookup<'a>(spaces: &'a NodeInterfaceSpaces, pair: &NodeInterfacePair) -> &'a IpSpace {
    spaces
        .get(&pair.node)
        .and_then(|ifaces| ifaces.get(&pair.interface))
        .unwrap_or(&NO_SPACE)
}

/// The addresses an interface answers ARP requests for.
///
/// An interface without addresses answers nothing. Otherwise it answers for its own addresses
/// and, with proxy-ARP, for whatever its VRF can route except what it routes out of itself.
pub(crate) fn interface_arp_replies(
    interface: &Interface,
    owned: &BTreeSet<Ipv4Addr>,
    routable: &IpSpace,
    routed_out: &IpSpace,
) -> IpSpace {
    if owned.is_empty() {
        return IpSpace::Empty;
    }
    let replies = AclIpSpace::permitting(hosts_space(owned));
    if interface.proxy_arp {
        replies
            .then_rejecting(routed_out.clone())
            .then_permitting(routable.clone())
            .build()
    } else {
        replies.build()
    }
}

/// Per sending interface, the addresses some neighbor answers ARP requests for.
pub(crate) fn someone_replies(
    topology: &Topology,
    arp_replies: &NodeInterfaceSpaces,
) -> NodeInterfaceSpaces {
    let mut replies = NodeInterfaceSpaces::new();
    for edge in topology.edges() {
        let space = replies
            .entry(edge.tail.node.clone())
            .or_default()
            .entry(edge.tail.interface.clone())
            .or_default();
        *space = space.union(lookup(arp_replies, &edge.head));
    }
    replies
}

/// ARP outcomes of the networks forwarded out of one interface.
#[derive(Debug, Default)]
pub(crate) struct InterfaceArp {
    /// Destinations ARPed for directly that no neighbor answers for.
    pub(crate) arp_false_dest_ip: IpSpace,
    /// Destinations whose next-hop is external and answered by no neighbor.
    pub(crate) arp_false_external_next_hop_ip: IpSpace,
    /// Destinations whose next-hop is internal and answered by no neighbor.
    pub(crate) arp_false_internal_next_hop_ip: IpSpace,
    pub(crate) arp_true_edge_dest_ip: EdgeSpaces,
    pub(crate) arp_true_edge_next_hop_ip: EdgeSpaces,
}

fn networks_where<F>(
    networks: &NextHopIps,
    mut accept: F,
) -> impl Iterator<Item = &lpm::prefix::Prefix>
where
    F: FnMut(&Option<Ipv4Addr>) -> bool,
{
    networks
        .iter()
        .filter(move |(_, next_hops)| next_hops.iter().any(&mut accept))
        .map(|(network, _)| network)
}

impl InterfaceArp {
    pub(crate) fn new(
        view: RibView<'_>,
        tail: &NodeInterfacePair,
        networks: &NextHopIps,
        topology: &Topology,
        arp_replies: &NodeInterfaceSpaces,
        someone_replies: &NodeInterfaceSpaces,
        internal_ips: &IpSpace,
    ) -> Result<Self, ForwardingError> {
        let someone = lookup(someone_replies, tail);
        let unanswered = |nh: &Option<Ipv4Addr>| nh.is_some_and(|ip| !someone.contains_ip(ip));

        let dest_ip_match = view.match_ips(networks_where(networks, Option::is_none))?;
        let mut arp = InterfaceArp {
            arp_false_dest_ip: AclIpSpace::rejecting(someone.clone())
                .then_permitting(dest_ip_match.clone())
                .build(),
            arp_false_external_next_hop_ip: view.match_ips(networks_where(networks, |nh| {
                unanswered(nh) && nh.is_some_and(|ip| !internal_ips.contains_ip(ip))
            }))?,
            arp_false_internal_next_hop_ip: view.match_ips(networks_where(networks, |nh| {
                unanswered(nh) && nh.is_some_and(|ip| internal_ips.contains_ip(ip))
            }))?,
            ..Default::default()
        };

        for edge in topology.interface_edges(tail) {
            let head_replies = lookup(arp_replies, &edge.head);
            let next_hop_match = view.match_ips(networks_where(networks, |nh| {
                nh.is_some_and(|ip| head_replies.contains_ip(ip))
            }))?;
            arp.arp_true_edge_dest_ip
                .insert(edge.clone(), dest_ip_match.intersection(head_replies));
            arp.arp_true_edge_next_hop_ip.insert(edge, next_hop_match);
        }
        Ok(arp)
    }

    /// Destinations whose next-hop address no neighbor answers for.
    pub(crate) fn arp_false_next_hop_ip(&self) -> IpSpace {
        self.arp_false_external_next_hop_ip
            .union(&self.arp_false_internal_next_hop_ip)
    }

    /// Destinations for which ARP fails.
    pub(crate) fn arp_false(&self) -> IpSpace {
        IpSpace::union_all([
            self.arp_false_dest_ip.clone(),
            self.arp_false_external_next_hop_ip.clone(),
            self.arp_false_internal_next_hop_ip.clone(),
        ])
    }
}
