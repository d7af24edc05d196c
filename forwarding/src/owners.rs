// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Who owns which addresses in the network.
//!
//! The addresses of the network fall in three classes: *owned* (assigned to some active
//! interface), *internal* (owned, or a host address of the subnet of some interface) and
//! *external* (everything else). An interface has *missing devices* when one of its host subnets
//! has host addresses that no active interface of the snapshot owns: packets for those addresses
//! may be answered by devices we know nothing about.

use config::Configuration;
use ipspace::{IpSpace, IpWildcard, IpWildcardSetIpSpace};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use tracing::debug;

use crate::analysis::AnalysisParams;
use crate::topology::NodeInterfacePair;

static NO_IPS: BTreeSet<Ipv4Addr> = BTreeSet::new();

/// Address ownership of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct IpOwners {
    interface_owned_ips: BTreeMap<String, BTreeMap<String, BTreeSet<Ipv4Addr>>>,
    owners: BTreeMap<Ipv4Addr, BTreeSet<NodeInterfacePair>>,
    owned_ips: IpSpace,
    host_subnet_ips: BTreeMap<String, BTreeMap<String, IpSpace>>,
    internal_ips: IpSpace,
    missing_devices: BTreeSet<NodeInterfacePair>,
}

/// The space of a set of addresses.
pub(crate) fn hosts_space<'a>(ips: impl IntoIterator<Item = &'a Ipv4Addr>) -> IpSpace {
    let whitelist: Vec<IpWildcard> = ips.into_iter().map(|ip| IpWildcard::from(*ip)).collect();
    if whitelist.is_empty() {
        IpSpace::Empty
    } else {
        IpSpace::from(IpWildcardSetIpSpace::new(whitelist, vec![]))
    }
}

impl IpOwners {
    #[must_use]
    pub fn new<'a>(
        configurations: impl IntoIterator<Item = &'a Configuration>,
        params: &AnalysisParams,
    ) -> Self {
        let mut owners = IpOwners::default();
        let mut subnets: Vec<(NodeInterfacePair, IpSpace)> = vec![];

        for config in configurations {
            let node = &config.hostname;
            for interface in config.active_interfaces() {
                let pair = NodeInterfacePair::new(node, &interface.name);
                let ips: BTreeSet<Ipv4Addr> = interface.ips().collect();
                for ip in &ips {
                    owners.owners.entry(*ip).or_default().insert(pair.clone());
                }
                owners
                    .interface_owned_ips
                    .entry(node.clone())
                    .or_default()
                    .insert(interface.name.clone(), ips);

                for prefix in interface.prefixes().filter(|p| params.is_host_subnet(p)) {
                    subnets.push((pair.clone(), IpSpace::subnet_hosts(&prefix)));
                }
            }
        }
        owners.owned_ips = hosts_space(owners.owners.keys());
        let owned = owners.owned_ips.to_range_set();

        for (pair, hosts) in subnets {
            if !hosts.to_range_set().is_subset(&owned)
                && owners.missing_devices.insert(pair.clone())
            {
                debug!("Interface {pair} has missing devices");
            }
            let node_subnets = owners.host_subnet_ips.entry(pair.node).or_default();
            let entry = node_subnets.entry(pair.interface).or_default();
            *entry = entry.union(&hosts);
        }

        owners.internal_ips = IpSpace::union_all(
            std::iter::once(owners.owned_ips.clone()).chain(
                owners
                    .host_subnet_ips
                    .values()
                    .flat_map(|by_iface| by_iface.values().cloned()),
            ),
        );
        owners
    }

    /// Addresses owned by an interface. Empty for inactive or unknown interfaces.
    #[must_use]
    pub fn interface_owned_ips(&self, node: &str, interface: &str) -> &BTreeSet<Ipv4Addr> {
        self.interface_owned_ips
            .get(node)
            .and_then(|ifaces| ifaces.get(interface))
            .unwrap_or(&NO_IPS)
    }

    /// Per node, per interface owned addresses.
    #[must_use]
    pub fn all_interface_owned_ips(
        &self,
    ) -> &BTreeMap<String, BTreeMap<String, BTreeSet<Ipv4Addr>>> {
        &self.interface_owned_ips
    }

    /// The interfaces owning `ip`.
    pub fn owners_of(&self, ip: Ipv4Addr) -> impl Iterator<Item = &NodeInterfacePair> {
        self.owners.get(&ip).into_iter().flatten()
    }

    /// Every address owned by the network.
    #[must_use]
    pub fn owned_ips(&self) -> &IpSpace {
        &self.owned_ips
    }

    /// The host addresses of the subnets of an interface.
    #[must_use]
    pub fn host_subnet_ips(&self, node: &str, interface: &str) -> IpSpace {
        self.host_subnet_ips
            .get(node)
            .and_then(|ifaces| ifaces.get(interface))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn internal_ips(&self) -> &IpSpace {
        &self.internal_ips
    }

    #[must_use]
    pub fn external_ips(&self) -> IpSpace {
        self.internal_ips.complement()
    }

    #[must_use]
    pub fn has_missing_devices(&self, node: &str, interface: &str) -> bool {
        self.missing_devices
            .contains(&NodeInterfacePair::new(node, interface))
    }

    /// Interfaces whose subnets have missing devices.
    #[must_use]
    pub fn interfaces_with_missing_devices(&self) -> &BTreeSet<NodeInterfacePair> {
        &self.missing_devices
    }
}
