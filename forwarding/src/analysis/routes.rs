// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The networks of a FIB grouped by what the FIB does with them, and the destination addresses
//! that land on them.

use config::Configuration;
use ipspace::IpSpace;
use lpm::prefix::Prefix;
use routing::{Fib, FibAction, Rib, is_vtep_interface};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use tracing::trace;

use crate::errors::ForwardingError;

/// Final next-hop addresses of the networks forwarded out of one interface. A `None` next-hop
/// means that ARP is done for the destination address itself.
pub(crate) type NextHopIps = BTreeMap<Prefix, BTreeSet<Option<Ipv4Addr>>>;

/// The networks of one FIB, by action.
#[derive(Debug, Default)]
pub(crate) struct FibNetworks {
    /// By egress interface.
    pub(crate) forwarded: BTreeMap<String, NextHopIps>,
    pub(crate) null_routed: BTreeSet<Prefix>,
    /// By next VRF.
    pub(crate) next_vrf: BTreeMap<String, BTreeSet<Prefix>>,
}

impl FibNetworks {
    /// Group the networks of `fib`, the FIB of `vrf` on `config`.
    ///
    /// Tunnel interfaces are left out: traffic sent through them does not ARP.
    pub(crate) fn new(
        config: &Configuration,
        vrf: &str,
        fib: &Fib,
    ) -> Result<Self, ForwardingError> {
        let mut networks = FibNetworks::default();
        for (network, entries) in fib.entries() {
            for entry in entries {
                match entry.action() {
                    FibAction::Forward {
                        next_hop_ip,
                        interface,
                    } => {
                        if config.get_interface(interface).is_none() {
                            if is_vtep_interface(interface) {
                                let node = &config.hostname;
                                trace!("{node}/{vrf}: {network} is tunneled via {interface}");
                                continue;
                            }
                            return Err(ForwardingError::UnknownInterface {
                                node: config.hostname.clone(),
                                vrf: vrf.to_owned(),
                                interface: interface.clone(),
                            });
                        }
                        networks
                            .forwarded
                            .entry(interface.clone())
                            .or_default()
                            .entry(network)
                            .or_default()
                            .insert(*next_hop_ip);
                    }
                    FibAction::NullRoute => {
                        networks.null_routed.insert(network);
                    }
                    FibAction::NextVrf { vrf: next, .. } => {
                        networks
                            .next_vrf
                            .entry(next.clone())
                            .or_default()
                            .insert(network);
                    }
                }
            }
        }
        Ok(networks)
    }
}

/// A RIB with the node and VRF it belongs to.
#[derive(Clone, Copy)]
pub(crate) struct RibView<'a> {
    pub(crate) node: &'a str,
    pub(crate) vrf: &'a str,
    pub(crate) rib: &'a Rib,
}

impl RibView<'_> {
    /// The destination addresses for which a lookup lands on one of `networks`.
    pub(crate) fn match_ips<'p>(
        &self,
        networks: impl IntoIterator<Item = &'p Prefix>,
    ) -> Result<IpSpace, ForwardingError> {
        let matching = self.rib.matching_ips();
        let spaces = networks
            .into_iter()
            .map(|network| {
                matching
                    .get(network)
                    .cloned()
                    .ok_or_else(|| ForwardingError::MissingMatchingIps {
                        node: self.node.to_owned(),
                        vrf: self.vrf.to_owned(),
                        network: *network,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IpSpace::union_all(spaces))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Interface, InterfaceAddress};
    use routing::{FibParams, NextHop, Route, RouteProtocol, Vni, any_route, build_fib};

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn config() -> Configuration {
        Configuration::new("r1")
            .add_vrf("blue")
            .add_interface(Interface::new("eth0").add_address("10.0.0.1/24".parse::<InterfaceAddress>().unwrap()))
            .add_interface(Interface::new("eth1").add_address("10.1.0.1/24".parse::<InterfaceAddress>().unwrap()))
    }

    fn rib() -> Rib {
        let vni = Vni::new_checked(100).unwrap();
        Rib::from_routes([
            Route::connected(Prefix::from("10.0.0.0/24"), "eth0"),
            Route::connected(Prefix::from("10.1.0.0/24"), "eth1"),
            Route::static_via(Prefix::from("20.0.0.0/8"), ip("10.0.0.2")),
            Route::static_via(Prefix::from("20.0.0.0/8"), ip("10.1.0.2")),
            Route::with_next_hop(Prefix::from("30.0.0.0/8"), NextHop::Discard, RouteProtocol::Static),
            Route::with_next_hop(Prefix::from("40.0.0.0/8"), NextHop::vrf("blue"), RouteProtocol::Static),
            Route::with_next_hop(Prefix::from("50.0.0.0/8"), NextHop::Vtep { vni, ip: ip("7.7.7.7") }, RouteProtocol::Bgp),
        ])
    }

    #[test]
    fn test_fib_networks() {
        let rib = rib();
        let fib = build_fib(&rib, &any_route, &FibParams::default()).unwrap().fib;
        let networks = FibNetworks::new(&config(), "default", &fib).unwrap();

        assert_eq!(networks.forwarded.len(), 2);
        let eth0 = &networks.forwarded["eth0"];
        assert_eq!(eth0[&Prefix::from("10.0.0.0/24")], BTreeSet::from([None]));
        assert_eq!(eth0[&Prefix::from("20.0.0.0/8")], BTreeSet::from([Some(ip("10.0.0.2"))]));
        assert_eq!(
            networks.forwarded["eth1"][&Prefix::from("20.0.0.0/8")],
            BTreeSet::from([Some(ip("10.1.0.2"))])
        );
        assert_eq!(networks.null_routed, BTreeSet::from([Prefix::from("30.0.0.0/8")]));
        assert_eq!(
            networks.next_vrf["blue"],
            BTreeSet::from([Prefix::from("40.0.0.0/8")])
        );
    }

    #[test]
    fn test_unknown_interface() {
        let rib = Rib::from_routes([Route::connected(Prefix::from("10.9.0.0/24"), "eth9")]);
        let fib = build_fib(&rib, &any_route, &FibParams::default()).unwrap().fib;
        let err = FibNetworks::new(&config(), "default", &fib).unwrap_err();
        assert_eq!(
            err,
            ForwardingError::UnknownInterface {
                node: "r1".to_string(),
                vrf: "default".to_string(),
                interface: "eth9".to_string()
            }
        );
    }

    #[test]
    fn test_match_ips() {
        let rib = Rib::from_routes([
            Route::connected(Prefix::from("10.0.0.0/24"), "eth0"),
            Route::static_via(Prefix::from("10.0.0.0/8"), ip("10.0.0.2")),
        ]);
        let view = RibView {
            node: "r1",
            vrf: "default",
            rib: &rib,
        };
        let space = view.match_ips([&Prefix::from("10.0.0.0/8")]).unwrap();
        assert!(space.contains_ip(ip("10.9.9.9")));
        assert!(!space.contains_ip(ip("10.0.0.9")));

        let both = view
            .match_ips([&Prefix::from("10.0.0.0/8"), &Prefix::from("10.0.0.0/24")])
            .unwrap();
        assert_eq!(both.to_range_set().len(), 1 << 24);

        assert!(view.match_ips(Vec::<&Prefix>::new()).unwrap().is_empty());
        assert!(matches!(
            view.match_ips([&Prefix::from("11.0.0.0/8")]),
            Err(ForwardingError::MissingMatchingIps { .. })
        ));
    }
}
