// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! End-to-end data plane of a small network: an edge router with an uplink to an unmodeled
//! provider, and a core router serving a LAN and a management VRF.

use config::Configuration;
use lpm::prefix::Prefix;
use netfwd_forwarding::{
    AnalysisParams, AnalysisParamsBuilder, DataPlane, Disposition, Edge, Snapshot, Topology,
};
use ipspace::IpRangeSet;
use pretty_assertions::assert_eq;
use routing::{
    FibAction, FibParams, NextHop, Rib, RibTables, Route, RouteProtocol, any_route,
    no_default_route,
};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

const CONFIGS: &str = "
- hostname: edge
  interfaces:
    core:
      name: core
      addresses: [10.0.0.1/31]
    uplink:
      name: uplink
      description: provider
      addresses: [192.0.2.1/30]
- hostname: core
  vrfs: [mgmt]
  interfaces:
    edge:
      name: edge
      addresses: [10.0.0.0/31]
    lan:
      name: lan
      addresses: [172.16.1.1/24]
      proxy_arp: true
    oob:
      name: oob
      vrf: mgmt
      addresses: [172.31.0.1/24]
    spare:
      name: spare
      addresses: [172.20.0.1/24]
      active: false
";

const TOPOLOGY: &str = "
- tail: { node: core, interface: edge }
  head: { node: edge, interface: core }
- tail: { node: edge, interface: core }
  head: { node: core, interface: edge }
";

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn ribs() -> RibTables {
    let edge = Rib::from_routes([
        Route::connected(Prefix::from("10.0.0.0/31"), "core"),
        Route::connected(Prefix::from("192.0.2.0/30"), "uplink"),
        Route::with_next_hop(Prefix::ROOT, NextHop::interface("uplink"), RouteProtocol::Static),
        Route::static_via(Prefix::from("172.16.0.0/16"), ip("10.0.0.0")),
    ]);
    let core = Rib::from_routes([
        Route::connected(Prefix::from("10.0.0.0/31"), "edge"),
        Route::connected(Prefix::from("172.16.1.0/24"), "lan"),
        Route::static_via(Prefix::ROOT, ip("10.0.0.1")),
        Route::static_via(Prefix::from("198.51.100.0/24"), ip("8.8.4.4")),
        Route::with_next_hop(Prefix::from("172.16.9.0/24"), NextHop::Discard, RouteProtocol::Static),
        Route::with_next_hop(Prefix::from("172.31.0.0/24"), NextHop::vrf("mgmt"), RouteProtocol::Static),
    ]);
    let core_mgmt = Rib::from_routes([Route::connected(Prefix::from("172.31.0.0/24"), "oob")]);
    RibTables::from([
        ("edge".to_owned(), BTreeMap::from([("default".to_owned(), edge)])),
        (
            "core".to_owned(),
            BTreeMap::from([("default".to_owned(), core), ("mgmt".to_owned(), core_mgmt)]),
        ),
    ])
}

fn snapshot() -> Snapshot {
    let configs: Vec<Configuration> = serde_yaml_ng::from_str(CONFIGS).unwrap();
    Snapshot::with_inferred_topology(configs, ribs())
}

fn data_plane(params: &AnalysisParams) -> DataPlane {
    snapshot()
        .compute_data_plane(&any_route, &FibParams::default(), params)
        .unwrap()
}

#[test]
fn inferred_topology_matches_cabling() {
    let cabling: Topology = serde_yaml_ng::from_str(TOPOLOGY).unwrap();
    assert_eq!(snapshot().topology, cabling);
}

#[test]
fn fib_resolution() {
    let dp = data_plane(&AnalysisParams::default());
    let core = dp.fibs.get_fib("core", "default").unwrap();
    let actions: Vec<&FibAction> = core.get(ip("198.51.100.7")).iter().map(|e| e.action()).collect();
    assert_eq!(actions, vec![&FibAction::forward(Some(ip("10.0.0.1")), "edge")]);
    let entry = core.get(ip("198.51.100.7")).iter().next().unwrap();
    assert_eq!(entry.resolution_steps().len(), 2);
    assert!(dp.warnings().is_empty());

    // without the default route the next-hop of 198.51.100.0/24 does not resolve
    let dp = snapshot()
        .compute_data_plane(&no_default_route, &FibParams::default(), &AnalysisParams::default())
        .unwrap();
    let core = dp.fibs.get_fib("core", "default").unwrap();
    assert!(core.get(ip("198.51.100.7")).is_empty());
    assert!(!core.get(ip("198.51.101.7")).is_empty());
    for iface in ["edge", "lan"] {
        let found = dp.forwarding_analysis.dispositions("core", "default", iface, ip("198.51.100.7"));
        assert!(found.is_empty(), "{iface}: {found:?}");
    }
    let warnings: Vec<String> = dp.warnings().iter().map(ToString::to_string).collect();
    assert_eq!(
        warnings,
        vec!["core/default: next-hop 8.8.4.4 of 198.51.100.0/24 is unresolvable"]
    );
}

#[test]
fn dispositions() {
    let dp = data_plane(&AnalysisParams::default());
    let analysis = &dp.forwarding_analysis;
    let d = |node: &str, iface: &str, addr: &str| analysis.dispositions(node, "default", iface, ip(addr));
    let one = |disposition| BTreeSet::from([disposition]);

    assert_eq!(d("edge", "core", "172.16.5.5"), one(Disposition::ForwardedOnEdge));
    assert_eq!(d("core", "edge", "8.8.8.8"), one(Disposition::ForwardedOnEdge));
    assert_eq!(d("edge", "uplink", "8.8.8.8"), one(Disposition::ExitsNetwork));
    assert_eq!(d("edge", "uplink", "192.0.2.2"), one(Disposition::DeliveredToSubnet));
    assert_eq!(d("edge", "uplink", "172.31.0.9"), one(Disposition::InsufficientInfo));
    assert_eq!(d("core", "lan", "172.16.1.50"), one(Disposition::DeliveredToSubnet));
    assert_eq!(d("core", "edge", "10.0.0.0"), one(Disposition::NeighborUnreachable));
    assert_eq!(d("core", "lan", "172.16.9.9"), one(Disposition::NullRouted));

    assert!(analysis.null_routed_ips()["core"]["default"].contains_ip(ip("172.16.9.9")));
    assert!(analysis.next_vrf_ips()["core"]["default"]["mgmt"].contains_ip(ip("172.31.0.5")));
    assert!(analysis.routable_ips()["core"]["mgmt"].contains_ip(ip("172.31.0.5")));
    assert!(!analysis.routable_ips()["core"]["mgmt"].contains_ip(ip("172.16.1.5")));
}

#[test]
fn proxy_arp_and_inactive_interfaces() {
    let dp = data_plane(&AnalysisParams::default());
    let replies = &dp.forwarding_analysis.arp_replies()["core"];
    let lan = &replies["default"]["lan"];
    assert!(lan.contains_ip(ip("172.16.1.1")));
    assert!(lan.contains_ip(ip("8.8.8.8")));
    assert!(!lan.contains_ip(ip("172.16.1.77")));
    assert!(replies["mgmt"]["oob"].contains_ip(ip("172.31.0.1")));
    assert!(!replies["default"].contains_key("spare"));
    assert!(!dp.owners.owned_ips().contains_ip(ip("172.20.0.1")));

    let edge = Edge::new("edge", "core", "core", "edge");
    let across = &dp.forwarding_analysis.arp_true_edge()[&edge];
    assert!(across.contains_ip(ip("172.16.1.50")));
    assert!(across.contains_ip(ip("10.0.0.0")));
    assert!(!across.contains_ip(ip("8.8.8.8")));
}

#[test]
fn every_routed_address_has_one_disposition() {
    for max_host_subnet_len in [24, 29, 32] {
        let params = AnalysisParamsBuilder::default()
            .max_host_subnet_len(max_host_subnet_len)
            .build()
            .unwrap();
        let dp = data_plane(&params);
        let analysis = &dp.forwarding_analysis;
        for (node, vrfs) in analysis.ips_routed_out_interfaces() {
            for (vrf, ifaces) in vrfs {
                for (iface, routed_out) in ifaces {
                    let at = format!("{node}/{vrf}/{iface} (max /{max_host_subnet_len})");
                    let routed_out = routed_out.to_range_set();
                    let mut covered = IpRangeSet::empty();
                    for (disposition, space) in analysis.disposition_spaces(node, vrf, iface) {
                        let part = space.to_range_set().intersection(&routed_out);
                        let overlap = part.intersection(&covered);
                        assert!(overlap.is_empty(), "{at}: {disposition} overlaps on {overlap}");
                        covered = covered.union(&part);
                    }
                    assert_eq!(covered, routed_out, "{at}");
                }
            }
        }
    }
}
