// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Routes as installed in a RIB

use derive_builder::Builder;
use lpm::prefix::Prefix;
use std::net::Ipv4Addr;

use crate::errors::RoutingError;
use crate::vni::Vni;

/// The protocol (or origin) of a route.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteProtocol {
    Local,
    Connected,
    Static,
    Ospf,
    Isis,
    Bgp,
    Ibgp,
    Aggregate,
    #[default]
    Other,
}

impl RouteProtocol {
    /// Administrative cost used when a route does not set one explicitly.
    #[must_use]
    pub fn default_admin_cost(self) -> u8 {
        match self {
            RouteProtocol::Local | RouteProtocol::Connected => 0,
            RouteProtocol::Static => 1,
            RouteProtocol::Bgp => 20,
            RouteProtocol::Ospf => 110,
            RouteProtocol::Isis => 115,
            RouteProtocol::Ibgp | RouteProtocol::Aggregate => 200,
            RouteProtocol::Other => 255,
        }
    }
}

/// Where a route sends traffic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NextHop {
    /// A next-hop address, to be resolved recursively against the RIB.
    Ip(Ipv4Addr),
    /// An interface, optionally with the address of the neighbor to ARP for.
    Interface { name: String, ip: Option<Ipv4Addr> },
    /// Drop.
    Discard,
    /// Continue the lookup in another VRF.
    Vrf { name: String, ip: Option<Ipv4Addr> },
    /// Encapsulate towards a VXLAN tunnel endpoint.
    Vtep { vni: Vni, ip: Ipv4Addr },
}

impl NextHop {
    #[must_use]
    pub fn interface(name: &str) -> Self {
        NextHop::Interface {
            name: name.to_owned(),
            ip: None,
        }
    }

    #[must_use]
    pub fn interface_with_ip(name: &str, ip: Ipv4Addr) -> Self {
        NextHop::Interface {
            name: name.to_owned(),
            ip: Some(ip),
        }
    }

    #[must_use]
    pub fn vrf(name: &str) -> Self {
        NextHop::Vrf {
            name: name.to_owned(),
            ip: None,
        }
    }

    /// The next-hop address, for IP next-hops only.
    #[must_use]
    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self {
            NextHop::Ip(ip) => Some(*ip),
            _ => None,
        }
    }
}

/// A route, immutable once frozen into a [`Rib`](crate::rib::Rib).
///
/// The administrative cost defaults to the one of the protocol.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[builder(setter(into), build_fn(error = "RoutingError"))]
pub struct Route {
    pub network: Prefix,
    pub next_hop: NextHop,

    #[builder(default)]
    pub protocol: RouteProtocol,

    #[builder(default = "self.default_admin_cost()")]
    pub admin_cost: u8,

    #[builder(default)]
    pub metric: u32,

    #[builder(default)]
    pub tag: Option<u32>,

    /// Installed in the RIB but never used for forwarding.
    #[builder(default)]
    pub non_forwarding: bool,

    /// Not redistributed into routing protocols.
    #[builder(default)]
    pub non_routing: bool,

    /// For static routes: when false, the next-hop may only resolve via a connected route.
    #[builder(default = true)]
    pub recursive: bool,
}

impl RouteBuilder {
    fn default_admin_cost(&self) -> u8 {
        self.protocol.unwrap_or_default().default_admin_cost()
    }
}

impl Route {
    #[must_use]
    pub fn builder() -> RouteBuilder {
        RouteBuilder::default()
    }

    /// A connected route for the subnet of an interface.
    #[must_use]
    pub fn connected(network: Prefix, interface: &str) -> Self {
        Route::with_next_hop(network, NextHop::interface(interface), RouteProtocol::Connected)
    }

    /// A static route towards a next-hop address.
    #[must_use]
    pub fn static_via(network: Prefix, next_hop_ip: Ipv4Addr) -> Self {
        Route::with_next_hop(network, NextHop::Ip(next_hop_ip), RouteProtocol::Static)
    }

    #[must_use]
    pub fn with_next_hop(network: Prefix, next_hop: NextHop, protocol: RouteProtocol) -> Self {
        Self {
            network,
            next_hop,
            protocol,
            admin_cost: protocol.default_admin_cost(),
            metric: 0,
            tag: None,
            non_forwarding: false,
            non_routing: false,
            recursive: true,
        }
    }

    /// Whether this is a static route restricted to resolve via connected routes.
    #[must_use]
    pub fn is_non_recursive_static(&self) -> bool {
        self.protocol == RouteProtocol::Static && !self.recursive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_builder_defaults() {
        let route = Route::builder()
            .network(Prefix::from("10.0.0.0/8"))
            .next_hop(NextHop::Ip("192.168.0.1".parse().unwrap()))
            .protocol(RouteProtocol::Ospf)
            .build()
            .unwrap();
        assert_eq!(route.admin_cost, 110);
        assert!(route.recursive);
        assert!(!route.non_forwarding);
        assert_eq!(route.next_hop.ip(), Some("192.168.0.1".parse().unwrap()));

        let route = Route::builder()
            .network(Prefix::from("10.0.0.0/8"))
            .next_hop(NextHop::Discard)
            .admin_cost(7)
            .tag(Some(100_u32))
            .build()
            .unwrap();
        assert_eq!(route.protocol, RouteProtocol::Other);
        assert_eq!(route.admin_cost, 7);
        assert_eq!(route.tag, Some(100));
    }

    #[test]
    fn test_route_builder_missing_field() {
        let result = Route::builder().network(Prefix::from("10.0.0.0/8")).build();
        assert_eq!(result, Err(RoutingError::InvalidRoute("missing next_hop".to_string())));
    }

    #[test]
    fn test_non_recursive_static() {
        let mut route = Route::static_via(Prefix::from("10.0.0.0/8"), "1.1.1.1".parse().unwrap());
        assert!(!route.is_non_recursive_static());
        route.recursive = false;
        assert!(route.is_non_recursive_static());
        route.protocol = RouteProtocol::Bgp;
        assert!(!route.is_non_recursive_static());
    }
}
