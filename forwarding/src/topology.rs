// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Layer-3 adjacencies between the interfaces of the network

use config::Configuration;
use lpm::prefix::Prefix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::debug;

static NO_NEIGHBORS: BTreeSet<NodeInterfacePair> = BTreeSet::new();

/// An interface of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeInterfacePair {
    pub node: String,
    pub interface: String,
}

impl NodeInterfacePair {
    #[must_use]
    pub fn new(node: &str, interface: &str) -> Self {
        Self {
            node: node.to_owned(),
            interface: interface.to_owned(),
        }
    }
}

impl Display for NodeInterfacePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node, self.interface)
    }
}

/// A directed adjacency: packets sent out of `tail` are received on `head`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub tail: NodeInterfacePair,
    pub head: NodeInterfacePair,
}

impl Edge {
    #[must_use]
    pub fn new(node1: &str, interface1: &str, node2: &str, interface2: &str) -> Self {
        Self {
            tail: NodeInterfacePair::new(node1, interface1),
            head: NodeInterfacePair::new(node2, interface2),
        }
    }
    #[must_use]
    pub fn reverse(&self) -> Self {
        Self {
            tail: self.head.clone(),
            head: self.tail.clone(),
        }
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.tail, self.head)
    }
}

/// The set of edges of the network, indexed by their tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Edge>", into = "Vec<Edge>")]
pub struct Topology {
    edges: BTreeSet<Edge>,
    neighbors: BTreeMap<NodeInterfacePair, BTreeSet<NodeInterfacePair>>,
}

impl Topology {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge. Returns false if the topology already had it.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        self.neighbors
            .entry(edge.tail.clone())
            .or_default()
            .insert(edge.head.clone());
        self.edges.insert(edge)
    }

    /// Add an edge and its reverse.
    pub fn add_link(&mut self, edge: Edge) {
        self.add_edge(edge.reverse());
        self.add_edge(edge);
    }

    #[must_use]
    pub fn edges(&self) -> &BTreeSet<Edge> {
        &self.edges
    }

    /// The interfaces receiving what `tail` sends.
    #[must_use]
    pub fn neighbors(&self, tail: &NodeInterfacePair) -> &BTreeSet<NodeInterfacePair> {
        self.neighbors.get(tail).unwrap_or(&NO_NEIGHBORS)
    }

    /// The edges leaving `tail`.
    pub fn interface_edges<'a>(
        &'a self,
        tail: &'a NodeInterfacePair,
    ) -> impl Iterator<Item = Edge> + 'a {
        self.neighbors(tail).iter().map(move |head| Edge {
            tail: tail.clone(),
            head: head.clone(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Infer a layer-3 topology: the active interfaces of distinct nodes whose addresses lie in
    /// the same subnet are connected both ways.
    #[must_use]
    pub fn infer_layer3<'a>(configurations: impl IntoIterator<Item = &'a Configuration>) -> Self {
        let mut by_subnet: BTreeMap<Prefix, BTreeSet<NodeInterfacePair>> = BTreeMap::new();
        for config in configurations {
            for interface in config.active_interfaces() {
                for prefix in interface.prefixes() {
                    by_subnet
                        .entry(prefix)
                        .or_default()
                        .insert(NodeInterfacePair::new(&config.hostname, &interface.name));
                }
            }
        }
        let mut topology = Topology::new();
        for (subnet, members) in &by_subnet {
            for tail in members {
                for head in members.iter().filter(|head| head.node != tail.node) {
                    topology.add_edge(Edge {
                        tail: tail.clone(),
                        head: head.clone(),
                    });
                }
            }
            if members.len() > 1 {
                debug!("Subnet {subnet} connects {} interfaces", members.len());
            }
        }
        topology
    }
}

impl FromIterator<Edge> for Topology {
    fn from_iter<I: IntoIterator<Item = Edge>>(edges: I) -> Self {
        let mut topology = Topology::new();
        for edge in edges {
            topology.add_edge(edge);
        }
        topology
    }
}

impl From<Vec<Edge>> for Topology {
    fn from(edges: Vec<Edge>) -> Self {
        edges.into_iter().collect()
    }
}

impl From<Topology> for Vec<Edge> {
    fn from(topology: Topology) -> Self {
        topology.edges.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Interface, InterfaceAddress};
    use pretty_assertions::assert_eq;

    fn iface(name: &str, address: &str) -> Interface {
        Interface::new(name).add_address(address.parse::<InterfaceAddress>().unwrap())
    }

    #[test]
    fn test_neighbors() {
        let mut topology = Topology::new();
        topology.add_link(Edge::new("r1", "eth0", "r2", "eth0"));
        assert!(topology.add_edge(Edge::new("r1", "eth0", "r3", "eth1")));
        assert!(!topology.add_edge(Edge::new("r1", "eth0", "r3", "eth1")));
        assert_eq!(topology.len(), 3);

        let r1 = NodeInterfacePair::new("r1", "eth0");
        let heads: Vec<String> = topology.neighbors(&r1).iter().map(ToString::to_string).collect();
        assert_eq!(heads, vec!["r2:eth0", "r3:eth1"]);
        assert_eq!(topology.interface_edges(&r1).count(), 2);
        assert!(topology.neighbors(&NodeInterfacePair::new("r3", "eth1")).is_empty());
        assert_eq!(
            Edge::new("r1", "eth0", "r2", "eth0").to_string(),
            "r1:eth0 -> r2:eth0"
        );
    }

    #[test]
    fn test_infer_layer3() {
        let r1 = Configuration::new("r1")
            .add_interface(iface("eth0", "10.0.0.1/24"))
            .add_interface(iface("eth1", "10.1.0.1/24"));
        let r2 = Configuration::new("r2")
            .add_interface(iface("eth0", "10.0.0.2/24"))
            .add_interface(iface("eth1", "10.1.0.2/24").set_active(false));
        let r3 = Configuration::new("r3").add_interface(iface("ge0", "10.0.0.3/24"));

        let topology = Topology::infer_layer3([&r1, &r2, &r3]);
        assert_eq!(topology.len(), 6);
        assert!(topology.edges().contains(&Edge::new("r1", "eth0", "r3", "ge0")));
        assert!(topology.edges().contains(&Edge::new("r3", "ge0", "r2", "eth0")));
        // inactive interfaces are not connected
        assert!(topology.neighbors(&NodeInterfacePair::new("r1", "eth1")).is_empty());
    }

    #[test]
    fn test_topology_from_yaml() {
        let yaml = r"
- tail: { node: r1, interface: eth0 }
  head: { node: r2, interface: eth1 }
- tail: { node: r2, interface: eth1 }
  head: { node: r1, interface: eth0 }
";
        let topology: Topology = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(topology.len(), 2);
        assert_eq!(
            topology.neighbors(&NodeInterfacePair::new("r2", "eth1")),
            &BTreeSet::from([NodeInterfacePair::new("r1", "eth0")])
        );
        let back = serde_yaml_ng::to_string(&topology).unwrap();
        let again: Topology = serde_yaml_ng::from_str(&back).unwrap();
        assert_eq!(again, topology);
    }
}
