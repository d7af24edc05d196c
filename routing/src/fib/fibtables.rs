// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The FIBs of every node and VRF of a network

use concurrency::map_keyed;
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{debug, info};

use crate::errors::RoutingError;
use crate::fib::fibtable::Fib;
use crate::fib::resolver::{FibParams, ResolutionRestriction, ResolutionWarning, build_fib};
use crate::rib::Rib;

/// Per node, per VRF routing tables.
pub type RibTables = BTreeMap<String, BTreeMap<String, Rib>>;

/// A [`ResolutionWarning`] with the node and VRF it was found in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeWarning {
    pub node: String,
    pub vrf: String,
    pub warning: ResolutionWarning,
}

impl Display for NodeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}: {}", self.node, self.vrf, self.warning)
    }
}

/// Per node, per VRF forwarding tables.
#[derive(Debug, Clone, Default)]
pub struct FibTables {
    fibs: BTreeMap<String, BTreeMap<String, Fib>>,
    warnings: Vec<NodeWarning>,
}

impl FibTables {
    #[must_use]
    pub fn get_fib(&self, node: &str, vrf: &str) -> Option<&Fib> {
        self.fibs.get(node).and_then(|vrfs| vrfs.get(vrf))
    }

    #[must_use]
    pub fn node_fibs(&self, node: &str) -> Option<&BTreeMap<String, Fib>> {
        self.fibs.get(node)
    }

    /// Iterate over `(node, vrf, fib)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Fib)> {
        self.fibs.iter().flat_map(|(node, vrfs)| {
            vrfs.iter()
                .map(move |(vrf, fib)| (node.as_str(), vrf.as_str(), fib))
        })
    }

    #[must_use]
    pub fn warnings(&self) -> &[NodeWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fibs.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type NodeFibs = (BTreeMap<String, Fib>, Vec<NodeWarning>);

fn build_node_fibs<R>(
    node: &str,
    ribs: &BTreeMap<String, Rib>,
    restriction: &R,
    params: &FibParams,
) -> Result<NodeFibs, RoutingError>
where
    R: ResolutionRestriction + ?Sized,
{
    let mut fibs = BTreeMap::new();
    let mut warnings = vec![];
    for (vrf, rib) in ribs {
        let build = build_fib(rib, restriction, params)?;
        warnings.extend(build.warnings.into_iter().map(|warning| NodeWarning {
            node: node.to_owned(),
            vrf: vrf.clone(),
            warning,
        }));
        fibs.insert(vrf.clone(), build.fib);
    }
    debug!("Built {} fibs for node {node}", fibs.len());
    Ok((fibs, warnings))
}

/// Build the FIB of every node and VRF.
///
/// Nodes are independent, so with [`FibParams::parallel`] they are split across scoped worker
/// threads. The result does not depend on the split.
///
/// # Errors
///
/// Fails with the first [`RoutingError`] of any FIB build.
pub fn build_fibs<R>(
    ribs: &RibTables,
    restriction: &R,
    params: &FibParams,
) -> Result<FibTables, RoutingError>
where
    R: ResolutionRestriction + ?Sized,
{
    let built = map_keyed(ribs, params.parallel, |node, vrfs| {
        build_node_fibs(node, vrfs, restriction, params)
    })?;

    let mut tables = FibTables::default();
    for (node, (fibs, warnings)) in built {
        tables.fibs.insert(node, fibs);
        tables.warnings.extend(warnings);
    }
    info!(
        "Built {} fibs for {} nodes ({} warnings)",
        tables.len(),
        tables.fibs.len(),
        tables.warnings.len()
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fib::fibobjects::FibAction;
    use crate::fib::resolver::{FibParamsBuilder, any_route};
    use crate::rib::route::Route;
    use lpm::prefix::Prefix;
    use std::net::Ipv4Addr;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn ribs(num_nodes: u8) -> RibTables {
        (0..num_nodes)
            .map(|n| {
                let rib = Rib::from_routes([
                    Route::connected(Prefix::from(format!("10.{n}.0.0/24").as_str()), "eth0"),
                    Route::static_via(Prefix::ROOT, ip(&format!("10.{n}.0.1"))),
                    Route::static_via(Prefix::from("192.168.0.0/16"), ip("192.168.0.1")),
                ]);
                let vrfs = BTreeMap::from([
                    ("default".to_string(), rib),
                    ("empty".to_string(), Rib::default()),
                ]);
                (format!("node{n}"), vrfs)
            })
            .collect()
    }

    #[test]
    fn test_build_fibs_sequential_and_parallel_agree() {
        let ribs = ribs(9);
        let sequential = FibParamsBuilder::default().parallel(false).build().unwrap();
        let seq = build_fibs(&ribs, &any_route, &sequential).unwrap();
        let par = build_fibs(&ribs, &any_route, &FibParams::default()).unwrap();

        assert_eq!(seq.len(), 18);
        assert_eq!(par.len(), 18);
        for (node, vrf, fib) in seq.iter() {
            let other = par.get_fib(node, vrf).unwrap();
            assert_eq!(fib.all_entries(), other.all_entries());
        }
        assert_eq!(seq.warnings(), par.warnings());
    }

    #[test]
    fn test_warnings_are_tagged() {
        let tables = build_fibs(&ribs(2), &any_route, &FibParams::default()).unwrap();
        // the 192.168.0.0/16 route resolves via itself
        assert_eq!(tables.warnings().len(), 2);
        let warning = &tables.warnings()[0];
        assert_eq!(warning.node, "node0");
        assert_eq!(warning.vrf, "default");
        assert!(warning.to_string().starts_with("node0/default: "));

        let fib = tables.get_fib("node1", "default").unwrap();
        assert_eq!(
            fib.get(ip("8.8.8.8")).first().map(|e| e.action().clone()),
            Some(FibAction::forward(Some(ip("10.1.0.1")), "eth0"))
        );
        // no fallback to the default route for the unresolved /16
        assert!(fib.get(ip("192.168.3.3")).is_empty());
        assert!(tables.get_fib("node1", "empty").unwrap().is_empty());
        assert!(tables.get_fib("node2", "default").is_none());
        assert_eq!(tables.node_fibs("node0").map(BTreeMap::len), Some(2));
    }
}
