// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Module that contains definitions and methods for fib objects

use std::net::Ipv4Addr;

use crate::rib::route::Route;

/// What a FIB does with a packet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FibAction {
    /// Send the packet out of `interface`. If `next_hop_ip` is `None`, ARP is done for the
    /// destination address of the packet.
    Forward {
        next_hop_ip: Option<Ipv4Addr>,
        interface: String,
    },
    NullRoute,
    /// Look the packet up again in another VRF.
    NextVrf { vrf: String, ip: Option<Ipv4Addr> },
}

impl FibAction {
    #[must_use]
    pub fn forward(next_hop_ip: Option<Ipv4Addr>, interface: &str) -> Self {
        FibAction::Forward {
            next_hop_ip,
            interface: interface.to_owned(),
        }
    }

    /// The egress interface, for forwarding actions.
    #[must_use]
    pub fn interface(&self) -> Option<&str> {
        match self {
            FibAction::Forward { interface, .. } => Some(interface),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// A `FibEntry` is an action together with the routes that were traversed to find it.
///
/// The resolution steps start with the route that owns the entry and exclude the route that
/// provided the action: a route A resolved via B, itself resolved via a connected route C,
/// has steps `[A, B]`. Entries coming straight from a terminal route have no steps.
pub struct FibEntry {
    action: FibAction,
    resolution_steps: Vec<Route>,
}

impl FibEntry {
    #[must_use]
    pub fn new(action: FibAction, resolution_steps: Vec<Route>) -> Self {
        Self {
            action,
            resolution_steps,
        }
    }
    #[must_use]
    pub fn action(&self) -> &FibAction {
        &self.action
    }
    #[must_use]
    pub fn resolution_steps(&self) -> &[Route] {
        &self.resolution_steps
    }
    /// The route this entry was installed for, if it was resolved recursively.
    #[must_use]
    pub fn top_level_route(&self) -> Option<&Route> {
        self.resolution_steps.first()
    }
}
