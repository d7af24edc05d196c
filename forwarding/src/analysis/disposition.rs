// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The fate of packets sent out of an interface for which ARP fails.

use ipspace::IpSpace;
use strum::{Display, EnumIter, IntoStaticStr};

/// What happens to a packet routed out of an interface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Disposition {
    /// Sent to a neighbor that answers ARP for it.
    ForwardedOnEdge,
    NullRouted,
    /// Nobody answers ARP, and no unmodeled device could either.
    NeighborUnreachable,
    /// Delivered to an unmodeled host of the interface subnet.
    DeliveredToSubnet,
    /// Handed to an unmodeled device towards the outside world.
    ExitsNetwork,
    /// Handed to an unmodeled device, but the destination is inside the network.
    InsufficientInfo,
}

/// The ARP failures of one interface, with what the network knows about the addresses involved.
pub(crate) struct ArpFailure<'a> {
    /// Destinations ARPed for directly.
    pub(crate) dest_ip: &'a IpSpace,
    /// Destinations ARPed for through an external next-hop.
    pub(crate) external_next_hop_ip: &'a IpSpace,
    /// Destinations ARPed for through an internal next-hop.
    pub(crate) internal_next_hop_ip: &'a IpSpace,
    pub(crate) host_subnet_ips: &'a IpSpace,
    pub(crate) owned_ips: &'a IpSpace,
    pub(crate) internal_ips: &'a IpSpace,
    pub(crate) missing_devices: bool,
}

impl ArpFailure<'_> {
    fn all(&self) -> IpSpace {
        IpSpace::union_all([
            self.dest_ip.clone(),
            self.external_next_hop_ip.clone(),
            self.internal_next_hop_ip.clone(),
        ])
    }

    pub(crate) fn delivered_to_subnet(&self) -> IpSpace {
        self.dest_ip
            .intersection(self.host_subnet_ips)
            .difference(self.owned_ips)
    }

    pub(crate) fn exits_network(&self) -> IpSpace {
        if !self.missing_devices {
            return IpSpace::Empty;
        }
        self.dest_ip
            .union(self.external_next_hop_ip)
            .difference(self.internal_ips)
    }

    pub(crate) fn insufficient_info(&self) -> IpSpace {
        if !self.missing_devices {
            return IpSpace::Empty;
        }
        let internal_outside_subnet = self.internal_ips.difference(self.host_subnet_ips);
        IpSpace::union_all([
            self.dest_ip.intersection(&internal_outside_subnet),
            self.external_next_hop_ip.intersection(self.internal_ips),
            self.internal_next_hop_ip.clone(),
        ])
    }

    pub(crate) fn neighbor_unreachable(&self) -> IpSpace {
        if !self.missing_devices {
            return self.all().difference(&self.delivered_to_subnet());
        }
        IpSpace::intersection_all([
            self.dest_ip.clone(),
            self.host_subnet_ips.clone(),
            self.owned_ips.clone(),
        ])
    }
}
