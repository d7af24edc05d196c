// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Data plane of a network snapshot: the FIBs of every node and the fate of the packets they
//! forward, from the ARP exchanges on each link to delivery, drops and exits from the network.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod errors;
pub mod owners;
pub mod snapshot;
pub mod topology;

// re-exports
pub use analysis::{
    AnalysisParams, AnalysisParamsBuilder, Disposition, EdgeSpaces, ForwardingAnalysis,
    InterfaceSpaces, NodeInterfaceSpaces, NodeVrfInterfaceSpaces, NodeVrfSpaces,
};
pub use errors::ForwardingError;
pub use owners::IpOwners;
pub use snapshot::{DataPlane, Snapshot};
pub use topology::{Edge, NodeInterfacePair, Topology};

use tracectl::trace_target;
trace_target!("forwarding", LevelFilter::INFO, &["forwarding"]);
