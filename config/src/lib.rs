// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration model of the devices of a network: interfaces, their addresses and VRFs.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod device;
pub mod errors;
pub mod interface;

pub use device::Configuration; // re-export
pub use errors::{ConfigError, ConfigResult, stringify}; // re-export
pub use interface::{DEFAULT_VRF, Interface, InterfaceAddress}; // re-export

use tracectl::trace_target;
trace_target!("config", LevelFilter::INFO, &["management"]);
