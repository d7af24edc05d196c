// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Routes, RIBs and the recursive resolution of RIBs into FIBs.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod display;
mod errors;
pub mod fib;
pub mod rib;
pub mod vni;

// re-exports
pub use errors::RoutingError;
pub use fib::fibobjects::{FibAction, FibEntry};
pub use fib::fibtable::Fib;
pub use fib::fibtables::{FibTables, NodeWarning, RibTables, build_fibs};
pub use fib::resolver::{
    FibBuild, FibParams, FibParamsBuilder, MAX_DEPTH, ResolutionRestriction, ResolutionWarning,
    any_route, build_fib, is_vtep_interface, no_default_route, vtep_interface_name,
};
pub use lpm::prefix;
pub use rib::Rib;
pub use rib::route::{NextHop, Route, RouteBuilder, RouteProtocol};
pub use vni::Vni;
