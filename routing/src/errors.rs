// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The error results used by this library.

use derive_builder::UninitializedFieldError;
use lpm::prefix::Prefix;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Resolution of {network} ended at a leaf with an unresolved next-hop")]
    NonTerminalLeaf { network: Prefix },

    #[error("Resolution of {network} revisited a network already on its resolution path")]
    ResolutionLoop { network: Prefix },

    #[error("Invalid route: {0}")]
    InvalidRoute(String),
}

impl From<UninitializedFieldError> for RoutingError {
    fn from(e: UninitializedFieldError) -> Self {
        RoutingError::InvalidRoute(format!("missing {}", e.field_name()))
    }
}
