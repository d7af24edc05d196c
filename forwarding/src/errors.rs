// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors aborting the computation of a data plane

use config::ConfigError;
use lpm::prefix::Prefix;
use routing::RoutingError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForwardingError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Routes of node '{node}' have no configuration")]
    UnknownNode { node: String },

    #[error("Configuration of '{hostname}' is stored under key '{key}'")]
    HostnameMismatch { key: String, hostname: String },

    #[error("Fib of {node}/{vrf} forwards out of unknown interface '{interface}'")]
    UnknownInterface {
        node: String,
        vrf: String,
        interface: String,
    },

    #[error("Rib of {node}/{vrf} has no matching addresses for network {network}")]
    MissingMatchingIps {
        node: String,
        vrf: String,
        network: Prefix,
    },

    #[error("Fib of {node}/{vrf} has no rib")]
    MissingRib { node: String, vrf: String },
}
