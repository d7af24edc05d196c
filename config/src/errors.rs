// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type for configuration / validation failures

use std::net::Ipv4Addr;
use thiserror::Error;

/// The reasons why we may reject a configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing identifier: {0}")]
    MissingIdentifier(&'static str),
    #[error("Interface '{name}' is stored under key '{key}'")]
    InterfaceNameMismatch { key: String, name: String },
    #[error("Interface '{interface}' refers to non-existent VRF '{vrf}'")]
    NoSuchVrf { interface: String, vrf: String },
    #[error("Address {address} is configured on both '{first}' and '{second}'")]
    DuplicateAddress {
        address: Ipv4Addr,
        first: String,
        second: String,
    },

    // Interface addresses
    #[error("Invalid interface address format: {0}")]
    InvalidFormat(String),
    #[error("Invalid IP address interface address: {0}")]
    InvalidIpAddress(String),
    #[error("Invalid mask length in interface address: {0}")]
    InvalidMaskLength(String),
}

/// Result-like type for configurations
pub type ConfigResult = Result<(), ConfigError>;

#[must_use]
pub fn stringify(conf_result: &ConfigResult) -> String {
    match conf_result {
        Ok(()) => "Ok".to_string(),
        Err(e) => format!("FAILED: {e}"),
    }
}
