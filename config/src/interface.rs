// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Device configuration model: interfaces

use lpm::prefix::Prefix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::ConfigError;

/// Name of the VRF interfaces belong to unless told otherwise.
pub const DEFAULT_VRF: &str = "default";

#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
/// An IPv4 address configured on an interface, with the length of its subnet
pub struct InterfaceAddress {
    pub address: Ipv4Addr,
    pub mask_len: u8,
}

impl InterfaceAddress {
    /// # Errors
    ///
    /// Fails if the mask length exceeds 32.
    pub fn new(address: Ipv4Addr, mask_len: u8) -> Result<Self, ConfigError> {
        if mask_len > Prefix::MAX_LEN {
            return Err(ConfigError::InvalidMaskLength(mask_len.to_string()));
        }
        Ok(Self { address, mask_len })
    }

    /// The subnet the address belongs to.
    #[must_use]
    pub fn prefix(&self) -> Prefix {
        Prefix::containing(self.address, self.mask_len)
            .unwrap_or_else(|_| Prefix::host(self.address))
    }
}

impl Display for InterfaceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.mask_len)
    }
}

impl FromStr for InterfaceAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, mask_len) = s
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidFormat(s.to_owned()))?;
        let address = address
            .parse::<Ipv4Addr>()
            .map_err(|_| ConfigError::InvalidIpAddress(address.to_owned()))?;
        let mask_len = mask_len
            .parse::<u8>()
            .map_err(|_| ConfigError::InvalidMaskLength(mask_len.to_owned()))?;
        InterfaceAddress::new(address, mask_len)
    }
}

impl TryFrom<String> for InterfaceAddress {
    type Error = ConfigError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<InterfaceAddress> for String {
    fn from(address: InterfaceAddress) -> Self {
        address.to_string()
    }
}

fn default_vrf() -> String {
    DEFAULT_VRF.to_owned()
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A network interface configuration
pub struct Interface {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_vrf")]
    pub vrf: String,
    #[serde(default)]
    pub addresses: BTreeSet<InterfaceAddress>,
    /// Answer ARP requests for addresses the interface's VRF can route elsewhere.
    #[serde(default)]
    pub proxy_arp: bool,
    /// Inactive interfaces neither own addresses nor forward.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Interface {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            description: None,
            vrf: default_vrf(),
            addresses: BTreeSet::new(),
            proxy_arp: false,
            active: true,
        }
    }
    #[must_use]
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }
    #[must_use]
    pub fn set_vrf(mut self, vrfname: &str) -> Self {
        self.vrf = vrfname.to_owned();
        self
    }
    #[must_use]
    pub fn add_address(mut self, address: InterfaceAddress) -> Self {
        self.addresses.insert(address);
        self
    }
    #[must_use]
    pub fn set_proxy_arp(mut self, proxy_arp: bool) -> Self {
        self.proxy_arp = proxy_arp;
        self
    }
    #[must_use]
    pub fn set_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// The addresses assigned to the interface.
    pub fn ips(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.addresses.iter().map(|a| a.address)
    }

    /// The subnets the interface is attached to.
    pub fn prefixes(&self) -> impl Iterator<Item = Prefix> + '_ {
        self.addresses.iter().map(InterfaceAddress::prefix)
    }
}
