// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Device configuration model: one device of the network

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use tracing::{debug, error};

use crate::interface::{DEFAULT_VRF, Interface};
use crate::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub hostname: String,
    /// VRFs of the device, besides the default VRF which always exists.
    #[serde(default)]
    pub vrfs: BTreeSet<String>,
    /// Interfaces, by name.
    #[serde(default)]
    pub interfaces: BTreeMap<String, Interface>,
}

impl Configuration {
    #[must_use]
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_owned(),
            ..Default::default()
        }
    }
    #[must_use]
    pub fn add_vrf(mut self, vrf: &str) -> Self {
        self.vrfs.insert(vrf.to_owned());
        self
    }
    #[must_use]
    pub fn add_interface(mut self, interface: Interface) -> Self {
        self.interfaces.insert(interface.name.clone(), interface);
        self
    }

    #[must_use]
    pub fn get_interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    #[must_use]
    pub fn has_vrf(&self, vrf: &str) -> bool {
        vrf == DEFAULT_VRF || self.vrfs.contains(vrf)
    }

    /// All VRF names, the default one included.
    pub fn vrf_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(DEFAULT_VRF).chain(
            self.vrfs
                .iter()
                .map(String::as_str)
                .filter(|vrf| *vrf != DEFAULT_VRF),
        )
    }

    pub fn active_interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.values().filter(|i| i.active)
    }

    /// Active interfaces of `vrf`.
    pub fn vrf_interfaces<'a>(&'a self, vrf: &'a str) -> impl Iterator<Item = &'a Interface> {
        self.active_interfaces().filter(move |i| i.vrf == vrf)
    }

    pub fn validate(&self) -> ConfigResult {
        debug!("Validating configuration of '{}'..", self.hostname);
        if self.hostname.is_empty() {
            return Err(ConfigError::MissingIdentifier("Device hostname"));
        }
        let mut owners: BTreeMap<Ipv4Addr, &str> = BTreeMap::new();
        for (key, interface) in &self.interfaces {
            if *key != interface.name {
                return Err(ConfigError::InterfaceNameMismatch {
                    key: key.clone(),
                    name: interface.name.clone(),
                });
            }
            if !self.has_vrf(&interface.vrf) {
                error!(
                    "Interface {} of {} is in unknown vrf {}",
                    interface.name, self.hostname, interface.vrf
                );
                return Err(ConfigError::NoSuchVrf {
                    interface: interface.name.clone(),
                    vrf: interface.vrf.clone(),
                });
            }
            for address in interface.ips() {
                if let Some(first) = owners.insert(address, &interface.name) {
                    return Err(ConfigError::DuplicateAddress {
                        address,
                        first: first.to_owned(),
                        second: interface.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
