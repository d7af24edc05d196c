// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tunables of the forwarding analysis

use derive_builder::Builder;
use lpm::prefix::Prefix;
use std::fmt::Display;

#[derive(Builder, Clone, Debug, PartialEq, Eq)]
pub struct AnalysisParams {
    /// Interface subnets longer than this are not host subnets: nothing is delivered to them and
    /// they are never considered to have missing devices.
    #[builder(default = Prefix::MAX_LEN)]
    pub max_host_subnet_len: u8,

    /// Analyse distinct nodes in parallel.
    #[builder(default = true)]
    pub parallel: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            max_host_subnet_len: Prefix::MAX_LEN,
            parallel: true,
        }
    }
}

impl AnalysisParams {
    #[must_use]
    pub fn is_host_subnet(&self, prefix: &Prefix) -> bool {
        prefix.len() <= self.max_host_subnet_len
    }
}

impl Display for AnalysisParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(f, "Analysis params")?;
        writeln!(f, "  max host subnet length : {}", self.max_host_subnet_len)?;
        writeln!(f, "  parallel               : {}", self.parallel)
    }
}
