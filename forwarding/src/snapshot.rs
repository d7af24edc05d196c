// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A network snapshot and the computation of its data plane.

use config::Configuration;
use routing::{FibParams, FibTables, NodeWarning, ResolutionRestriction, RibTables, build_fibs};
use std::collections::BTreeMap;
use tracing::info;

use crate::analysis::{AnalysisParams, ForwardingAnalysis};
use crate::errors::ForwardingError;
use crate::owners::IpOwners;
use crate::topology::Topology;

/// The inputs of the data plane computation: what every node is configured with, the routes it
/// selected and how the nodes are wired.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// By hostname.
    pub configurations: BTreeMap<String, Configuration>,
    pub ribs: RibTables,
    pub topology: Topology,
}

/// The forwarding state of a snapshot.
#[derive(Debug, Clone)]
pub struct DataPlane {
    pub fibs: FibTables,
    pub owners: IpOwners,
    pub forwarding_analysis: ForwardingAnalysis,
}

impl DataPlane {
    /// Resolution problems that left routes out of the FIBs.
    #[must_use]
    pub fn warnings(&self) -> &[NodeWarning] {
        self.fibs.warnings()
    }
}

impl Snapshot {
    #[must_use]
    pub fn new(
        configurations: impl IntoIterator<Item = Configuration>,
        ribs: RibTables,
        topology: Topology,
    ) -> Self {
        Self {
            configurations: configurations
                .into_iter()
                .map(|config| (config.hostname.clone(), config))
                .collect(),
            ribs,
            topology,
        }
    }

    /// Like [`Snapshot::new`], connecting interfaces that share a subnet.
    #[must_use]
    pub fn with_inferred_topology(
        configurations: impl IntoIterator<Item = Configuration>,
        ribs: RibTables,
    ) -> Self {
        let mut snapshot = Self::new(configurations, ribs, Topology::new());
        snapshot.topology = Topology::infer_layer3(snapshot.configurations.values());
        snapshot
    }

    fn validate(&self) -> Result<(), ForwardingError> {
        for (key, config) in &self.configurations {
            if *key != config.hostname {
                return Err(ForwardingError::HostnameMismatch {
                    key: key.clone(),
                    hostname: config.hostname.clone(),
                });
            }
            config.validate()?;
        }
        Ok(())
    }

    /// Build the FIBs of the snapshot and analyse how they forward.
    ///
    /// # Errors
    ///
    /// Fails on invalid configurations and on any fatal error of FIB resolution or of the
    /// forwarding analysis.
    pub fn compute_data_plane<R>(
        &self,
        restriction: &R,
        fib_params: &FibParams,
        analysis_params: &AnalysisParams,
    ) -> Result<DataPlane, ForwardingError>
    where
        R: ResolutionRestriction + ?Sized,
    {
        self.validate()?;
        let fibs = build_fibs(&self.ribs, restriction, fib_params)?;
        let owners = IpOwners::new(self.configurations.values(), analysis_params);
        let forwarding_analysis = ForwardingAnalysis::new(
            &self.configurations,
            &self.ribs,
            &fibs,
            &self.topology,
            &owners,
            analysis_params,
        )?;
        info!(
            "Computed data plane of {} nodes: {} fibs, {} warnings",
            self.configurations.len(),
            fibs.len(),
            fibs.warnings().len()
        );
        Ok(DataPlane {
            fibs,
            owners,
            forwarding_analysis,
        })
    }
}
