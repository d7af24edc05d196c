// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link-time registry of log targets.

use crate::LevelFilter;
use linkme::distributed_slice;

/// A log target declared with [`trace_target!`](crate::trace_target).
pub struct LogTarget {
    /// The `tracing` target: the module path of the declaring module.
    pub(crate) target: &'static str,
    /// Short name used to address the target in level configurations.
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
}

impl LogTarget {
    #[must_use]
    pub const fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            target,
            name,
            level,
            tags,
        }
    }
}

#[distributed_slice]
pub static LOG_TARGETS: [LogTarget];

#[macro_export]
/// Declare the log target of the enclosing module with a short name, a default level and tags.
macro_rules! trace_target {
    // The const scope keeps `LOG_TGT` unique per invocation and keeps the imports local.
    ($name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            #[allow(unused_imports)]
            use $crate::LevelFilter;
            use $crate::targets::{LOG_TARGETS, LogTarget};
            use linkme::distributed_slice;

            #[distributed_slice(LOG_TARGETS)]
            static LOG_TGT: LogTarget = LogTarget::new(module_path!(), $name, $level, $tags);
        };
    };
}
