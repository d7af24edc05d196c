// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime control of log levels.
//!
//! Modules declare their log target with [`trace_target!`]; declarations from every linked crate
//! are collected at link time and can then be tuned by name or by tag, e.g. with
//! `default=warn,fib=debug,arp=trace`.

pub mod control;
pub mod display;
pub mod targets;

// re-exports
pub use control::{TargetCfg, TracingConfig, TracingControl, TracingError, get_trace_ctl};
pub use tracing_subscriber::filter::LevelFilter;
