// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use ordermap::OrderMap;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use thiserror::Error;
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Registry, prelude::*, reload};

use crate::LevelFilter;
use crate::display::TargetCfgDbByTag;
use crate::targets::{LOG_TARGETS, LogTarget};
use crate::trace_target;

trace_target!("tracectl", LevelFilter::INFO, &[]);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TracingError {
    #[error("Invalid level '{0}'")]
    InvalidLevel(String),
    #[error("Invalid syntax '{0}': expected tag=level")]
    Syntax(String),
    #[error("Unknown tag '{0}'")]
    UnknownTag(String),
}

/// Runtime configuration of a log target.
#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub target: &'static str,
    pub name: &'static str,
    pub level: LevelFilter,
    /// Tags of the target. The name is always one of them.
    pub tags: Vec<&'static str>,
}

impl From<&LogTarget> for TargetCfg {
    fn from(decl: &LogTarget) -> Self {
        let mut tags = decl.tags.to_vec();
        if !tags.contains(&decl.name) {
            tags.push(decl.name);
        }
        Self {
            target: decl.target,
            name: decl.name,
            level: decl.level,
            tags,
        }
    }
}

#[derive(Debug)]
pub(crate) struct TargetCfgDb {
    pub(crate) level: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, BTreeSet<&'static str>>,
}

impl TargetCfgDb {
    fn from_registry(level: LevelFilter) -> Self {
        let mut db = Self {
            level,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for decl in LOG_TARGETS {
            db.register(TargetCfg::from(decl));
        }
        db
    }

    fn register(&mut self, cfg: TargetCfg) {
        for tag in &cfg.tags {
            self.tags.entry(*tag).or_default().insert(cfg.target);
        }
        if let Some(previous) = self.targets.insert(cfg.target, cfg) {
            warn!("Log target {} declared more than once", previous.target);
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for cfg in self.targets.values() {
            match format!("{}={}", cfg.target, cfg.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => warn!("Skipping log target {}: {e}", cfg.target),
            }
        }
        filter
    }

    /// Set the level of every target with the given tag. Returns how many targets changed.
    fn set_tag_level(&mut self, tag: &str, level: LevelFilter) -> Result<usize, TracingError> {
        let targets = self
            .tags
            .get(tag)
            .ok_or_else(|| TracingError::UnknownTag(tag.to_string()))?;
        let mut changed = 0;
        for cfg in self.targets.values_mut() {
            if targets.contains(cfg.target) && cfg.level != level {
                cfg.level = level;
                changed += 1;
            }
        }
        Ok(changed)
    }

    pub(crate) fn tag_targets(&self, tag: &str) -> impl Iterator<Item = &TargetCfg> {
        let targets = self.tags.get(tag);
        self.targets
            .values()
            .filter(move |cfg| targets.is_some_and(|t| t.contains(cfg.target)))
    }

    /// A configuration string that reproduces the current levels.
    fn as_config_string(&self) -> String {
        let mut out = format!("default={}", self.level);
        for cfg in self.targets.values() {
            out += &format!(",{}={}", cfg.name, cfg.level);
        }
        out
    }
}

/// Level assignments parsed from `tag=level,...`.
///
/// Two tags are special: `default` sets the level of anything not covered by a target, and
/// `all` sets every target. Other tags are applied afterwards, so `all=info,fib=debug` works.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracingConfig {
    pub default: Option<LevelFilter>,
    pub all: Option<LevelFilter>,
    pub tags: OrderMap<String, LevelFilter>,
}

impl FromStr for TracingConfig {
    type Err = TracingError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut config = TracingConfig::default();
        for item in input.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let (tag, level) = item
                .split_once('=')
                .ok_or_else(|| TracingError::Syntax(item.to_string()))?;
            let level = LevelFilter::from_str(level.trim())
                .map_err(|_| TracingError::InvalidLevel(level.trim().to_string()))?;
            match tag.trim() {
                "default" => config.default = Some(level),
                "all" => config.all = Some(level),
                tag => {
                    config.tags.insert(tag.to_string(), level);
                }
            }
        }
        Ok(config)
    }
}

#[derive(Debug)]
pub struct TracingControl {
    db: Mutex<TargetCfgDb>,
    reload_filter: reload::Handle<EnvFilter, Registry>,
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get the process-wide [`TracingControl`], installing the subscriber on first use.
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}

impl TracingControl {
    fn new() -> Self {
        let db = TargetCfgDb::from_registry(LevelFilter::INFO);
        let (filter, reload_filter) = reload::Layer::new(db.env_filter());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);

        // A subscriber installed by someone else (e.g. a test harness) wins.
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .with(ErrorLayer::default())
            .try_init()
            .is_ok();
        if !installed {
            warn!("A tracing subscriber was already installed: levels will not be reloaded");
        }

        Self {
            db: Mutex::new(db),
            reload_filter,
        }
    }

    fn db(&self) -> MutexGuard<'_, TargetCfgDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reload(&self, db: &TargetCfgDb) {
        if let Err(e) = self.reload_filter.reload(db.env_filter()) {
            warn!("Failed to reload tracing filter: {e}");
        }
    }

    pub fn init() {
        get_trace_ctl();
    }

    /// Set the level of every target carrying `tag`.
    ///
    /// # Errors
    ///
    /// Fails if no target has that tag.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> Result<usize, TracingError> {
        let mut db = self.db();
        let changed = db.set_tag_level(tag, level)?;
        if changed > 0 {
            self.reload(&db);
        }
        info!("Log level for tag '{tag}' set to {level}. Targets changed: {changed}");
        Ok(changed)
    }

    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db();
        for cfg in db.targets.values_mut() {
            cfg.level = level;
        }
        self.reload(&db);
    }

    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db();
        if db.level != level {
            db.level = level;
            info!("Default log level set to {level}");
            self.reload(&db);
        }
    }

    #[must_use]
    pub fn default_level(&self) -> LevelFilter {
        self.db().level
    }

    pub fn apply(&self, config: &TracingConfig) -> Result<(), TracingError> {
        if let Some(level) = config.default {
            self.set_default_level(level);
        }
        if let Some(level) = config.all {
            self.set_level_all(level);
        }
        for (tag, level) in &config.tags {
            self.set_tag_level(tag, *level)?;
        }
        Ok(())
    }

    /// Apply a configuration string such as `default=warn,fib=debug`.
    ///
    /// # Errors
    ///
    /// Fails on malformed input or unknown tags. Nothing is applied if the input does not parse.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TracingError> {
        self.apply(&input.parse()?)
    }

    #[must_use]
    pub fn get_target(&self, target: &str) -> Option<TargetCfg> {
        self.db().targets.get(target).cloned()
    }

    #[must_use]
    pub fn get_targets_by_tag(&self, tag: &str) -> Vec<TargetCfg> {
        self.db().tag_targets(tag).cloned().collect()
    }

    #[must_use]
    pub fn get_tags(&self) -> Vec<String> {
        self.db().tags.keys().map(ToString::to_string).collect()
    }

    pub fn dump(&self) {
        let db = self.db();
        info!("{}", *db);
    }

    pub fn dump_targets_by_tag(&self) {
        let db = self.db();
        info!("{}", TargetCfgDbByTag(&db));
    }

    #[must_use]
    pub fn as_config_string(&self) -> String {
        self.db().as_config_string()
    }
}
