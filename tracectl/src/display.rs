// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display implementations

use crate::control::{TargetCfg, TargetCfgDb};
use std::fmt::Display;

macro_rules! TARGET_FMT {
    () => {
        "{:>48} │ {:>16} │ {:>8} │ {}"
    };
}
fn fmt_target_heading(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(
        f,
        "{}",
        format_args!(TARGET_FMT!(), "TARGET", "NAME", "LEVEL", "TAGS")
    )
}

impl Display for TargetCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            format_args!(
                TARGET_FMT!(),
                self.target,
                self.name,
                self.level,
                self.tags.join(",")
            )
        )
    }
}

impl Display for TargetCfgDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(
            f,
            "                        ──────── Log levels per target ────────"
        )?;
        fmt_target_heading(f)?;
        for cfg in self.targets.values() {
            writeln!(f, "{cfg}")?;
        }
        write!(
            f,
            "{}",
            format_args!(TARGET_FMT!(), "(default)", "--", self.level, "--")
        )
    }
}

pub(crate) struct TargetCfgDbByTag<'a>(pub(crate) &'a TargetCfgDb);
impl Display for TargetCfgDbByTag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(
            f,
            "                            ──────── Log targets by tag ────────"
        )?;
        let db = self.0;
        for tag in db.tags.keys() {
            writeln!(f, " {tag}:")?;
            for cfg in db.tag_targets(tag) {
                writeln!(f, "      {:<48} : {}", cfg.target, cfg.level)?;
            }
        }
        Ok(())
    }
}
