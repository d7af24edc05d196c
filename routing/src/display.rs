// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Module that implements Display for routing objects

use crate::fib::fibobjects::{FibAction, FibEntry};
use crate::fib::fibtable::Fib;
use crate::fib::fibtables::FibTables;
use crate::rib::Rib;
use crate::rib::route::{NextHop, Route, RouteProtocol};
use std::fmt::Display;

const LINE_WIDTH: usize = 81;

struct Frame(String);
impl Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.0.len() + 2;
        writeln!(f, "\n┏{:━<width$}┓", "━", width = len)?;
        writeln!(f, "┃ {} ┃", self.0)?;
        writeln!(f, "┗{:━<width$}┛", "━", width = len)
    }
}

struct Heading(String);
impl Display for Heading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = LINE_WIDTH.saturating_sub(self.0.len() + 2) / 2;
        write!(f, " {0:─<width$}", "─", width = len)?;
        write!(f, " {} ", self.0)?;
        writeln!(f, " {0:─<width$}", "─", width = len)
    }
}

fn line(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(f, " {0:─<width$}", "─", width = LINE_WIDTH)
}

impl Display for RouteProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RouteProtocol::Local => "local",
            RouteProtocol::Connected => "connected",
            RouteProtocol::Static => "static",
            RouteProtocol::Ospf => "ospf",
            RouteProtocol::Isis => "isis",
            RouteProtocol::Bgp => "bgp",
            RouteProtocol::Ibgp => "ibgp",
            RouteProtocol::Aggregate => "aggregate",
            RouteProtocol::Other => "other",
        };
        f.pad(name)
    }
}

impl Display for NextHop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NextHop::Ip(ip) => write!(f, "via {ip}"),
            NextHop::Interface { name, ip: None } => write!(f, "dev {name}"),
            NextHop::Interface { name, ip: Some(ip) } => write!(f, "via {ip} dev {name}"),
            NextHop::Discard => write!(f, "discard"),
            NextHop::Vrf { name, ip: None } => write!(f, "vrf {name}"),
            NextHop::Vrf { name, ip: Some(ip) } => write!(f, "via {ip} vrf {name}"),
            NextHop::Vtep { vni, ip } => write!(f, "vtep {ip} vni {vni}"),
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}/{}] {}",
            self.network, self.protocol, self.admin_cost, self.metric, self.next_hop
        )?;
        if let Some(tag) = self.tag {
            write!(f, " tag {tag}")?;
        }
        if self.non_forwarding {
            write!(f, " (non-forwarding)")?;
        }
        Ok(())
    }
}

impl Display for Rib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Heading(format!("Routes ({})", self.num_routes())).fmt(f)?;
        for (_, route) in self.routes() {
            writeln!(f, "  {route}")?;
        }
        line(f)
    }
}

impl Display for FibAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FibAction::Forward {
                next_hop_ip: Some(ip),
                interface,
            } => write!(f, "forward via {ip} dev {interface}"),
            FibAction::Forward {
                next_hop_ip: None,
                interface,
            } => write!(f, "forward dev {interface}"),
            FibAction::NullRoute => write!(f, "drop"),
            FibAction::NextVrf { vrf, ip: None } => write!(f, "lookup vrf {vrf}"),
            FibAction::NextVrf { vrf, ip: Some(ip) } => write!(f, "lookup {ip} in vrf {vrf}"),
        }
    }
}

impl Display for FibEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.action())?;
        for step in self.resolution_steps() {
            write!(f, "\n        <- {step}")?;
        }
        Ok(())
    }
}

impl Display for Fib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries();
        Heading(format!("Fib entries ({})", entries.len())).fmt(f)?;
        for (prefix, entries) in entries {
            for entry in entries {
                writeln!(f, "  {prefix:<18} {entry}")?;
            }
        }
        line(f)
    }
}

impl Display for FibTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (node, vrf, fib) in self.iter() {
            Frame(format!("FIB {node} vrf {vrf}")).fmt(f)?;
            fib.fmt(f)?;
        }
        if !self.warnings().is_empty() {
            Heading(format!("Warnings ({})", self.warnings().len())).fmt(f)?;
            for warning in self.warnings() {
                writeln!(f, "  {warning}")?;
            }
        }
        Ok(())
    }
}
