// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The forwarding table of one VRF

use lpm::prefix::Prefix;
use lpm::trie::PrefixTrieMultiMap;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::fib::fibobjects::{FibAction, FibEntry};

static NO_ENTRIES: BTreeSet<FibEntry> = BTreeSet::new();

/// A forwarding table: network prefixes mapped to the [`FibEntry`]s resolved for them.
///
/// Every forwarding network of the RIB is present, including those that resolved to no entry.
#[derive(Debug, Clone, Default)]
pub struct Fib {
    entries: PrefixTrieMultiMap<FibEntry>,
    /// Forwarding networks of the RIB, resolved or not.
    networks: PrefixTrieMultiMap<()>,
    all_entries: BTreeSet<FibEntry>,
}

impl Fib {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Install the entries resolved for `network`. An empty set still shadows shorter prefixes.
    pub(crate) fn insert(&mut self, network: Prefix, entries: BTreeSet<FibEntry>) {
        self.networks.put(network, ());
        self.all_entries.extend(entries.iter().cloned());
        self.entries.put_all(network, entries);
    }

    /// The entries of the longest forwarding network covering `addr`. Empty if no network
    /// does, or if that network did not resolve.
    #[must_use]
    pub fn get(&self, addr: Ipv4Addr) -> &BTreeSet<FibEntry> {
        self.networks
            .longest_prefix_match(addr, Prefix::MAX_LEN)
            .and_then(|(network, _)| self.entries.get(&network))
            .unwrap_or(&NO_ENTRIES)
    }

    /// Every entry of the table.
    #[must_use]
    pub fn all_entries(&self) -> &BTreeSet<FibEntry> {
        &self.all_entries
    }

    /// Every network with its entries.
    #[must_use]
    pub fn entries(&self) -> Vec<(Prefix, &BTreeSet<FibEntry>)> {
        self.entries.entries()
    }

    /// Whether `network` is a forwarding network of the table, resolved or not.
    #[must_use]
    pub fn has_network(&self, network: &Prefix) -> bool {
        self.networks.get(network).is_some()
    }

    /// The entries installed for exactly `network`.
    #[must_use]
    pub fn entries_for(&self, network: &Prefix) -> Option<&BTreeSet<FibEntry>> {
        self.entries.get(network)
    }

    /// Networks with at least one entry performing `action`.
    pub fn networks_with_action<'a>(
        &'a self,
        mut accept: impl FnMut(&FibAction) -> bool + 'a,
    ) -> impl Iterator<Item = Prefix> + 'a {
        self.entries()
            .into_iter()
            .filter(move |(_, entries)| entries.iter().any(|e| accept(e.action())))
            .map(|(prefix, _)| prefix)
    }

    /// Number of distinct entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.all_entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_entries.is_empty()
    }
}
