// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv4 prefixes and a path-compressed binary trie keyed by them, used for
//! longest prefix match (LPM) over routing and forwarding tables.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::similar_names)]

pub mod prefix;
pub mod trie;

pub use prefix::{IpPrefixCovering, Prefix, PrefixError};
pub use trie::PrefixTrieMultiMap;
