// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::prefix::{IpPrefixCovering, Prefix, ip_bit};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// A trie node. Children are strictly more specific than their parent and branch on the address
/// bit right after the parent's prefix length: 0 goes left, 1 goes right.
#[derive(Debug, Clone)]
pub(crate) struct TrieNode<T> {
    pub(crate) prefix: Prefix,
    pub(crate) elements: BTreeSet<T>,
    pub(crate) left: Option<Box<TrieNode<T>>>,
    pub(crate) right: Option<Box<TrieNode<T>>>,
}

impl<T: Ord> TrieNode<T> {
    pub(crate) fn new(prefix: Prefix) -> Self {
        Self {
            prefix,
            elements: BTreeSet::new(),
            left: None,
            right: None,
        }
    }

    /// The child slot `prefix` would descend into. `prefix` must be covered by and longer
    /// than this node's prefix.
    fn slot_mut(&mut self, prefix: &Prefix) -> &mut Option<Box<Self>> {
        if prefix.bit_at(self.prefix.len()) {
            &mut self.right
        } else {
            &mut self.left
        }
    }

    fn attach(&mut self, child: Box<Self>) {
        if child.prefix.bit_at(self.prefix.len()) {
            self.right = Some(child);
        } else {
            self.left = Some(child);
        }
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = &TrieNode<T>> {
        self.left.iter().chain(self.right.iter()).map(AsRef::as_ref)
    }

    /// The child whose prefix may contain `addr`.
    pub(crate) fn child_toward(&self, addr: Ipv4Addr) -> Option<&TrieNode<T>> {
        if ip_bit(addr, self.prefix.len()) {
            self.right.as_deref()
        } else {
            self.left.as_deref()
        }
    }

    /// Exact lookup of the node for `prefix` in this subtree.
    pub(crate) fn find(&self, prefix: &Prefix) -> Option<&Self> {
        let mut node = self;
        loop {
            if node.prefix == *prefix {
                return Some(node);
            }
            node = node.child_toward(prefix.network())?;
            if !node.prefix.covers(prefix) {
                return None;
            }
        }
    }

    /// Apply `f` to the element set of the node for `prefix`, creating that node first if needed.
    ///
    /// A new node is spliced in where it belongs:
    /// - below a vacant slot;
    /// - above an existing child it covers;
    /// - next to an existing child it diverges from, under a new branching node at their longest
    ///   common prefix.
    pub(crate) fn with_node_mut<R>(
        &mut self,
        prefix: Prefix,
        f: impl FnOnce(&mut BTreeSet<T>) -> R,
    ) -> R {
        if self.prefix == prefix {
            return f(&mut self.elements);
        }
        let slot = self.slot_mut(&prefix);
        match slot {
            Some(child) if child.prefix.covers(&prefix) => child.with_node_mut(prefix, f),
            _ => {
                let mut node = Box::new(TrieNode::new(prefix));
                let result = f(&mut node.elements);
                let replacement = match slot.take() {
                    None => node,
                    Some(existing) if prefix.covers(&existing.prefix) => {
                        node.attach(existing);
                        node
                    }
                    Some(existing) => {
                        let lcp = existing.prefix.longest_common_prefix(&prefix);
                        let mut branch = Box::new(TrieNode::new(lcp));
                        branch.attach(existing);
                        branch.attach(node);
                        branch
                    }
                };
                *slot = Some(replacement);
                result
            }
        }
    }

    /// Apply `f` to the element set of an existing node for `prefix`. Nodes left empty with fewer
    /// than two children are spliced out afterwards. Returns whether `f` reported a change.
    pub(crate) fn modify_existing(
        &mut self,
        prefix: &Prefix,
        f: &mut impl FnMut(&mut BTreeSet<T>) -> bool,
    ) -> bool {
        if self.prefix == *prefix {
            return f(&mut self.elements);
        }
        let slot = self.slot_mut(prefix);
        let modified = match slot {
            Some(child) if child.prefix.covers(prefix) => child.modify_existing(prefix, f),
            _ => false,
        };
        if modified {
            compact(slot);
        }
        modified
    }

    /// Post-order reduction over this subtree.
    pub(crate) fn fold<R, F>(&self, f: &mut F) -> R
    where
        F: FnMut(Prefix, &BTreeSet<T>, Option<R>, Option<R>) -> R,
    {
        let left = self.left.as_ref().map(|node| node.fold(f));
        let right = self.right.as_ref().map(|node| node.fold(f));
        f(self.prefix, &self.elements, left, right)
    }
}

fn compact<T>(slot: &mut Option<Box<TrieNode<T>>>) {
    let Some(node) = slot.take() else {
        return;
    };
    if !node.elements.is_empty() {
        *slot = Some(node);
        return;
    }
    let TrieNode {
        prefix,
        elements,
        left,
        right,
    } = *node;
    *slot = match (left, right) {
        (None, None) => None,
        (Some(child), None) | (None, Some(child)) => Some(child),
        (left, right) => Some(Box::new(TrieNode {
            prefix,
            elements,
            left,
            right,
        })),
    };
}
