// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A path-compressed binary trie mapping prefixes to sets of values.

mod node;

use crate::prefix::{IpPrefixCovering, Prefix};
use node::TrieNode;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Binary trie keyed by [`Prefix`], holding a set of values per prefix.
///
/// The root always exists and stands for `0.0.0.0/0`. Any other node either holds values or
/// branches into two children, so there are no single-child chains of empty nodes.
#[derive(Debug, Clone)]
pub struct PrefixTrieMultiMap<T> {
    root: TrieNode<T>,
}

impl<T: Ord> Default for PrefixTrieMultiMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> PrefixTrieMultiMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(Prefix::ROOT),
        }
    }

    /// Add `value` to the set stored at `prefix`. Returns true if it was not there yet.
    pub fn put(&mut self, prefix: Prefix, value: T) -> bool {
        self.root
            .with_node_mut(prefix, |elements| elements.insert(value))
    }

    /// Add all `values` to the set stored at `prefix`. Returns true if any of them was new.
    pub fn put_all(&mut self, prefix: Prefix, values: impl IntoIterator<Item = T>) -> bool {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return false;
        }
        self.root.with_node_mut(prefix, |elements| {
            values.fold(false, |modified, value| elements.insert(value) | modified)
        })
    }

    /// Exact match lookup. This does not do LPM.
    #[must_use]
    pub fn get(&self, prefix: &Prefix) -> Option<&BTreeSet<T>> {
        self.root
            .find(prefix)
            .map(|node| &node.elements)
            .filter(|elements| !elements.is_empty())
    }

    /// Longest prefix match of `addr`, ignoring prefixes longer than `max_len`.
    ///
    /// Returns the matching prefix and its values, or `None` if no non-empty prefix covers `addr`.
    #[must_use]
    pub fn longest_prefix_match(
        &self,
        addr: Ipv4Addr,
        max_len: u8,
    ) -> Option<(Prefix, &BTreeSet<T>)> {
        self.deepest_node(addr, max_len, |node| !node.elements.is_empty())
            .map(|node| (node.prefix, &node.elements))
    }

    /// Longest prefix match of `addr` restricted to the values admitted by `admit`: the deepest
    /// prefix covering `addr` with at least one admitted value wins, and only its admitted values
    /// are returned.
    pub fn longest_prefix_match_filtered<F>(
        &self,
        addr: Ipv4Addr,
        max_len: u8,
        admit: F,
    ) -> Option<(Prefix, Vec<&T>)>
    where
        F: Fn(&T) -> bool,
    {
        self.deepest_node(addr, max_len, |node| node.elements.iter().any(&admit))
            .map(|node| {
                let admitted = node.elements.iter().filter(|v| admit(v)).collect();
                (node.prefix, admitted)
            })
    }

    fn deepest_node(
        &self,
        addr: Ipv4Addr,
        max_len: u8,
        accept: impl Fn(&TrieNode<T>) -> bool,
    ) -> Option<&TrieNode<T>> {
        let mut best = None;
        let mut node = Some(&self.root);
        while let Some(current) = node {
            if current.prefix.len() > max_len || !current.prefix.covers(&addr) {
                break;
            }
            if accept(current) {
                best = Some(current);
            }
            node = current.child_toward(addr);
        }
        best
    }

    /// Remove `value` from the set at `prefix`. Returns true if it was there.
    pub fn remove(&mut self, prefix: &Prefix, value: &T) -> bool {
        self.root
            .modify_existing(prefix, &mut |elements| elements.remove(value))
    }

    /// Replace the set at `prefix` with `values`. Returns true if the stored set changed.
    pub fn replace_all(&mut self, prefix: Prefix, values: impl IntoIterator<Item = T>) -> bool {
        let values: BTreeSet<T> = values.into_iter().collect();
        if values.is_empty() {
            return self.root.modify_existing(&prefix, &mut |elements| {
                let modified = !elements.is_empty();
                elements.clear();
                modified
            });
        }
        self.root.with_node_mut(prefix, |elements| {
            let modified = *elements != values;
            *elements = values;
            modified
        })
    }

    pub fn clear(&mut self) {
        self.root = TrieNode::new(Prefix::ROOT);
    }

    /// Post-order reduction over every node of the trie, including empty branching nodes.
    ///
    /// `f` receives a node's prefix, its values, and the results for its left and right subtrees
    /// (`None` where there is no child).
    pub fn fold<R, F>(&self, mut f: F) -> R
    where
        F: FnMut(Prefix, &BTreeSet<T>, Option<R>, Option<R>) -> R,
    {
        self.root.fold(&mut f)
    }

    /// Visit every non-empty entry, in post-order.
    pub fn traverse_entries<F>(&self, mut f: F)
    where
        F: FnMut(Prefix, &BTreeSet<T>),
    {
        self.fold(|prefix, elements, _, _| {
            if !elements.is_empty() {
                f(prefix, elements);
            }
        });
    }

    /// All non-empty entries, in post-order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Prefix, &BTreeSet<T>)> {
        let mut entries = Vec::new();
        let mut stack = vec![(&self.root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                if !node.elements.is_empty() {
                    entries.push((node.prefix, &node.elements));
                }
            } else {
                stack.push((node, true));
                if let Some(right) = node.right.as_deref() {
                    stack.push((right, false));
                }
                if let Some(left) = node.left.as_deref() {
                    stack.push((left, false));
                }
            }
        }
        entries
    }

    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.fold(|_, elements, left, right| {
            elements.len() + left.unwrap_or(0) + right.unwrap_or(0)
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.elements.is_empty() && self.root.children().next().is_none()
    }
}

impl<T: Ord + Clone> PrefixTrieMultiMap<T> {
    /// Union of the values stored at every prefix.
    #[must_use]
    pub fn all_elements(&self) -> BTreeSet<T> {
        let mut all = BTreeSet::new();
        self.traverse_entries(|_, elements| all.extend(elements.iter().cloned()));
        all
    }
}

#[cfg(test)]
#[rustfmt::skip]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn check_node_invariants<T: Ord>(node: &TrieNode<T>, is_root: bool) {
        if !is_root && node.elements.is_empty() {
            assert!(node.left.is_some() && node.right.is_some(), "{} is a useless empty node", node.prefix);
        }
        if let Some(left) = node.left.as_deref() {
            assert!(left.prefix.len() > node.prefix.len());
            assert!(node.prefix.covers(&left.prefix));
            assert!(!left.prefix.bit_at(node.prefix.len()));
            check_node_invariants(left, false);
        }
        if let Some(right) = node.right.as_deref() {
            assert!(right.prefix.len() > node.prefix.len());
            assert!(node.prefix.covers(&right.prefix));
            assert!(right.prefix.bit_at(node.prefix.len()));
            check_node_invariants(right, false);
        }
    }

    fn check_invariants<T: Ord>(trie: &PrefixTrieMultiMap<T>) {
        assert_eq!(trie.root.prefix, Prefix::ROOT);
        check_node_invariants(&trie.root, true);
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_put_get() {
        let mut trie = PrefixTrieMultiMap::new();
        assert!(trie.is_empty());
        assert!(trie.put("10.0.0.0/8".into(), 1));
        assert!(trie.put("10.0.0.0/8".into(), 2));
        assert!(!trie.put("10.0.0.0/8".into(), 2));
        assert!(trie.put("10.1.0.0/16".into(), 3));
        assert!(!trie.is_empty());

        assert_eq!(trie.get(&"10.0.0.0/8".into()), Some(&BTreeSet::from([1, 2])));
        assert_eq!(trie.get(&"10.1.0.0/16".into()), Some(&BTreeSet::from([3])));
        // exact match only
        assert_eq!(trie.get(&"10.1.1.0/24".into()), None);
        assert_eq!(trie.get(&"0.0.0.0/0".into()), None);
        assert_eq!(trie.num_elements(), 3);
        check_invariants(&trie);
    }

    #[test]
    fn test_put_all() {
        let mut trie = PrefixTrieMultiMap::new();
        assert!(!trie.put_all("10.0.0.0/8".into(), Vec::<u32>::new()));
        assert!(trie.is_empty());
        assert!(trie.put_all("10.0.0.0/8".into(), [1, 2, 3]));
        assert!(!trie.put_all("10.0.0.0/8".into(), [1, 2]));
        assert_eq!(trie.all_elements(), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_path_compression() {
        let mut trie = PrefixTrieMultiMap::new();
        trie.put("10.0.0.0/24".into(), "a");
        trie.put("10.0.1.0/24".into(), "b");

        // a single branching node at the longest common prefix of both
        let branch = trie.root.left.as_deref().unwrap();
        assert!(trie.root.right.is_none());
        assert_eq!(branch.prefix, Prefix::from("10.0.0.0/23"));
        assert!(branch.elements.is_empty());
        assert_eq!(branch.left.as_deref().unwrap().prefix, Prefix::from("10.0.0.0/24"));
        assert_eq!(branch.right.as_deref().unwrap().prefix, Prefix::from("10.0.1.0/24"));
        check_invariants(&trie);

        // new node that covers an existing one goes above it
        trie.put("10.0.0.0/8".into(), "c");
        assert_eq!(trie.root.left.as_deref().unwrap().prefix, Prefix::from("10.0.0.0/8"));
        check_invariants(&trie);

        // the branching node itself gets a value
        trie.put("10.0.0.0/23".into(), "d");
        assert_eq!(trie.get(&"10.0.0.0/23".into()), Some(&BTreeSet::from(["d"])));
        trie.put("192.168.0.0/16".into(), "e");
        trie.put("0.0.0.0/0".into(), "default");
        check_invariants(&trie);
        assert_eq!(trie.entries().len(), 6);
    }

    #[test]
    fn test_longest_prefix_match() {
        let mut trie = PrefixTrieMultiMap::new();
        trie.put("0.0.0.0/0".into(), 0);
        trie.put("10.0.0.0/8".into(), 8);
        trie.put("10.1.0.0/16".into(), 16);
        trie.put("10.1.1.0/24".into(), 24);
        trie.put("10.1.1.1/32".into(), 32);

        let lpm = |addr: &str, max_len: u8| trie.longest_prefix_match(ip(addr), max_len).map(|(p, v)| (p.to_string(), v.clone()));
        assert_eq!(lpm("10.1.1.1", 32), Some(("10.1.1.1/32".to_string(), BTreeSet::from([32]))));
        assert_eq!(lpm("10.1.1.2", 32), Some(("10.1.1.0/24".to_string(), BTreeSet::from([24]))));
        assert_eq!(lpm("10.1.2.2", 32), Some(("10.1.0.0/16".to_string(), BTreeSet::from([16]))));
        assert_eq!(lpm("10.2.2.2", 32), Some(("10.0.0.0/8".to_string(), BTreeSet::from([8]))));
        assert_eq!(lpm("11.0.0.1", 32), Some(("0.0.0.0/0".to_string(), BTreeSet::from([0]))));
        // bounded
        assert_eq!(lpm("10.1.1.1", 31), Some(("10.1.1.0/24".to_string(), BTreeSet::from([24]))));
        assert_eq!(lpm("10.1.1.1", 8), Some(("10.0.0.0/8".to_string(), BTreeSet::from([8]))));
        assert_eq!(lpm("10.1.1.1", 0), Some(("0.0.0.0/0".to_string(), BTreeSet::from([0]))));
    }

    #[test]
    fn test_longest_prefix_match_skips_empty_branching_nodes() {
        let mut trie = PrefixTrieMultiMap::new();
        trie.put("10.0.0.0/24".into(), 1);
        trie.put("10.0.1.0/24".into(), 2);
        // 10.0.0.0/23 exists in the trie but holds no value
        assert!(trie.longest_prefix_match(ip("10.0.2.1"), 32).is_none());
        assert!(trie.longest_prefix_match(ip("10.0.1.1"), 23).is_none());
    }

    #[test]
    fn test_longest_prefix_match_filtered() {
        let mut trie = PrefixTrieMultiMap::new();
        trie.put("10.0.0.0/8".into(), 1);
        trie.put("10.0.0.0/8".into(), 3);
        trie.put("10.1.0.0/16".into(), 2);
        trie.put("10.1.0.0/16".into(), 4);

        let odd = |v: &u32| v % 2 == 1;
        let (prefix, values) = trie.longest_prefix_match_filtered(ip("10.1.0.1"), 32, odd).unwrap();
        assert_eq!(prefix, Prefix::from("10.0.0.0/8"));
        assert_eq!(values, vec![&1, &3]);

        let even = |v: &u32| v % 2 == 0;
        let (prefix, values) = trie.longest_prefix_match_filtered(ip("10.1.0.1"), 32, even).unwrap();
        assert_eq!(prefix, Prefix::from("10.1.0.0/16"));
        assert_eq!(values, vec![&2, &4]);

        assert!(trie.longest_prefix_match_filtered(ip("10.1.0.1"), 32, |v| *v > 10).is_none());
    }

    #[test]
    fn test_remove_and_replace() {
        let mut trie = PrefixTrieMultiMap::new();
        trie.put("10.0.0.0/24".into(), 1);
        trie.put("10.0.1.0/24".into(), 2);
        trie.put("10.0.1.0/24".into(), 3);

        assert!(!trie.remove(&"10.0.2.0/24".into(), &1));
        assert!(!trie.remove(&"10.0.0.0/24".into(), &2));
        assert!(trie.remove(&"10.0.0.0/24".into(), &1));
        assert_eq!(trie.get(&"10.0.0.0/24".into()), None);
        check_invariants(&trie);
        // the branching node collapsed
        assert_eq!(trie.root.left.as_deref().unwrap().prefix, Prefix::from("10.0.1.0/24"));

        assert!(trie.replace_all("10.0.1.0/24".into(), [7]));
        assert!(!trie.replace_all("10.0.1.0/24".into(), [7]));
        assert_eq!(trie.get(&"10.0.1.0/24".into()), Some(&BTreeSet::from([7])));
        assert!(trie.replace_all("10.0.1.0/24".into(), []));
        assert!(trie.is_empty());

        trie.put("10.0.0.0/8".into(), 1);
        trie.clear();
        assert!(trie.is_empty());
        assert!(trie.longest_prefix_match(ip("10.0.0.1"), 32).is_none());
    }

    #[test]
    fn test_fold_is_post_order() {
        let mut trie = PrefixTrieMultiMap::new();
        trie.put("10.0.0.0/8".into(), 'a');
        trie.put("10.0.0.0/24".into(), 'b');
        trie.put("10.0.1.0/24".into(), 'c');

        let order = trie.fold(|prefix, _, left: Option<Vec<String>>, right: Option<Vec<String>>| {
            let mut order = left.unwrap_or_default();
            order.extend(right.unwrap_or_default());
            order.push(prefix.to_string());
            order
        });
        assert_eq!(order, vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.0.0/23", "10.0.0.0/8", "0.0.0.0/0"]);

        let mut visited = vec![];
        trie.traverse_entries(|prefix, _| visited.push(prefix.to_string()));
        assert_eq!(visited, vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.0.0/8"]);
        let entries: Vec<String> = trie.entries().iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(entries, visited);
    }

    #[test]
    fn test_round_trip() {
        bolero::check!()
            .with_type::<Vec<(Prefix, u8)>>()
            .for_each(|entries| {
                let mut trie = PrefixTrieMultiMap::new();
                for (prefix, value) in entries {
                    trie.put(*prefix, *value);
                }
                check_invariants(&trie);
                for (prefix, value) in entries {
                    assert!(trie.get(prefix).is_some_and(|values| values.contains(value)));
                    for addr in [prefix.network(), prefix.last_address()] {
                        let (best, values) = trie.longest_prefix_match(addr, Prefix::MAX_LEN).unwrap();
                        assert!(best.covers(&addr));
                        assert!(best.len() >= prefix.len());
                        assert!(!values.is_empty());
                        // no longer inserted prefix covers the address
                        assert!(!entries.iter().any(|(p, _)| p.len() > best.len() && p.covers(&addr)));
                    }
                }
                let all: BTreeSet<u8> = entries.iter().map(|(_, v)| *v).collect();
                assert_eq!(trie.all_elements(), all);
            });
    }
}
