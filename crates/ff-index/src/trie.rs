//! Character trie over normalized file names.
//!
//! The trie answers two questions for the search engine: "which records have
//! exactly this name" (terminal id set) and "which records have a name with
//! this prefix" (subtree collection). Both run in time proportional to the
//! query length plus the result size, never the index size.

use ff_core::{FileId, FxHashMap, FxHashSet};

/// One trie node: children keyed by character plus the ids whose name ends
/// here.
#[derive(Debug, Default)]
struct TrieNode {
    children: FxHashMap<char, TrieNode>,
    ids: FxHashSet<FileId>,
}

impl TrieNode {
    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.ids.is_empty()
    }
}

/// A trie mapping normalized names to record id sets.
///
/// # Examples
///
/// ```ignore
/// let mut trie = NameTrie::new();
/// trie.insert("report", FileId::new(1));
/// assert!(trie.ids_with_prefix("rep").contains(&FileId::new(1)));
/// ```
#[derive(Debug, Default)]
pub struct NameTrie {
    root: TrieNode,
    node_count: usize,
}

impl NameTrie {
    /// Creates an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `id` under `name`, creating nodes as needed.
    pub fn insert(&mut self, name: &str, id: FileId) {
        let mut node = &mut self.root;
        for ch in name.chars() {
            let created = !node.children.contains_key(&ch);
            node = node.children.entry(ch).or_default();
            if created {
                self.node_count += 1;
            }
        }
        node.ids.insert(id);
    }

    /// Removes `id` from under `name`, pruning nodes left empty.
    ///
    /// Removing a (name, id) pair that was never inserted is a no-op.
    pub fn remove(&mut self, name: &str, id: FileId) {
        let chars: Vec<char> = name.chars().collect();
        let pruned = Self::remove_recursive(&mut self.root, &chars, id);
        self.node_count = self.node_count.saturating_sub(pruned);
    }

    /// Walks to the node for `name` and removes `id`; returns how many nodes
    /// were pruned on the way back up.
    fn remove_recursive(node: &mut TrieNode, rest: &[char], id: FileId) -> usize {
        match rest.split_first() {
            None => {
                node.ids.remove(&id);
                0
            }
            Some((ch, tail)) => {
                let Some(child) = node.children.get_mut(ch) else {
                    return 0;
                };
                let mut pruned = Self::remove_recursive(child, tail, id);
                if child.is_empty() {
                    node.children.remove(ch);
                    pruned += 1;
                }
                pruned
            }
        }
    }

    /// Returns the ids whose name is exactly `name`.
    #[must_use]
    pub fn ids_for_name(&self, name: &str) -> FxHashSet<FileId> {
        match self.find(name) {
            Some(node) => node.ids.clone(),
            None => FxHashSet::default(),
        }
    }

    /// Returns every id in the subtree rooted at `prefix`.
    ///
    /// An empty prefix returns every id in the trie.
    #[must_use]
    pub fn ids_with_prefix(&self, prefix: &str) -> FxHashSet<FileId> {
        let mut out = FxHashSet::default();
        if let Some(node) = self.find(prefix) {
            Self::collect(node, &mut out);
        }
        out
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.root = TrieNode::default();
        self.node_count = 0;
    }

    /// Number of allocated nodes (for memory estimation).
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    fn find(&self, name: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for ch in name.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }

    fn collect(node: &TrieNode, out: &mut FxHashSet<FileId>) {
        out.extend(node.ids.iter().copied());
        for child in node.children.values() {
            Self::collect(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: u64) -> FileId {
        FileId::new(n)
    }

    #[test]
    fn test_insert_and_exact_lookup() {
        let mut trie = NameTrie::new();
        trie.insert("report", id(1));
        trie.insert("report", id(2));
        trie.insert("reports", id(3));

        let exact = trie.ids_for_name("report");
        assert_eq!(exact.len(), 2);
        assert!(exact.contains(&id(1)));
        assert!(!exact.contains(&id(3)));
    }

    #[test]
    fn test_prefix_collects_subtree() {
        let mut trie = NameTrie::new();
        trie.insert("cat", id(1));
        trie.insert("car", id(2));
        trie.insert("dog", id(3));

        let hits = trie.ids_with_prefix("ca");
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&id(1)));
        assert!(hits.contains(&id(2)));
        assert!(!hits.contains(&id(3)));
    }

    #[test]
    fn test_empty_prefix_returns_everything() {
        let mut trie = NameTrie::new();
        trie.insert("a", id(1));
        trie.insert("b", id(2));
        assert_eq!(trie.ids_with_prefix("").len(), 2);
    }

    #[test]
    fn test_remove_prunes_nodes() {
        let mut trie = NameTrie::new();
        trie.insert("abc", id(1));
        assert_eq!(trie.node_count(), 3);

        trie.remove("abc", id(1));
        assert_eq!(trie.node_count(), 0);
        assert!(trie.ids_for_name("abc").is_empty());
    }

    #[test]
    fn test_remove_keeps_shared_prefix() {
        let mut trie = NameTrie::new();
        trie.insert("abc", id(1));
        trie.insert("abd", id(2));

        trie.remove("abc", id(1));
        assert!(trie.ids_for_name("abc").is_empty());
        assert_eq!(trie.ids_for_name("abd").len(), 1);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut trie = NameTrie::new();
        trie.insert("abc", id(1));
        trie.remove("xyz", id(9));
        trie.remove("abc", id(9));
        assert_eq!(trie.ids_for_name("abc").len(), 1);
    }

    proptest! {
        /// Any non-empty prefix of an inserted name finds its id.
        #[test]
        fn prop_prefix_round_trip(name in "[a-z0-9 ]{1,24}", raw_id in 1u64..10_000) {
            let mut trie = NameTrie::new();
            trie.insert(&name, id(raw_id));

            for end in 1..=name.len() {
                if name.is_char_boundary(end) {
                    let prefix = &name[..end];
                    prop_assert!(trie.ids_with_prefix(prefix).contains(&id(raw_id)));
                }
            }
        }

        /// Insert-then-remove leaves the trie empty.
        #[test]
        fn prop_insert_remove_is_identity(names in proptest::collection::vec("[a-z]{1,12}", 1..20)) {
            let mut trie = NameTrie::new();
            for (i, name) in names.iter().enumerate() {
                trie.insert(name, id(i as u64 + 1));
            }
            for (i, name) in names.iter().enumerate() {
                trie.remove(name, id(i as u64 + 1));
            }
            prop_assert_eq!(trie.node_count(), 0);
            prop_assert!(trie.ids_with_prefix("").is_empty());
        }
    }
}
