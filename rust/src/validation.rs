//! Validation and debugging utilities for BPlusTreeMap.
//!
//! This module contains invariant checking, structural statistics and a text
//! dump of the tree. None of it is needed by the map operations themselves.

use std::fmt::{self, Write as _};

use crate::compact_arena::CompactArenaStats;
use crate::error::{BPlusTreeError, BTreeResult};
use crate::types::{BPlusTreeMap, NodeId, NodeRef, NULL_NODE};

/// What a subtree walk learned about the keys below a node.
struct SubtreeSpan<'a, K> {
    min: &'a K,
    max: &'a K,
}

/// Leaves met during an in-order walk, and how many branches were passed.
#[derive(Default)]
struct WalkState {
    leaves: Vec<NodeId>,
    leaf_depth: Option<usize>,
    branches: usize,
}

// ============================================================================
// VALIDATION METHODS
// ============================================================================

impl<K: Ord, V> BPlusTreeMap<K, V> {
    /// Check if the tree maintains B+ tree invariants.
    /// Returns true if all invariants are satisfied.
    pub fn check_invariants(&self) -> bool {
        self.check_invariants_detailed().is_ok()
    }

    /// Check invariants with detailed error reporting.
    ///
    /// Verifies parent links, node occupancy, exact separators, key order,
    /// uniform leaf depth, the leaf chain and the arena bookkeeping.
    pub fn check_invariants_detailed(&self) -> BTreeResult<()> {
        if self.parent_of(self.root) != NULL_NODE {
            return Err(BPlusTreeError::corrupted_tree("root", "root has a parent"));
        }

        let mut state = WalkState::default();
        let span = self.check_node(self.root, NULL_NODE, 0, &mut state)?;
        if span.is_none() && self.len != 0 {
            return Err(BPlusTreeError::data_integrity(
                "element count",
                &format!("tree is empty but len is {}", self.len),
            ));
        }

        self.check_leaf_chain(&state.leaves)?;
        self.check_arena_consistency(&state)
    }

    /// Recursively validate the subtree under `node`, returning its key span
    /// (`None` only for an empty root leaf).
    fn check_node<'a>(
        &'a self,
        node: NodeRef,
        expected_parent: NodeId,
        depth: usize,
        state: &mut WalkState,
    ) -> BTreeResult<Option<SubtreeSpan<'a, K>>> {
        let is_root = expected_parent == NULL_NODE;
        let arena_has_node = match node {
            NodeRef::Leaf(id) => self.leaf_arena.contains(id),
            NodeRef::Branch(id) => self.branch_arena.contains(id),
        };
        if !arena_has_node {
            return Err(BPlusTreeError::corrupted_tree(
                "arena",
                &format!("{:?} is reachable but not allocated", node),
            ));
        }
        if self.parent_of(node) != expected_parent {
            return Err(BPlusTreeError::corrupted_tree(
                "parent link",
                &format!(
                    "{:?} records parent {} but hangs under {}",
                    node,
                    self.parent_of(node),
                    expected_parent
                ),
            ));
        }

        match node {
            NodeRef::Leaf(id) => {
                let leaf = self.leaf(id);
                if leaf.keys.len() != leaf.values.len() {
                    return Err(BPlusTreeError::corrupted_tree(
                        "leaf",
                        &format!("leaf {} has mismatched keys and values", id),
                    ));
                }
                let occupancy = leaf.keys.len();
                if occupancy > self.capacity || (!is_root && occupancy < leaf.min_keys()) {
                    return Err(BPlusTreeError::corrupted_tree(
                        "leaf",
                        &format!("leaf {} holds {} entries", id, occupancy),
                    ));
                }
                if leaf.keys.windows(2).any(|pair| pair[0] >= pair[1]) {
                    return Err(BPlusTreeError::corrupted_tree(
                        "leaf",
                        &format!("leaf {} keys are not strictly ascending", id),
                    ));
                }

                match state.leaf_depth {
                    Some(expected) if expected != depth => {
                        return Err(BPlusTreeError::corrupted_tree(
                            "depth",
                            &format!("leaf {} at depth {} instead of {}", id, depth, expected),
                        ));
                    }
                    Some(_) => {}
                    None => state.leaf_depth = Some(depth),
                }
                state.leaves.push(id);

                Ok(leaf.keys.first().zip(leaf.keys.last()).map(|(min, max)| SubtreeSpan { min, max }))
            }
            NodeRef::Branch(id) => {
                let branch = self.branch(id);
                state.branches += 1;
                if branch.keys.len() + 1 != branch.children.len() {
                    return Err(BPlusTreeError::corrupted_tree(
                        "branch",
                        &format!(
                            "branch {} has {} keys for {} children",
                            id,
                            branch.keys.len(),
                            branch.children.len()
                        ),
                    ));
                }
                let occupancy = branch.children.len();
                let too_few = if is_root {
                    occupancy < 2
                } else {
                    occupancy < branch.min_children()
                };
                if too_few || occupancy > self.capacity {
                    return Err(BPlusTreeError::corrupted_tree(
                        "branch",
                        &format!("branch {} holds {} children", id, occupancy),
                    ));
                }

                let mut span: Option<SubtreeSpan<'a, K>> = None;
                for (index, &child) in branch.children.iter().enumerate() {
                    let child_span = self.check_node(child, id, depth + 1, state)?.ok_or_else(|| {
                        BPlusTreeError::corrupted_tree(
                            "branch",
                            &format!("child {:?} of branch {} is empty", child, id),
                        )
                    })?;

                    if index > 0 && &branch.keys[index - 1] != child_span.min {
                        return Err(BPlusTreeError::corrupted_tree(
                            "separator",
                            &format!("separator {} of branch {} is not its subtree minimum", index - 1, id),
                        ));
                    }

                    span = Some(match span {
                        None => child_span,
                        Some(so_far) => {
                            if so_far.max >= child_span.min {
                                return Err(BPlusTreeError::corrupted_tree(
                                    "ordering",
                                    &format!("children of branch {} overlap at slot {}", id, index),
                                ));
                            }
                            SubtreeSpan {
                                min: so_far.min,
                                max: child_span.max,
                            }
                        }
                    });
                }
                Ok(span)
            }
        }
    }

    /// The right-links must visit exactly the in-order leaves, in order,
    /// holding `len` entries in total.
    fn check_leaf_chain(&self, in_order: &[NodeId]) -> BTreeResult<()> {
        if in_order.first() != Some(&self.first_leaf) {
            return Err(BPlusTreeError::data_integrity(
                "leaf chain",
                &format!("first leaf {} is not the leftmost leaf", self.first_leaf),
            ));
        }

        let chain = self.leaf_chain();
        if chain != in_order {
            return Err(BPlusTreeError::data_integrity(
                "leaf chain",
                &format!("chain {:?} differs from in-order leaves {:?}", chain, in_order),
            ));
        }

        let mut previous: Option<&K> = None;
        let mut count = 0;
        for &id in &chain {
            for key in &self.leaf(id).keys {
                if previous.is_some_and(|p| p >= key) {
                    return Err(BPlusTreeError::data_integrity(
                        "leaf chain",
                        &format!("keys out of order entering leaf {}", id),
                    ));
                }
                previous = Some(key);
                count += 1;
            }
        }
        if count != self.len {
            return Err(BPlusTreeError::data_integrity(
                "element count",
                &format!("{} entries in leaves but len is {}", count, self.len),
            ));
        }
        Ok(())
    }

    fn check_arena_consistency(&self, state: &WalkState) -> BTreeResult<()> {
        let leaf_stats = self.leaf_arena_stats();
        if leaf_stats.allocated_count != state.leaves.len() {
            return Err(BPlusTreeError::data_integrity(
                "Leaf consistency check",
                &format!("{} in tree vs {} in arena", state.leaves.len(), leaf_stats.allocated_count),
            ));
        }
        let branch_stats = self.branch_arena_stats();
        if branch_stats.allocated_count != state.branches {
            return Err(BPlusTreeError::data_integrity(
                "Branch consistency check",
                &format!("{} in tree vs {} in arena", state.branches, branch_stats.allocated_count),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// STRUCTURE STATISTICS
// ============================================================================

impl<K, V> BPlusTreeMap<K, V> {
    /// Leaf ids in right-link order.
    fn leaf_chain(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut current = self.first_leaf;
        while current != NULL_NODE && ids.len() <= self.leaf_arena.len() {
            ids.push(current);
            current = self.leaf(current).next;
        }
        ids
    }

    /// Entry counts of the leaves, left to right.
    pub fn leaf_sizes(&self) -> Vec<usize> {
        self.leaf_chain()
            .into_iter()
            .map(|id| self.leaf(id).keys.len())
            .collect()
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.leaf_arena.len()
    }

    /// Get statistics for the leaf node arena.
    pub fn leaf_arena_stats(&self) -> CompactArenaStats {
        self.leaf_arena.stats()
    }

    /// Get statistics for the branch node arena.
    pub fn branch_arena_stats(&self) -> CompactArenaStats {
        self.branch_arena.stats()
    }

    /// Number of levels, 1 for a tree whose root is a leaf.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let NodeRef::Branch(id) = current {
            current = self.branch(id).children[0];
            height += 1;
        }
        height
    }

    /// Indented rendering of every node, root first.
    pub fn dump(&self) -> String
    where
        K: fmt::Debug,
    {
        let mut out = String::new();
        self.dump_node(self.root, 0, &mut out);
        out
    }

    fn dump_node(&self, node: NodeRef, depth: usize, out: &mut String)
    where
        K: fmt::Debug,
    {
        let indent = "  ".repeat(depth);
        match node {
            NodeRef::Leaf(id) => {
                let leaf = self.leaf(id);
                let _ = if leaf.next == NULL_NODE {
                    writeln!(out, "{}Leaf[{}] {:?}", indent, id, leaf.keys)
                } else {
                    writeln!(out, "{}Leaf[{}] {:?} -> {}", indent, id, leaf.keys, leaf.next)
                };
            }
            NodeRef::Branch(id) => {
                let branch = self.branch(id);
                let _ = writeln!(out, "{}Branch[{}] {:?}", indent, id, branch.keys);
                for &child in &branch.children {
                    self.dump_node(child, depth + 1, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::types::NodeRef;
    use crate::BPlusTreeMap;

    fn ascending(capacity: usize, n: i32) -> BPlusTreeMap<i32, i32> {
        let mut tree = BPlusTreeMap::new(capacity).unwrap();
        for i in 1..=n {
            tree.insert(i, i);
        }
        tree
    }

    #[test]
    fn test_valid_tree_passes() {
        let tree = ascending(4, 200);
        tree.check_invariants_detailed().unwrap();
        assert_eq!(tree.leaf_sizes().iter().sum::<usize>(), 200);
        assert_eq!(tree.leaf_count(), tree.leaf_sizes().len());
    }

    #[test]
    fn test_detects_stale_separator() {
        let mut tree = ascending(4, 10);
        if let NodeRef::Branch(root) = tree.root {
            tree.branch_mut(root).keys[0] = 5;
        }
        let err = tree.check_invariants_detailed().unwrap_err();
        assert!(matches!(err, crate::BPlusTreeError::CorruptedTree(_)));
        assert!(!tree.check_invariants());
    }

    #[test]
    fn test_detects_broken_leaf_chain() {
        let mut tree = ascending(4, 10);
        let first = tree.first_leaf;
        tree.leaf_mut(first).next = crate::types::NULL_NODE;
        let err = tree.check_invariants_detailed().unwrap_err();
        assert!(matches!(err, crate::BPlusTreeError::DataIntegrityError(_)));
    }

    #[test]
    fn test_detects_wrong_len() {
        let mut tree = ascending(4, 10);
        tree.len = 9;
        assert!(!tree.check_invariants());
    }

    #[test]
    fn test_arena_stats_track_freed_nodes() {
        let mut tree = ascending(4, 100);
        let before = tree.leaf_arena_stats();
        assert_eq!(before.free_count, 0);
        for i in 1..=60 {
            tree.erase(&i);
        }
        let after = tree.leaf_arena_stats();
        assert_eq!(after.allocated_count, tree.leaf_count());
        assert!(after.free_count > 0);
        assert_eq!(after.total_slots, before.total_slots);
    }

    #[test]
    fn test_height_and_dump() {
        let tree = ascending(4, 10);
        assert_eq!(tree.height(), 2);
        let dump = tree.dump();
        assert!(dump.starts_with("Branch"));
        assert_eq!(dump.lines().filter(|l| l.trim_start().starts_with("Leaf")).count(), 3);
        assert!(dump.contains("[1, 2, 3]"));
    }
}
