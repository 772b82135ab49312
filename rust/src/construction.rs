//! Construction and initialization logic for BPlusTreeMap and nodes.
//!
//! This module contains capacity validation, arena initialization, building a
//! tree from sequences of pairs, and default implementations.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::compact_arena::CompactArena;
use crate::error::{BPlusTreeError, InitResult};
use crate::types::{
    BPlusTreeMap, BranchNode, LeafNode, NodeRef, DEFAULT_CAPACITY, MAX_CAPACITY, MIN_CAPACITY,
    NULL_NODE,
};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(0);

fn next_tree_id() -> u64 {
    NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed)
}

impl<K, V> BPlusTreeMap<K, V> {
    /// Create a B+ tree with specified node capacity.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of entries per node (between 2 and
    ///   [`MAX_CAPACITY`](crate::MAX_CAPACITY))
    ///
    /// # Returns
    ///
    /// Returns `Ok(BPlusTreeMap)` if capacity is valid, `Err(BPlusTreeError)` otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let tree = BPlusTreeMap::<i32, String>::new(16).unwrap();
    /// assert!(tree.is_empty());
    /// assert!(BPlusTreeMap::<i32, String>::new(1).is_err());
    /// ```
    pub fn new(capacity: usize) -> InitResult<Self> {
        validate_capacity(capacity)?;

        let mut leaf_arena = CompactArena::new();
        let root_id = leaf_arena.allocate(LeafNode::new(capacity));

        Ok(Self {
            capacity,
            root: NodeRef::Leaf(root_id),
            first_leaf: root_id,
            len: 0,
            epoch: 0,
            tree_id: next_tree_id(),
            leaf_arena,
            branch_arena: CompactArena::new(),
        })
    }

    /// Create a B+ tree with default capacity.
    ///
    /// This is equivalent to calling `new(DEFAULT_CAPACITY)`.
    pub fn with_default_capacity() -> Self {
        Self::with_valid_capacity(DEFAULT_CAPACITY)
    }

    /// Create a B+ tree whose node capacity is derived from a byte budget per
    /// node.
    ///
    /// The capacity is the number of entries of the larger node kind that fit
    /// in `node_bytes`, clamped to the supported capacity range. Nothing is ever
    /// written to storage; the budget only bounds fan-out.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let tree = BPlusTreeMap::<u64, u64>::with_node_budget(4096);
    /// assert_eq!(tree.capacity(), 4096 / 16);
    /// ```
    pub fn with_node_budget(node_bytes: usize) -> Self {
        Self::with_valid_capacity(capacity_for_budget::<K, V>(node_bytes))
    }

    fn with_valid_capacity(capacity: usize) -> Self {
        match Self::new(capacity) {
            Ok(tree) => tree,
            Err(_) => unreachable!("capacity {} is within the supported range", capacity),
        }
    }

    /// Returns the configured node capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Validate that a capacity is suitable for B+ tree nodes.
pub(crate) fn validate_capacity(capacity: usize) -> InitResult<()> {
    if capacity < MIN_CAPACITY {
        Err(BPlusTreeError::invalid_capacity(capacity, MIN_CAPACITY))
    } else if capacity > MAX_CAPACITY {
        Err(BPlusTreeError::capacity_too_large(capacity, MAX_CAPACITY))
    } else {
        Ok(())
    }
}

/// Number of entries of the larger node kind fitting in `node_bytes`.
pub(crate) fn capacity_for_budget<K, V>(node_bytes: usize) -> usize {
    let leaf_entry = mem::size_of::<(K, V)>();
    let branch_entry = mem::size_of::<(K, NodeRef)>();
    let entry = leaf_entry.max(branch_entry).max(1);
    (node_bytes / entry).clamp(MIN_CAPACITY, MAX_CAPACITY)
}

impl<K: Clone, V: Clone> Clone for BPlusTreeMap<K, V> {
    /// Deep copy with its own identity: cursors from `self` are foreign to
    /// the clone and the other way round.
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            root: self.root,
            first_leaf: self.first_leaf,
            len: self.len,
            epoch: self.epoch,
            tree_id: next_tree_id(),
            leaf_arena: self.leaf_arena.clone(),
            branch_arena: self.branch_arena.clone(),
        }
    }
}

impl<K, V> LeafNode<K, V> {
    /// Creates a new, detached leaf node with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        // One spare slot: a leaf briefly holds capacity + 1 entries before it splits.
        Self {
            capacity,
            keys: Vec::with_capacity(capacity + 1),
            values: Vec::with_capacity(capacity + 1),
            next: NULL_NODE,
            parent: NULL_NODE,
        }
    }
}

impl<K> BranchNode<K> {
    /// Creates a new, detached branch node with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            keys: Vec::with_capacity(capacity),
            children: Vec::with_capacity(capacity + 1),
            parent: NULL_NODE,
        }
    }
}

// Default implementations
impl<K, V> Default for BPlusTreeMap<K, V> {
    /// Create a B+ tree with default capacity.
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl<K, V> Default for LeafNode<K, V> {
    fn default() -> Self {
        Self {
            capacity: 0,
            keys: Vec::new(),
            values: Vec::new(),
            next: NULL_NODE,
            parent: NULL_NODE,
        }
    }
}

impl<K> Default for BranchNode<K> {
    fn default() -> Self {
        Self {
            capacity: 0,
            keys: Vec::new(),
            children: Vec::new(),
            parent: NULL_NODE,
        }
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for BPlusTreeMap<K, V> {
    /// Builds a tree with the default capacity. Later duplicates of a key are
    /// ignored, matching [`BPlusTreeMap::insert`].
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::with_default_capacity();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord + Clone, V, const N: usize> From<[(K, V); N]> for BPlusTreeMap<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Ord + Clone, V> Extend<(K, V)> for BPlusTreeMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_btree_construction() {
        let tree = BPlusTreeMap::<i32, String>::new(16).unwrap();
        assert_eq!(tree.capacity, 16);
        assert_eq!(tree.len, 0);
        assert_eq!(tree.root, NodeRef::Leaf(tree.first_leaf));
    }

    #[test]
    fn test_btree_invalid_capacity() {
        let result = BPlusTreeMap::<i32, String>::new(1);
        assert!(result.unwrap_err().is_capacity_error());
        assert!(BPlusTreeMap::<i32, String>::new(0).is_err());
        assert!(BPlusTreeMap::<i32, String>::new(MIN_CAPACITY).is_ok());
    }

    #[test]
    fn test_btree_capacity_upper_bound() {
        let err = BPlusTreeMap::<i32, String>::new(usize::MAX).unwrap_err();
        assert!(err.is_capacity_error());
        assert!(BPlusTreeMap::<i32, String>::new(MAX_CAPACITY + 1)
            .unwrap_err()
            .is_capacity_error());

        let mut tree = BPlusTreeMap::<u8, u8>::new(MAX_CAPACITY).unwrap();
        tree.insert(1, 1);
        assert_eq!(tree.get(&1), Some(&1));
    }

    #[test]
    fn test_huge_node_budget_is_clamped() {
        assert_eq!(capacity_for_budget::<u8, ()>(usize::MAX), MAX_CAPACITY);
        let tree = BPlusTreeMap::<u64, u64>::with_node_budget(usize::MAX);
        assert_eq!(tree.capacity(), MAX_CAPACITY);
    }

    #[test]
    fn test_trees_get_distinct_ids() {
        let a = BPlusTreeMap::<i32, i32>::new(4).unwrap();
        let b = BPlusTreeMap::<i32, i32>::new(4).unwrap();
        assert_ne!(a.tree_id, b.tree_id);
        assert_ne!(a.clone().tree_id, a.tree_id);
    }

    #[test]
    fn test_btree_default() {
        let tree = BPlusTreeMap::<i32, String>::default();
        assert_eq!(tree.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_capacity_for_budget() {
        assert_eq!(capacity_for_budget::<u64, u64>(4096), 256);
        assert_eq!(capacity_for_budget::<u64, u64>(8), MIN_CAPACITY);
        assert_eq!(capacity_for_budget::<(), ()>(0), MIN_CAPACITY);
        // Branch entries dominate when values are zero-sized.
        let branch_entry = mem::size_of::<(u8, NodeRef)>();
        assert_eq!(capacity_for_budget::<u8, ()>(1024), 1024 / branch_entry);
    }

    #[test]
    fn test_from_array_ignores_later_duplicates() {
        let tree = BPlusTreeMap::from([(2, "b"), (1, "a"), (2, "z")]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(&2), Some(&"b"));
    }

    #[test]
    fn test_extend_builds_sorted_tree() {
        let mut tree = BPlusTreeMap::new(4).unwrap();
        tree.extend((0..50).rev().map(|i| (i, i * 2)));
        assert_eq!(tree.len(), 50);
        assert!(tree.check_invariants());
        assert_eq!(tree.keys().copied().collect::<Vec<_>>(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_leaf_construction() {
        let leaf = LeafNode::<i32, String>::new(16);
        assert_eq!(leaf.capacity, 16);
        assert!(leaf.keys.is_empty());
        assert_eq!(leaf.next, NULL_NODE);
        assert_eq!(leaf.parent, NULL_NODE);
    }

    #[test]
    fn test_branch_construction() {
        let branch = BranchNode::<i32>::new(16);
        assert_eq!(branch.capacity, 16);
        assert!(branch.children.is_empty());
    }
}
