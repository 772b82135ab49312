//! GET operations for BPlusTreeMap.
//!
//! This module contains all the read operations for the B+ tree: arena
//! access helpers, descent to a leaf, point lookups and bound queries.

use std::ops::Index;

use crate::error::{BPlusTreeError, KeyResult};
use crate::types::{BPlusTreeMap, BranchNode, Cursor, LeafNode, NodeId, NodeRef, NULL_NODE};

impl<K, V> BPlusTreeMap<K, V> {
    // ============================================================================
    // ARENA ACCESS
    // ============================================================================

    #[inline]
    pub(crate) fn leaf(&self, id: NodeId) -> &LeafNode<K, V> {
        &self.leaf_arena[id]
    }

    #[inline]
    pub(crate) fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode<K, V> {
        &mut self.leaf_arena[id]
    }

    #[inline]
    pub(crate) fn branch(&self, id: NodeId) -> &BranchNode<K> {
        &self.branch_arena[id]
    }

    #[inline]
    pub(crate) fn branch_mut(&mut self, id: NodeId) -> &mut BranchNode<K> {
        &mut self.branch_arena[id]
    }

    /// Parent branch of `node`, `NULL_NODE` for the root.
    pub(crate) fn parent_of(&self, node: NodeRef) -> NodeId {
        match node {
            NodeRef::Leaf(id) => self.leaf(id).parent,
            NodeRef::Branch(id) => self.branch(id).parent,
        }
    }

    pub(crate) fn set_parent(&mut self, node: NodeRef, parent: NodeId) {
        match node {
            NodeRef::Leaf(id) => self.leaf_mut(id).parent = parent,
            NodeRef::Branch(id) => self.branch_mut(id).parent = parent,
        }
    }

    /// Number of entries (leaf) or children (branch) held by `node`.
    pub(crate) fn occupancy(&self, node: NodeRef) -> usize {
        match node {
            NodeRef::Leaf(id) => self.leaf(id).keys.len(),
            NodeRef::Branch(id) => self.branch(id).children.len(),
        }
    }

    /// Slot of `child` inside `parent`.
    ///
    /// A child missing from its recorded parent means the tree is corrupt.
    pub(crate) fn child_position(&self, parent: NodeId, child: NodeRef) -> usize {
        match self.branch(parent).children.iter().position(|c| *c == child) {
            Some(index) => index,
            None => panic!("{:?} is not a child of its parent branch {}", child, parent),
        }
    }

    /// Rightmost leaf of the tree.
    pub(crate) fn last_leaf(&self) -> NodeId {
        let mut current = self.root;
        loop {
            match current {
                NodeRef::Leaf(id) => return id,
                NodeRef::Branch(id) => {
                    current = *self
                        .branch(id)
                        .children
                        .last()
                        .unwrap_or_else(|| panic!("branch {} has no children", id));
                }
            }
        }
    }

    /// Turns a raw `(leaf, slot)` pair into a cursor, moving past the end of a
    /// leaf onto slot 0 of its right neighbour.
    pub(crate) fn cursor_at(&self, leaf: NodeId, slot: usize) -> Cursor {
        let node = self.leaf(leaf);
        if slot < node.keys.len() {
            Cursor::new(leaf, slot, self.tree_id, self.epoch)
        } else if node.next != NULL_NODE {
            Cursor::new(node.next, 0, self.tree_id, self.epoch)
        } else {
            Cursor::end(self.tree_id, self.epoch)
        }
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the root is a leaf node.
    pub fn is_leaf_root(&self) -> bool {
        self.root.is_leaf()
    }

    /// Returns the first key-value pair in the tree.
    pub fn first(&self) -> Option<(&K, &V)> {
        let leaf = self.leaf(self.first_leaf);
        leaf.keys.first().zip(leaf.values.first())
    }

    /// Returns the last key-value pair in the tree.
    pub fn last(&self) -> Option<(&K, &V)> {
        let leaf = self.leaf(self.last_leaf());
        leaf.keys.last().zip(leaf.values.last())
    }
}

impl<K: Ord, V> BPlusTreeMap<K, V> {
    // ============================================================================
    // DESCENT
    // ============================================================================

    /// Walk from the root to the leaf whose key range covers `key`.
    pub(crate) fn descend_to_leaf(&self, key: &K) -> NodeId {
        let mut current = self.root;
        loop {
            match current {
                NodeRef::Leaf(id) => return id,
                NodeRef::Branch(id) => {
                    let branch = self.branch(id);
                    current = branch.children[branch.find_child_index(key)];
                }
            }
        }
    }

    /// Leaf and slot of the first entry `>= key`; the slot may be the leaf's
    /// end slot.
    pub(crate) fn locate_lower(&self, key: &K) -> (NodeId, usize) {
        let leaf_id = self.descend_to_leaf(key);
        (leaf_id, self.leaf(leaf_id).lower_slot(key))
    }

    /// Leaf and slot of the first entry `> key`; the slot may be the leaf's
    /// end slot.
    pub(crate) fn locate_upper(&self, key: &K) -> (NodeId, usize) {
        let leaf_id = self.descend_to_leaf(key);
        (leaf_id, self.leaf(leaf_id).upper_slot(key))
    }

    /// Leaf and slot holding exactly `key`.
    pub(crate) fn locate_exact(&self, key: &K) -> Option<(NodeId, usize)> {
        let leaf_id = self.descend_to_leaf(key);
        self.leaf(leaf_id)
            .search(key)
            .ok()
            .map(|slot| (leaf_id, slot))
    }

    // ============================================================================
    // PUBLIC GET OPERATIONS
    // ============================================================================

    /// Get a reference to the value associated with a key.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let mut tree = BPlusTreeMap::new(4).unwrap();
    /// tree.insert(1, "one");
    /// assert_eq!(tree.get(&1), Some(&"one"));
    /// assert_eq!(tree.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        self.locate_exact(key)
            .map(|(leaf_id, slot)| &self.leaf(leaf_id).values[slot])
    }

    /// Get the stored key and its value.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.locate_exact(key).map(|(leaf_id, slot)| {
            let leaf = self.leaf(leaf_id);
            (&leaf.keys[slot], &leaf.values[slot])
        })
    }

    /// Get a mutable reference to the value for a key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let (leaf_id, slot) = self.locate_exact(key)?;
        Some(&mut self.leaf_mut(leaf_id).values[slot])
    }

    /// Check if key exists in the tree.
    pub fn contains_key(&self, key: &K) -> bool {
        self.locate_exact(key).is_some()
    }

    /// Number of entries with this key: 0 or 1.
    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains_key(key))
    }

    /// Get value for a key, returning an error if the key doesn't exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::{BPlusTreeError, BPlusTreeMap};
    ///
    /// let mut tree = BPlusTreeMap::new(4).unwrap();
    /// tree.insert(1, "one");
    /// assert_eq!(tree.at(&1), Ok(&"one"));
    /// assert_eq!(tree.at(&2), Err(BPlusTreeError::KeyNotFound));
    /// ```
    pub fn at(&self, key: &K) -> KeyResult<&V> {
        self.get(key).ok_or(BPlusTreeError::KeyNotFound)
    }

    /// Mutable counterpart of [`at`](Self::at).
    pub fn at_mut(&mut self, key: &K) -> KeyResult<&mut V> {
        self.get_mut(key).ok_or(BPlusTreeError::KeyNotFound)
    }

    // ============================================================================
    // CURSOR QUERIES
    // ============================================================================

    /// Cursor at `key`, or the end cursor if it is absent.
    pub fn find(&self, key: &K) -> Cursor {
        match self.locate_exact(key) {
            Some((leaf_id, slot)) => Cursor::new(leaf_id, slot, self.tree_id, self.epoch),
            None => Cursor::end(self.tree_id, self.epoch),
        }
    }

    /// Cursor at the first entry whose key is not less than `key`.
    pub fn lower_bound(&self, key: &K) -> Cursor {
        let (leaf_id, slot) = self.locate_lower(key);
        self.cursor_at(leaf_id, slot)
    }

    /// Cursor at the first entry whose key is greater than `key`.
    pub fn upper_bound(&self, key: &K) -> Cursor {
        let (leaf_id, slot) = self.locate_upper(key);
        self.cursor_at(leaf_id, slot)
    }

    /// `(lower_bound(key), upper_bound(key))`: spans at most one entry.
    pub fn equal_range(&self, key: &K) -> (Cursor, Cursor) {
        (self.lower_bound(key), self.upper_bound(key))
    }
}

impl<K: Ord, V> Index<&K> for BPlusTreeMap<K, V> {
    type Output = V;

    /// Returns a reference to the value for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present, like `std::collections::BTreeMap`.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found in BPlusTreeMap"),
        }
    }
}
