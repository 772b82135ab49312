//! INSERT operations for BPlusTreeMap.
//!
//! This module contains the insertion path: placing an entry in its leaf,
//! propagating a new subtree minimum to the ancestors, splitting overfull
//! nodes and growing a new root.

use std::ops::Range;

use tracing::trace;

use crate::types::{BPlusTreeMap, BranchNode, Cursor, NodeId, NodeRef, NULL_NODE};

impl<K: Ord + Clone, V> BPlusTreeMap<K, V> {
    // ============================================================================
    // PUBLIC INSERT OPERATIONS
    // ============================================================================

    /// Insert a key-value pair unless the key is already present.
    ///
    /// Returns a cursor at the entry for `key` and whether a new entry was
    /// created. An existing entry is left untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let mut tree = BPlusTreeMap::new(4).unwrap();
    /// let (cursor, inserted) = tree.insert(1, "one");
    /// assert!(inserted);
    /// assert_eq!(tree.entry_at(cursor).unwrap(), (&1, &"one"));
    ///
    /// let (cursor, inserted) = tree.insert(1, "uno");
    /// assert!(!inserted);
    /// assert_eq!(tree.entry_at(cursor).unwrap(), (&1, &"one"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (Cursor, bool) {
        let leaf_id = self.descend_to_leaf(&key);
        let slot = match self.leaf(leaf_id).search(&key) {
            Ok(slot) => return (Cursor::new(leaf_id, slot, self.tree_id, self.epoch), false),
            Err(slot) => slot,
        };

        let (leaf_id, slot) = self.insert_into_leaf(leaf_id, slot, key, value);
        self.len += 1;
        self.epoch += 1;
        (Cursor::new(leaf_id, slot, self.tree_id, self.epoch), true)
    }

    /// Returns the value for `key`, inserting `V::default()` first if absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let mut counts = BPlusTreeMap::new(4).unwrap();
    /// for word in ["a", "b", "a"] {
    ///     *counts.get_or_insert_default(word) += 1;
    /// }
    /// assert_eq!(counts.get(&"a"), Some(&2));
    /// ```
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let (leaf_id, slot) = match self.locate_exact(&key) {
            Some(position) => position,
            None => {
                let (cursor, _) = self.insert(key, V::default());
                (cursor.leaf, cursor.slot)
            }
        };
        &mut self.leaf_mut(leaf_id).values[slot]
    }

    // ============================================================================
    // HELPERS FOR INSERT OPERATIONS
    // ============================================================================

    /// Put an entry at `slot` of `leaf_id` and restore the tree invariants.
    /// Returns where the entry ended up after a possible split.
    fn insert_into_leaf(&mut self, leaf_id: NodeId, slot: usize, key: K, value: V) -> (NodeId, usize) {
        let new_min = (slot == 0 && self.leaf(leaf_id).parent != NULL_NODE).then(|| key.clone());
        self.leaf_mut(leaf_id).insert_at(slot, key, value);
        if let Some(min) = new_min {
            self.propagate_min(NodeRef::Leaf(leaf_id), min);
        }

        if !self.leaf(leaf_id).is_overfull() {
            return (leaf_id, slot);
        }
        let keep = self.leaf(leaf_id).len().div_ceil(2);
        let right_id = self.split_leaf(leaf_id);
        if slot >= keep {
            (right_id, slot - keep)
        } else {
            (leaf_id, slot)
        }
    }

    /// Record `new_min` as the minimum of the subtree rooted at `node`.
    ///
    /// Walks up while `node` sits in slot 0 of its parent, since slot 0 keeps
    /// no separator of its own, and overwrites the first separator found.
    pub(crate) fn propagate_min(&mut self, node: NodeRef, new_min: K) {
        let mut current = node;
        loop {
            let parent = self.parent_of(current);
            if parent == NULL_NODE {
                return;
            }
            let index = self.child_position(parent, current);
            if index > 0 {
                self.branch_mut(parent).keys[index - 1] = new_min;
                return;
            }
            current = NodeRef::Branch(parent);
        }
    }

    /// Point the parent link of `children[range]` at `branch_id`.
    pub(crate) fn adopt_children(&mut self, branch_id: NodeId, range: Range<usize>) {
        for index in range {
            let child = self.branch(branch_id).children[index];
            self.set_parent(child, branch_id);
        }
    }

    /// Split an overfull leaf and push the new sibling into the parent.
    /// Returns the id of the new right leaf.
    fn split_leaf(&mut self, leaf_id: NodeId) -> NodeId {
        let right = self.leaf_mut(leaf_id).split_off_upper();
        let separator = right.keys[0].clone();
        let right_id = self.leaf_arena.allocate(right);
        self.leaf_mut(leaf_id).next = right_id;

        trace!(
            target: "bptree_map::split",
            left = leaf_id,
            right = right_id,
            "split leaf"
        );
        self.push(NodeRef::Leaf(leaf_id), separator, NodeRef::Leaf(right_id));
        right_id
    }

    /// Split an overfull branch. Returns the new right branch and the key
    /// promoted out of both halves.
    fn split_branch(&mut self, branch_id: NodeId) -> (NodeId, K) {
        let (right, promoted) = self.branch_mut(branch_id).split_off_upper();
        let moved = right.children.len();
        let right_id = self.branch_arena.allocate(right);
        self.adopt_children(right_id, 0..moved);

        trace!(
            target: "bptree_map::split",
            left = branch_id,
            right = right_id,
            moved,
            "split branch"
        );
        (right_id, promoted)
    }

    /// Insert `right` with `separator` next to `left` in their parent,
    /// splitting ancestors as long as they overflow.
    fn push(&mut self, left: NodeRef, separator: K, right: NodeRef) {
        let (mut left, mut separator, mut right) = (left, separator, right);
        loop {
            let parent = self.parent_of(left);
            if parent == NULL_NODE {
                self.grow_root(left, separator, right);
                return;
            }

            let index = self.child_position(parent, left);
            self.branch_mut(parent).insert_child_after(index, separator, right);
            self.set_parent(right, parent);
            if !self.branch(parent).is_overfull() {
                return;
            }

            let (right_id, promoted) = self.split_branch(parent);
            left = NodeRef::Branch(parent);
            separator = promoted;
            right = NodeRef::Branch(right_id);
        }
    }

    /// Replace the root with a branch over the old root and its new sibling.
    fn grow_root(&mut self, left: NodeRef, separator: K, right: NodeRef) {
        let mut root = BranchNode::new(self.capacity);
        root.keys.push(separator);
        root.children.push(left);
        root.children.push(right);
        let root_id = self.branch_arena.allocate(root);
        self.set_parent(left, root_id);
        self.set_parent(right, root_id);
        self.root = NodeRef::Branch(root_id);

        trace!(
            target: "bptree_map::root",
            root = root_id,
            height = self.height(),
            "grew new root"
        );
    }
}
