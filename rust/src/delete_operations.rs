//! DELETE operations for BPlusTreeMap.
//!
//! This module contains the removal path: taking an entry out of its leaf,
//! detaching nodes that became empty, merging or redistributing underfull
//! nodes with their structural neighbours and collapsing the root.
//!
//! Neighbours are found structurally (up to the first ancestor with a slot on
//! the wanted side, then down the opposite edge) rather than within the same
//! parent, so a merge may pair two cousins. Because every separator is the
//! exact minimum of its subtree, the slot-0 propagation used by insertion
//! repairs the separators of either pairing.

use std::ops::{Bound, RangeBounds};

use tracing::trace;

use crate::error::{BPlusTreeError, ModifyResult};
use crate::types::{BPlusTreeMap, Cursor, LeafNode, NodeId, NodeRef, NULL_NODE};

impl<K: Ord + Clone, V> BPlusTreeMap<K, V> {
    // ============================================================================
    // PUBLIC DELETE OPERATIONS
    // ============================================================================

    /// Remove the entry under `cursor`, returning a cursor at the entry that
    /// followed it.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let mut tree: BPlusTreeMap<i32, i32> = (0..10).map(|i| (i, i)).collect();
    /// let mut cursor = tree.find(&3);
    /// for _ in 0..3 {
    ///     cursor = tree.erase_at(cursor).unwrap();
    /// }
    /// assert_eq!(tree.entry_at(cursor).unwrap(), (&6, &6));
    /// assert_eq!(tree.len(), 7);
    /// ```
    pub fn erase_at(&mut self, cursor: Cursor) -> ModifyResult<Cursor> {
        self.remove_at(cursor).map(|(_, _, next)| next)
    }

    /// Remove the entry under `cursor`, returning it together with a cursor at
    /// the entry that followed it.
    pub fn remove_at(&mut self, cursor: Cursor) -> ModifyResult<(K, V, Cursor)> {
        self.check_cursor(cursor, "erase")?;
        let (key, value) = self.remove_from_leaf(cursor.leaf, cursor.slot);
        let next = self.lower_bound(&key);
        Ok((key, value, next))
    }

    /// Remove a key from the tree, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Remove a key from the tree, returning the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let (leaf_id, slot) = self.locate_exact(key)?;
        Some(self.remove_from_leaf(leaf_id, slot))
    }

    /// Remove a key, returning how many entries were removed (0 or 1).
    pub fn erase(&mut self, key: &K) -> usize {
        usize::from(self.remove_entry(key).is_some())
    }

    /// Remove every entry whose key lies in `range`, returning how many were
    /// removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let mut tree: BPlusTreeMap<i32, ()> = (0..100).map(|i| (i, ())).collect();
    /// assert_eq!(tree.erase_range(10..90), 80);
    /// assert_eq!(tree.erase_range(..=4), 5);
    /// assert_eq!(tree.len(), 15);
    /// ```
    pub fn erase_range<R>(&mut self, range: R) -> usize
    where
        R: RangeBounds<K>,
    {
        let mut cursor = match range.start_bound() {
            Bound::Included(key) => self.lower_bound(key),
            Bound::Excluded(key) => self.upper_bound(key),
            Bound::Unbounded => self.begin(),
        };

        let mut removed = 0;
        while !cursor.is_end() {
            let key = &self.leaf(cursor.leaf).keys[cursor.slot];
            let in_range = match range.end_bound() {
                Bound::Included(end) => key <= end,
                Bound::Excluded(end) => key < end,
                Bound::Unbounded => true,
            };
            if !in_range {
                break;
            }
            let (key, _) = self.remove_from_leaf(cursor.leaf, cursor.slot);
            cursor = self.lower_bound(&key);
            removed += 1;
        }
        removed
    }

    /// Remove the entries from `first` up to but not including `last`,
    /// returning a cursor at the entry `last` pointed to.
    ///
    /// Both cursors must be current cursors of this tree, and `last` must not
    /// precede `first`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let mut tree: BPlusTreeMap<i32, i32> = (0..10).map(|i| (i, i)).collect();
    /// let (first, last) = (tree.find(&2), tree.find(&7));
    /// let next = tree.erase_between(first, last).unwrap();
    /// assert_eq!(tree.entry_at(next).unwrap(), (&7, &7));
    /// assert_eq!(tree.len(), 5);
    /// ```
    pub fn erase_between(&mut self, first: Cursor, last: Cursor) -> ModifyResult<Cursor> {
        self.check_position(first)?;
        self.check_position(last)?;
        if first.is_end() {
            return if last.is_end() {
                Ok(self.end())
            } else {
                Err(BPlusTreeError::inverted_cursors())
            };
        }

        let start = self.leaf(first.leaf).keys[first.slot].clone();
        if last.is_end() {
            self.erase_range((Bound::Included(start), Bound::Unbounded));
            return Ok(self.end());
        }

        let stop = self.leaf(last.leaf).keys[last.slot].clone();
        if stop < start {
            return Err(BPlusTreeError::inverted_cursors());
        }
        self.erase_range((Bound::Included(start), Bound::Excluded(stop.clone())));
        Ok(self.find(&stop))
    }

    /// Remove and return the entry with the smallest key.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        if self.is_empty() {
            return None;
        }
        Some(self.remove_from_leaf(self.first_leaf, 0))
    }

    /// Remove and return the entry with the largest key.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        if self.is_empty() {
            return None;
        }
        let leaf_id = self.last_leaf();
        let slot = self.leaf(leaf_id).len() - 1;
        Some(self.remove_from_leaf(leaf_id, slot))
    }

    /// Clear all items from the tree.
    pub fn clear(&mut self) {
        tracing::debug!(
            target: "bptree_map::root",
            len = self.len,
            "clearing tree"
        );
        self.leaf_arena.clear();
        self.branch_arena.clear();

        let root_id = self.leaf_arena.allocate(LeafNode::new(self.capacity));
        self.root = NodeRef::Leaf(root_id);
        self.first_leaf = root_id;
        self.len = 0;
        self.epoch += 1;
    }

    // ============================================================================
    // HELPERS FOR DELETE OPERATIONS
    // ============================================================================

    /// Take the entry at `slot` out of `leaf_id` and restore the invariants.
    fn remove_from_leaf(&mut self, leaf_id: NodeId, slot: usize) -> (K, V) {
        let entry = self.leaf_mut(leaf_id).remove_at(slot);
        self.len -= 1;
        self.epoch += 1;

        let leaf = self.leaf(leaf_id);
        if leaf.parent == NULL_NODE {
            return entry;
        }

        if leaf.is_empty() {
            self.detach(NodeRef::Leaf(leaf_id));
            return entry;
        }

        if slot == 0 {
            let new_min = leaf.keys[0].clone();
            self.propagate_min(NodeRef::Leaf(leaf_id), new_min);
        }
        if self.leaf(leaf_id).is_underfull() {
            self.rebalance(NodeRef::Leaf(leaf_id));
        }
        entry
    }

    /// Unhook an empty non-root node from the tree and free it.
    ///
    /// An empty leaf is first cut out of the leaf chain: its structural left
    /// neighbour (or the first-leaf pointer) takes over its right-link.
    fn detach(&mut self, node: NodeRef) {
        if let NodeRef::Leaf(leaf_id) = node {
            let next = self.leaf(leaf_id).next;
            match self.left_neighbor(node) {
                Some(NodeRef::Leaf(prev)) => self.leaf_mut(prev).next = next,
                Some(NodeRef::Branch(prev)) => {
                    panic!("left neighbour {} of leaf {} is a branch", prev, leaf_id)
                }
                None => self.first_leaf = next,
            }
        }

        let parent = self.parent_of(node);
        trace!(
            target: "bptree_map::merge",
            node = node.id(),
            leaf = node.is_leaf(),
            parent,
            "detached empty node"
        );
        self.push_erase(parent, node);
        self.free(node);
        self.settle(parent);
    }

    /// Remove `child`'s entry from `parent`, propagating the parent's new
    /// minimum when the first entry goes.
    fn push_erase(&mut self, parent: NodeId, child: NodeRef) {
        let index = self.child_position(parent, child);
        if let Some(new_min) = self.branch_mut(parent).remove_child_at(index) {
            self.propagate_min(NodeRef::Branch(parent), new_min);
        }
    }

    /// Restore occupancy of a branch that just lost a child.
    fn settle(&mut self, branch_id: NodeId) {
        let branch = self.branch(branch_id);
        if branch.parent == NULL_NODE {
            self.collapse_root();
        } else if branch.is_empty() {
            self.detach(NodeRef::Branch(branch_id));
        } else if branch.is_underfull() {
            self.rebalance(NodeRef::Branch(branch_id));
        }
    }

    /// Promote the only child of the root until the root has two or more
    /// children or is a leaf. This is the only way the tree loses height.
    fn collapse_root(&mut self) {
        while let NodeRef::Branch(root_id) = self.root {
            if self.branch(root_id).children.len() != 1 {
                return;
            }
            let child = self.branch(root_id).children[0];
            self.set_parent(child, NULL_NODE);
            self.branch_arena.deallocate(root_id);
            self.root = child;

            trace!(
                target: "bptree_map::root",
                old_root = root_id,
                new_root = child.id(),
                "collapsed root"
            );
        }
    }

    /// Fix an underfull, non-empty, non-root node by merging with or borrowing
    /// from a neighbour at the same level, trying the right side first.
    fn rebalance(&mut self, node: NodeRef) {
        let (left, right) = match self.right_neighbor(node) {
            Some(right) => (node, right),
            None => match self.left_neighbor(node) {
                Some(left) => (left, node),
                None => panic!("non-root {:?} has no neighbour at its level", node),
            },
        };

        let total = self.occupancy(left) + self.occupancy(right);
        if total <= self.capacity {
            self.merge_into_left(left, right);
        } else {
            self.redistribute(left, right, total);
        }
    }

    /// Move every entry of `right` into `left` and drop `right`.
    fn merge_into_left(&mut self, left: NodeRef, right: NodeRef) {
        match (left, right) {
            (NodeRef::Leaf(left_id), NodeRef::Leaf(right_id)) => {
                let donor = self.leaf_mut(right_id);
                let mut keys = std::mem::take(&mut donor.keys);
                let mut values = std::mem::take(&mut donor.values);
                let next = donor.next;

                let survivor = self.leaf_mut(left_id);
                survivor.keys.append(&mut keys);
                survivor.values.append(&mut values);
                survivor.next = next;
            }
            (NodeRef::Branch(left_id), NodeRef::Branch(right_id)) => {
                let right_min = self.subtree_min(right).clone();
                let donor = self.branch_mut(right_id);
                let keys = std::mem::take(&mut donor.keys);
                let children = std::mem::take(&mut donor.children);

                let survivor = self.branch_mut(left_id);
                let start = survivor.children.len();
                survivor.keys.push(right_min);
                survivor.keys.extend(keys);
                survivor.children.extend(children);
                let end = survivor.children.len();
                self.adopt_children(left_id, start..end);
            }
            _ => panic!("cannot merge {:?} into {:?}", right, left),
        }

        let parent = self.parent_of(right);
        trace!(
            target: "bptree_map::merge",
            survivor = left.id(),
            removed = right.id(),
            leaf = left.is_leaf(),
            "merged node into left neighbour"
        );
        self.push_erase(parent, right);
        self.free(right);
        self.settle(parent);
    }

    /// Even out the entries of two adjacent nodes holding `total` entries
    /// together, then record the new minimum of `right`.
    fn redistribute(&mut self, left: NodeRef, right: NodeRef, total: usize) {
        let target_left = total / 2;
        let new_min = match (left, right) {
            (NodeRef::Leaf(left_id), NodeRef::Leaf(right_id)) => {
                let left_len = self.leaf(left_id).len();
                if left_len > target_left {
                    let donor = self.leaf_mut(left_id);
                    let keys = donor.keys.split_off(target_left);
                    let values = donor.values.split_off(target_left);
                    let receiver = self.leaf_mut(right_id);
                    receiver.keys.splice(0..0, keys);
                    receiver.values.splice(0..0, values);
                } else {
                    let count = target_left - left_len;
                    let donor = self.leaf_mut(right_id);
                    let keys: Vec<K> = donor.keys.drain(..count).collect();
                    let values: Vec<V> = donor.values.drain(..count).collect();
                    let receiver = self.leaf_mut(left_id);
                    receiver.keys.extend(keys);
                    receiver.values.extend(values);
                }
                self.leaf(right_id).keys[0].clone()
            }
            (NodeRef::Branch(left_id), NodeRef::Branch(right_id)) => {
                let right_min = self.subtree_min(right).clone();
                let left_len = self.branch(left_id).len();
                if left_len > target_left {
                    // The tail of `left` becomes the head of `right`.
                    let donor = self.branch_mut(left_id);
                    let mut keys = donor.keys.split_off(target_left - 1);
                    let children = donor.children.split_off(target_left);
                    let new_min = keys.remove(0);
                    keys.push(right_min);

                    let moved = children.len();
                    let receiver = self.branch_mut(right_id);
                    receiver.keys.splice(0..0, keys);
                    receiver.children.splice(0..0, children);
                    self.adopt_children(right_id, 0..moved);
                    new_min
                } else {
                    // The head of `right` becomes the tail of `left`.
                    let count = target_left - left_len;
                    let donor = self.branch_mut(right_id);
                    let children: Vec<NodeRef> = donor.children.drain(..count).collect();
                    let keys: Vec<K> = donor.keys.drain(..count - 1).collect();
                    let new_min = donor.keys.remove(0);

                    let receiver = self.branch_mut(left_id);
                    let start = receiver.children.len();
                    receiver.keys.push(right_min);
                    receiver.keys.extend(keys);
                    receiver.children.extend(children);
                    self.adopt_children(left_id, start..start + count);
                    new_min
                }
            }
            _ => panic!("cannot redistribute between {:?} and {:?}", left, right),
        };

        trace!(
            target: "bptree_map::merge",
            left = left.id(),
            right = right.id(),
            left_len = self.occupancy(left),
            right_len = self.occupancy(right),
            "redistributed entries"
        );
        self.propagate_min(right, new_min);
    }

    fn free(&mut self, node: NodeRef) {
        match node {
            NodeRef::Leaf(id) => {
                self.leaf_arena.deallocate(id);
            }
            NodeRef::Branch(id) => {
                self.branch_arena.deallocate(id);
            }
        }
    }
}

impl<K, V> BPlusTreeMap<K, V> {
    // ============================================================================
    // STRUCTURAL NEIGHBOURS
    // ============================================================================

    /// Node immediately left of `node` at the same depth, whatever its parent.
    pub(crate) fn left_neighbor(&self, node: NodeRef) -> Option<NodeRef> {
        self.neighbor(node, Side::Left)
    }

    /// Node immediately right of `node` at the same depth, whatever its parent.
    /// For a leaf this is its right-link.
    pub(crate) fn right_neighbor(&self, node: NodeRef) -> Option<NodeRef> {
        if let NodeRef::Leaf(id) = node {
            let next = self.leaf(id).next;
            return (next != NULL_NODE).then_some(NodeRef::Leaf(next));
        }
        self.neighbor(node, Side::Right)
    }

    fn neighbor(&self, node: NodeRef, side: Side) -> Option<NodeRef> {
        let mut current = node;
        let mut depth = 0;
        loop {
            let parent = self.parent_of(current);
            if parent == NULL_NODE {
                return None;
            }
            let index = self.child_position(parent, current);
            let siblings = &self.branch(parent).children;
            let step = match side {
                Side::Left => index.checked_sub(1),
                Side::Right => Some(index + 1).filter(|&i| i < siblings.len()),
            };

            if let Some(sibling) = step {
                let mut neighbor = siblings[sibling];
                for _ in 0..depth {
                    neighbor = match neighbor {
                        NodeRef::Branch(id) => {
                            let children = &self.branch(id).children;
                            match side {
                                Side::Left => children[children.len() - 1],
                                Side::Right => children[0],
                            }
                        }
                        NodeRef::Leaf(id) => panic!("leaf {} above the depth of {:?}", id, node),
                    };
                }
                return Some(neighbor);
            }

            current = NodeRef::Branch(parent);
            depth += 1;
        }
    }

    /// Smallest key stored under `node`.
    pub(crate) fn subtree_min(&self, node: NodeRef) -> &K {
        let mut current = node;
        loop {
            match current {
                NodeRef::Leaf(id) => return &self.leaf(id).keys[0],
                NodeRef::Branch(id) => current = self.branch(id).children[0],
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}
