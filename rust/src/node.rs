//! Node-level primitives for LeafNode and BranchNode.
//!
//! Everything here touches a single node. Operations that must keep parents,
//! siblings or the leaf chain consistent live on `BPlusTreeMap` in the
//! `insert_operations` and `delete_operations` modules.

use crate::types::{BranchNode, LeafNode, NodeRef};

// ============================================================================
// LEAF NODE IMPLEMENTATION
// ============================================================================

impl<K: Ord, V> LeafNode<K, V> {
    /// Returns the number of key-value pairs in this leaf.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if this leaf node is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Smallest key stored here.
    pub fn first_key(&self) -> Option<&K> {
        self.keys.first()
    }

    /// Returns the minimum number of entries a non-root leaf must keep.
    pub fn min_keys(&self) -> usize {
        self.capacity.div_ceil(2)
    }

    /// Returns true once an insertion pushed the leaf past its capacity.
    pub fn is_overfull(&self) -> bool {
        self.keys.len() > self.capacity
    }

    /// Returns true if this leaf node is underfull (below minimum occupancy).
    pub fn is_underfull(&self) -> bool {
        self.keys.len() < self.min_keys()
    }

    /// Binary search for `key`.
    pub fn search(&self, key: &K) -> Result<usize, usize> {
        self.keys.binary_search(key)
    }

    /// Slot of the first key `>= key`, or `len()` if there is none.
    pub fn lower_slot(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k < key)
    }

    /// Slot of the first key `> key`, or `len()` if there is none.
    pub fn upper_slot(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    /// Insert a key-value pair at the specified index.
    pub fn insert_at(&mut self, index: usize, key: K, value: V) {
        self.keys.insert(index, key);
        self.values.insert(index, value);
    }

    /// Remove and return the pair at `index`.
    pub fn remove_at(&mut self, index: usize) -> (K, V) {
        (self.keys.remove(index), self.values.remove(index))
    }

    /// Move the upper half of the entries into a new right sibling.
    ///
    /// The sibling takes over this leaf's right-link and parent; the caller
    /// links this leaf to the sibling once it has an id.
    pub fn split_off_upper(&mut self) -> LeafNode<K, V> {
        let keep = self.keys.len().div_ceil(2);
        LeafNode {
            capacity: self.capacity,
            keys: self.keys.split_off(keep),
            values: self.values.split_off(keep),
            next: self.next,
            parent: self.parent,
        }
    }
}

// ============================================================================
// BRANCH NODE IMPLEMENTATION
// ============================================================================

impl<K: Ord> BranchNode<K> {
    /// Returns the number of children, the occupancy of a branch.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns true if this branch has no children left.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the minimum number of children a non-root branch must keep.
    pub fn min_children(&self) -> usize {
        self.capacity.div_ceil(2)
    }

    /// Returns true once a push left the branch with more than capacity children.
    pub fn is_overfull(&self) -> bool {
        self.children.len() > self.capacity
    }

    /// Returns true if this branch node is underfull (below minimum occupancy).
    pub fn is_underfull(&self) -> bool {
        self.children.len() < self.min_children()
    }

    /// Index of the child to descend into for `key`: the rightmost child whose
    /// separator is `<= key`, or child 0 when every separator is greater.
    pub fn find_child_index(&self, key: &K) -> usize {
        match self.keys.binary_search(key) {
            Ok(index) => index + 1,
            Err(index) => index,
        }
    }

    /// Slot of `child` in this branch.
    pub fn child_position(&self, child: NodeRef) -> Option<usize> {
        self.children.iter().position(|c| *c == child)
    }

    /// Insert `child` right after slot `index`, with `separator` as its key.
    pub fn insert_child_after(&mut self, index: usize, separator: K, child: NodeRef) {
        self.keys.insert(index, separator);
        self.children.insert(index + 1, child);
    }

    /// Remove the child at `index` together with its separator.
    ///
    /// Removing slot 0 promotes the old `keys[0]` to be the minimum of the
    /// whole branch, which is returned so the caller can propagate it.
    pub fn remove_child_at(&mut self, index: usize) -> Option<K> {
        self.children.remove(index);
        if index == 0 {
            if self.keys.is_empty() {
                None
            } else {
                Some(self.keys.remove(0))
            }
        } else {
            self.keys.remove(index - 1);
            None
        }
    }

    /// Split this branch, returning the new right node and promoted key.
    ///
    /// The separator of the first child moved right is removed from both
    /// halves and returned; it is the exact minimum of the new sibling.
    pub fn split_off_upper(&mut self) -> (BranchNode<K>, K) {
        let keep = self.children.len().div_ceil(2);
        let right_children = self.children.split_off(keep);
        let mut right_keys = self.keys.split_off(keep - 1);
        let promoted_key = right_keys.remove(0);

        let new_right = BranchNode {
            capacity: self.capacity,
            keys: right_keys,
            children: right_children,
            parent: self.parent,
        };

        (new_right, promoted_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NULL_NODE;

    fn leaf_with(capacity: usize, keys: &[i32]) -> LeafNode<i32, i32> {
        let mut leaf = LeafNode::new(capacity);
        for &k in keys {
            let slot = leaf.lower_slot(&k);
            leaf.insert_at(slot, k, k * 10);
        }
        leaf
    }

    fn branch_with(capacity: usize, children: u32) -> BranchNode<i32> {
        let mut branch = BranchNode::new(capacity);
        branch.children = (0..children).map(NodeRef::Leaf).collect();
        branch.keys = (1..children as i32).map(|i| i * 10).collect();
        branch
    }

    #[test]
    fn test_leaf_slots() {
        let leaf = leaf_with(8, &[10, 20, 30]);
        assert_eq!(leaf.lower_slot(&20), 1);
        assert_eq!(leaf.upper_slot(&20), 2);
        assert_eq!(leaf.lower_slot(&5), 0);
        assert_eq!(leaf.lower_slot(&35), 3);
        assert_eq!(leaf.search(&30), Ok(2));
        assert_eq!(leaf.search(&25), Err(2));
    }

    #[test]
    fn test_leaf_split_keeps_lower_half() {
        let mut leaf = leaf_with(4, &[1, 2, 3, 4, 5]);
        leaf.next = 7;
        assert!(leaf.is_overfull());

        let right = leaf.split_off_upper();
        assert_eq!(leaf.keys, vec![1, 2, 3]);
        assert_eq!(right.keys, vec![4, 5]);
        assert_eq!(right.values, vec![40, 50]);
        assert_eq!(right.next, 7);
        assert_eq!(right.parent, NULL_NODE);
        assert!(!leaf.is_underfull());
        assert!(!right.is_underfull());
    }

    #[test]
    fn test_leaf_min_keys_rounds_up() {
        assert_eq!(LeafNode::<i32, i32>::new(2).min_keys(), 1);
        assert_eq!(LeafNode::<i32, i32>::new(4).min_keys(), 2);
        assert_eq!(LeafNode::<i32, i32>::new(5).min_keys(), 3);
    }

    #[test]
    fn test_leaf_remove_at() {
        let mut leaf = leaf_with(4, &[1, 2, 3]);
        assert_eq!(leaf.remove_at(0), (1, 10));
        assert_eq!(leaf.first_key(), Some(&2));
        assert_eq!(leaf.len(), 2);
    }

    #[test]
    fn test_find_child_index() {
        let branch = branch_with(4, 3); // separators 10, 20
        assert_eq!(branch.find_child_index(&5), 0);
        assert_eq!(branch.find_child_index(&10), 1);
        assert_eq!(branch.find_child_index(&15), 1);
        assert_eq!(branch.find_child_index(&20), 2);
        assert_eq!(branch.find_child_index(&99), 2);
    }

    #[test]
    fn test_branch_split_promotes_middle_separator() {
        let mut branch = branch_with(4, 5); // separators 10, 20, 30, 40
        assert!(branch.is_overfull());

        let (right, promoted) = branch.split_off_upper();
        assert_eq!(promoted, 30);
        assert_eq!(branch.children.len(), 3);
        assert_eq!(branch.keys, vec![10, 20]);
        assert_eq!(right.children, vec![NodeRef::Leaf(3), NodeRef::Leaf(4)]);
        assert_eq!(right.keys, vec![40]);
    }

    #[test]
    fn test_remove_child_at_reports_new_minimum() {
        let mut branch = branch_with(4, 3);
        assert_eq!(branch.remove_child_at(0), Some(10));
        assert_eq!(branch.keys, vec![20]);
        assert_eq!(branch.children, vec![NodeRef::Leaf(1), NodeRef::Leaf(2)]);

        assert_eq!(branch.remove_child_at(1), None);
        assert!(branch.keys.is_empty());
        assert_eq!(branch.child_position(NodeRef::Leaf(1)), Some(0));

        assert_eq!(branch.remove_child_at(0), None);
        assert!(branch.is_empty());
    }

    #[test]
    fn test_insert_child_after() {
        let mut branch = branch_with(4, 2); // separator 10
        branch.insert_child_after(0, 5, NodeRef::Leaf(9));
        assert_eq!(branch.keys, vec![5, 10]);
        assert_eq!(branch.child_position(NodeRef::Leaf(9)), Some(1));
    }
}
