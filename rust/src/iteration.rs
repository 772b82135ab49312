//! Cursor navigation and iterator implementations for BPlusTreeMap.
//!
//! Iteration never touches branches once it has a starting leaf: it walks the
//! leaf chain through each leaf's right-link.

use std::fmt;
use std::ops::{Bound, RangeBounds};

use crate::error::{BPlusTreeError, BTreeResult};
use crate::types::{BPlusTreeMap, Cursor, LeafNode, NULL_NODE};

// ============================================================================
// ITERATOR STRUCTS
// ============================================================================

/// Iterator over key-value pairs in the B+ tree using the leaf linked list.
pub struct ItemIterator<'a, K, V> {
    tree: &'a BPlusTreeMap<K, V>,
    /// Leaf being read, held so stepping within it needs no arena lookup.
    current_leaf_ref: Option<&'a LeafNode<K, V>>,
    current_leaf_index: usize,
    end_bound_key: Option<K>,
    end_inclusive: bool,
    finished: bool,
}

/// Iterator over keys in the B+ tree.
pub struct KeyIterator<'a, K, V> {
    items: ItemIterator<'a, K, V>,
}

/// Iterator over values in the B+ tree.
pub struct ValueIterator<'a, K, V> {
    items: ItemIterator<'a, K, V>,
}

// ============================================================================
// CURSOR NAVIGATION
// ============================================================================

impl<K, V> BPlusTreeMap<K, V> {
    /// Cursor at the smallest entry, or the end cursor for an empty tree.
    pub fn begin(&self) -> Cursor {
        self.cursor_at(self.first_leaf, 0)
    }

    /// The past-the-end cursor.
    pub fn end(&self) -> Cursor {
        Cursor::end(self.tree_id, self.epoch)
    }

    /// Fails unless `cursor` came from this tree at its current epoch. The
    /// end cursor passes.
    pub(crate) fn check_position(&self, cursor: Cursor) -> BTreeResult<()> {
        if cursor.tree_id != self.tree_id {
            return Err(BPlusTreeError::foreign_cursor());
        }
        if cursor.epoch != self.epoch {
            return Err(BPlusTreeError::stale_cursor(cursor.epoch, self.epoch));
        }
        if cursor.is_end() {
            return Ok(());
        }
        match self.leaf_arena.get(cursor.leaf) {
            Some(leaf) if cursor.slot < leaf.keys.len() => Ok(()),
            _ => Err(BPlusTreeError::data_integrity(
                "cursor",
                &format!("leaf {} has no slot {}", cursor.leaf, cursor.slot),
            )),
        }
    }

    /// Fails unless `cursor` is current and points at an entry.
    pub(crate) fn check_cursor(&self, cursor: Cursor, operation: &str) -> BTreeResult<()> {
        self.check_position(cursor)?;
        if cursor.is_end() {
            return Err(BPlusTreeError::end_cursor(operation));
        }
        Ok(())
    }

    /// The entry under `cursor`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let tree = BPlusTreeMap::from([(1, "a"), (2, "b")]);
    /// let cursor = tree.find(&2);
    /// assert_eq!(tree.entry_at(cursor).unwrap(), (&2, &"b"));
    /// assert!(tree.entry_at(tree.end()).is_err());
    /// ```
    pub fn entry_at(&self, cursor: Cursor) -> BTreeResult<(&K, &V)> {
        self.check_cursor(cursor, "dereference")?;
        let leaf = self.leaf(cursor.leaf);
        Ok((&leaf.keys[cursor.slot], &leaf.values[cursor.slot]))
    }

    /// Mutable access to the value under `cursor`. Keys are never mutable.
    pub fn value_at_mut(&mut self, cursor: Cursor) -> BTreeResult<&mut V> {
        self.check_cursor(cursor, "dereference")?;
        Ok(&mut self.leaf_mut(cursor.leaf).values[cursor.slot])
    }

    /// Advance `cursor` by one entry, following the right-link off the end of
    /// a leaf.
    pub fn next_cursor(&self, cursor: Cursor) -> BTreeResult<Cursor> {
        self.check_cursor(cursor, "advance")?;
        Ok(self.cursor_at(cursor.leaf, cursor.slot + 1))
    }
}

// ============================================================================
// BPLUSTREE ITERATOR METHODS
// ============================================================================

impl<K: Ord, V> BPlusTreeMap<K, V> {
    /// Returns an iterator over all key-value pairs in sorted order.
    pub fn items(&self) -> ItemIterator<'_, K, V> {
        ItemIterator::new(self)
    }

    /// Alias of [`items`](Self::items).
    pub fn iter(&self) -> ItemIterator<'_, K, V> {
        self.items()
    }

    /// Returns an iterator over all keys in sorted order.
    pub fn keys(&self) -> KeyIterator<'_, K, V> {
        KeyIterator {
            items: self.items(),
        }
    }

    /// Returns an iterator over all values in key order.
    pub fn values(&self) -> ValueIterator<'_, K, V> {
        ValueIterator {
            items: self.items(),
        }
    }

    /// Iterate from `cursor` to the end of the tree.
    ///
    /// The end cursor yields an empty iterator; a stale or foreign cursor is
    /// an error.
    pub fn iter_from(&self, cursor: Cursor) -> BTreeResult<ItemIterator<'_, K, V>> {
        self.check_position(cursor)?;
        Ok(ItemIterator::at_cursor(self, cursor))
    }
}

impl<K: Ord + Clone, V> BPlusTreeMap<K, V> {
    /// Returns an iterator over the entries whose keys lie in `range`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree_map::BPlusTreeMap;
    ///
    /// let tree: BPlusTreeMap<i32, i32> = (0..20).map(|i| (i, i * i)).collect();
    /// let squares: Vec<_> = tree.range(3..=5).map(|(_, v)| *v).collect();
    /// assert_eq!(squares, vec![9, 16, 25]);
    /// ```
    pub fn range<R>(&self, range: R) -> ItemIterator<'_, K, V>
    where
        R: RangeBounds<K>,
    {
        let start = match range.start_bound() {
            Bound::Included(key) => self.lower_bound(key),
            Bound::Excluded(key) => self.upper_bound(key),
            Bound::Unbounded => self.begin(),
        };
        let mut iter = ItemIterator::at_cursor(self, start);
        match range.end_bound() {
            Bound::Included(key) => {
                iter.end_bound_key = Some(key.clone());
                iter.end_inclusive = true;
            }
            Bound::Excluded(key) => iter.end_bound_key = Some(key.clone()),
            Bound::Unbounded => {}
        }
        iter
    }
}

// ============================================================================
// ITEMITERATOR IMPLEMENTATION
// ============================================================================

impl<'a, K: Ord, V> ItemIterator<'a, K, V> {
    fn new(tree: &'a BPlusTreeMap<K, V>) -> Self {
        Self::at_cursor(tree, tree.begin())
    }

    fn at_cursor(tree: &'a BPlusTreeMap<K, V>, cursor: Cursor) -> Self {
        let current_leaf_ref = (!cursor.is_end()).then(|| tree.leaf(cursor.leaf));
        Self {
            tree,
            current_leaf_ref,
            current_leaf_index: cursor.slot,
            end_bound_key: None,
            end_inclusive: false,
            finished: current_leaf_ref.is_none(),
        }
    }

    /// Helper method to try getting the next item from the current leaf
    fn try_get_next_item(&mut self, leaf: &'a LeafNode<K, V>) -> Option<(&'a K, &'a V)> {
        let key = leaf.keys.get(self.current_leaf_index)?;
        let value = &leaf.values[self.current_leaf_index];

        let beyond_end = self
            .end_bound_key
            .as_ref()
            .map(|end| if self.end_inclusive { key > end } else { key >= end })
            .unwrap_or(false);

        if beyond_end {
            self.finished = true;
            return None;
        }

        self.current_leaf_index += 1;
        Some((key, value))
    }

    /// Move to the next leaf in the chain. Returns false at the end.
    fn advance_to_next_leaf(&mut self) -> bool {
        let next = match self.current_leaf_ref {
            Some(leaf) if leaf.next != NULL_NODE => leaf.next,
            _ => return false,
        };
        self.current_leaf_ref = Some(self.tree.leaf(next));
        self.current_leaf_index = 0;
        true
    }
}

impl<'a, K: Ord, V> Iterator for ItemIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if let Some(item) = self
                .current_leaf_ref
                .and_then(|leaf| self.try_get_next_item(leaf))
            {
                return Some(item);
            }
            if self.finished || !self.advance_to_next_leaf() {
                self.finished = true;
            }
        }
        None
    }
}

// ============================================================================
// KEYITERATOR / VALUEITERATOR IMPLEMENTATION
// ============================================================================

impl<'a, K: Ord, V> Iterator for KeyIterator<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(|(k, _)| k)
    }
}

impl<'a, K: Ord, V> Iterator for ValueIterator<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(|(_, v)| v)
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a BPlusTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = ItemIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.items()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for BPlusTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.items()).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::BPlusTreeMap;

    fn sample(capacity: usize, n: i32) -> BPlusTreeMap<i32, i32> {
        let mut tree = BPlusTreeMap::new(capacity).unwrap();
        for i in 0..n {
            tree.insert(i * 2, i);
        }
        tree
    }

    #[test]
    fn test_items_follow_leaf_chain() {
        let tree = sample(4, 100);
        let keys: Vec<i32> = tree.keys().copied().collect();
        assert_eq!(keys, (0..100).map(|i| i * 2).collect::<Vec<_>>());
        let values: Vec<i32> = tree.values().copied().collect();
        assert_eq!(values, (0..100).collect::<Vec<_>>());
        assert_eq!((&tree).into_iter().count(), 100);
    }

    #[test]
    fn test_empty_tree_iteration() {
        let tree: BPlusTreeMap<i32, i32> = BPlusTreeMap::new(4).unwrap();
        assert_eq!(tree.begin(), tree.end());
        assert_eq!(tree.items().next(), None);
        assert_eq!(tree.range(..).count(), 0);
    }

    #[test]
    fn test_cursor_walk_matches_items() {
        let tree = sample(3, 50);
        let mut cursor = tree.begin();
        let mut walked = Vec::new();
        while cursor != tree.end() {
            walked.push(*tree.entry_at(cursor).unwrap().0);
            cursor = tree.next_cursor(cursor).unwrap();
        }
        assert_eq!(walked, tree.keys().copied().collect::<Vec<_>>());
        assert!(tree.next_cursor(cursor).unwrap_err().is_cursor_error());
    }

    #[test]
    fn test_range_bounds() {
        let tree = sample(4, 50); // keys 0, 2, ..., 98
        let collect = |iter: super::ItemIterator<'_, i32, i32>| -> Vec<i32> {
            iter.map(|(k, _)| *k).collect()
        };
        assert_eq!(collect(tree.range(10..16)), vec![10, 12, 14]);
        assert_eq!(collect(tree.range(9..=16)), vec![10, 12, 14, 16]);
        assert_eq!(collect(tree.range(95..)), vec![96, 98]);
        assert_eq!(collect(tree.range(..3)), vec![0, 2]);
        assert_eq!(
            collect(tree.range((std::ops::Bound::Excluded(10), std::ops::Bound::Excluded(16)))),
            vec![12, 14]
        );
        assert!(collect(tree.range(200..300)).is_empty());
    }

    #[test]
    fn test_iter_from_cursor() {
        let tree = sample(4, 20);
        let tail: Vec<i32> = tree
            .iter_from(tree.find(&30))
            .unwrap()
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(tail, vec![30, 32, 34, 36, 38]);
        assert_eq!(tree.iter_from(tree.end()).unwrap().count(), 0);
    }

    #[test]
    fn test_stale_cursor_is_rejected() {
        let mut tree = sample(4, 20);
        let cursor = tree.find(&10);
        tree.insert(11, 0);
        assert!(tree.entry_at(cursor).unwrap_err().is_cursor_error());
        assert!(tree.value_at_mut(cursor).is_err());
        assert!(tree.iter_from(cursor).is_err());

        let fresh = tree.find(&10);
        *tree.value_at_mut(fresh).unwrap() = -1;
        assert_eq!(tree.get(&10), Some(&-1));
    }

    #[test]
    fn test_debug_renders_as_map() {
        let tree = BPlusTreeMap::from([(2, 'b'), (1, 'a')]);
        assert_eq!(format!("{:?}", tree), "{1: 'a', 2: 'b'}");
    }
}
