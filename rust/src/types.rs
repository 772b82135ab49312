//! Core types and data structures for BPlusTreeMap.
//!
//! This module contains the fundamental data structures, type definitions,
//! and constants used throughout the B+ tree implementation.

use crate::compact_arena::CompactArena;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Minimum capacity for any B+ tree node.
///
/// With a capacity of 2 the minimum occupancy is 1, so a non-root leaf can
/// drain completely and must be detached from the leaf chain.
pub const MIN_CAPACITY: usize = 2;

/// Default capacity for B+ tree nodes.
pub const DEFAULT_CAPACITY: usize = 16;

/// Maximum capacity for any B+ tree node. Nodes reserve room for a full
/// complement of entries when they are created.
pub const MAX_CAPACITY: usize = 1 << 16;

// ============================================================================
// TYPE DEFINITIONS
// ============================================================================

/// Node ID type for arena-based allocation
pub type NodeId = u32;

/// Sentinel for "no node": a missing parent, the end of the leaf chain, or the
/// end cursor.
pub const NULL_NODE: NodeId = u32::MAX;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// An ordered map backed by a B+ tree.
///
/// All entries live in leaves, which are linked left to right into a chain
/// whose order is the total key order. Branch nodes only route searches.
///
/// Every separator key stored in a branch equals the exact minimum key of the
/// subtree it routes to, so whenever a subtree's minimum changes the new
/// minimum is propagated upwards until it reaches the ancestor whose entry
/// refers to that subtree at a non-zero slot.
///
/// # Examples
///
/// ```
/// use bptree_map::BPlusTreeMap;
///
/// let mut tree = BPlusTreeMap::new(4).unwrap();
/// tree.insert(2, "two");
/// tree.insert(1, "one");
/// tree.insert(3, "three");
///
/// assert_eq!(tree.get(&2), Some(&"two"));
/// assert_eq!(tree.len(), 3);
///
/// let keys: Vec<_> = tree.keys().copied().collect();
/// assert_eq!(keys, vec![1, 2, 3]);
/// ```
///
/// # Performance Characteristics
///
/// - **Insertion**: O(log n)
/// - **Lookup**: O(log n)
/// - **Deletion**: O(log n)
/// - **Range queries**: O(log n + k) where k is the number of items in range
/// - **Iteration**: O(n), touching leaves only
pub struct BPlusTreeMap<K, V> {
    /// Maximum number of entries per node at rest.
    pub(crate) capacity: usize,
    /// The root node of the tree.
    pub(crate) root: NodeRef,
    /// Leftmost leaf, where iteration starts.
    pub(crate) first_leaf: NodeId,
    /// Number of key-value pairs stored.
    pub(crate) len: usize,
    /// Bumped by every mutation; cursors from an older epoch are stale.
    pub(crate) epoch: u64,
    /// Process-unique identity stamped into every cursor this tree hands out.
    pub(crate) tree_id: u64,
    /// Arena storage for leaf nodes.
    pub(crate) leaf_arena: CompactArena<LeafNode<K, V>>,
    /// Arena storage for branch nodes.
    pub(crate) branch_arena: CompactArena<BranchNode<K>>,
}

/// Leaf node containing key-value pairs.
#[derive(Debug, Clone)]
pub struct LeafNode<K, V> {
    /// Maximum number of keys this node can hold.
    pub(crate) capacity: usize,
    /// Sorted list of keys.
    pub(crate) keys: Vec<K>,
    /// List of values corresponding to keys.
    pub(crate) values: Vec<V>,
    /// Next leaf node in the linked list (for range queries).
    pub(crate) next: NodeId,
    /// Branch holding this leaf, `NULL_NODE` for the root.
    pub(crate) parent: NodeId,
}

/// Internal (branch) node containing separator keys and child references.
///
/// `keys[i - 1]` is the exact minimum key of `children[i]`; the minimum of
/// `children[0]` is not stored here but by an ancestor.
#[derive(Debug, Clone)]
pub struct BranchNode<K> {
    /// Maximum number of children this node can hold.
    pub(crate) capacity: usize,
    /// Sorted list of separator keys.
    pub(crate) keys: Vec<K>,
    /// List of child nodes (leaves or other branches).
    pub(crate) children: Vec<NodeRef>,
    /// Branch holding this branch, `NULL_NODE` for the root.
    pub(crate) parent: NodeId,
}

// ============================================================================
// ENUMS AND HANDLES
// ============================================================================

/// Node reference that can be either a leaf or branch node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Leaf(NodeId),
    Branch(NodeId),
}

impl NodeRef {
    /// Return the raw node ID.
    pub fn id(&self) -> NodeId {
        match *self {
            NodeRef::Leaf(id) => id,
            NodeRef::Branch(id) => id,
        }
    }

    /// Returns true if this reference points to a leaf node.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeRef::Leaf(_))
    }
}

/// A position in the tree: a leaf and a slot within it.
///
/// Cursors are plain handles and do not borrow the tree. Any insertion or
/// erasure invalidates every cursor obtained before it, and a cursor is only
/// meaningful to the tree that produced it. Using a stale or foreign cursor
/// yields [`BPlusTreeError::InvalidCursor`](crate::BPlusTreeError::InvalidCursor)
/// instead of reading whatever now occupies the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub(crate) leaf: NodeId,
    pub(crate) slot: usize,
    pub(crate) tree_id: u64,
    pub(crate) epoch: u64,
}

impl Cursor {
    pub(crate) fn new(leaf: NodeId, slot: usize, tree_id: u64, epoch: u64) -> Self {
        Self {
            leaf,
            slot,
            tree_id,
            epoch,
        }
    }

    pub(crate) fn end(tree_id: u64, epoch: u64) -> Self {
        Self {
            leaf: NULL_NODE,
            slot: 0,
            tree_id,
            epoch,
        }
    }

    /// Returns true if this is the past-the-end cursor.
    pub fn is_end(&self) -> bool {
        self.leaf == NULL_NODE
    }
}
