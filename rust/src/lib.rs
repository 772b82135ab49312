//! B+ tree ordered map in Rust with arena-backed nodes.
//!
//! This crate provides [`BPlusTreeMap`], an in-memory ordered map. All
//! entries live in leaves linked into a chain for ordered traversal; branches
//! store the exact minimum key of each child subtree but the first. Nodes are
//! kept in two arenas owned by the tree and refer to each other by
//! [`NodeId`], including a back-reference from every node to its parent.
//!
//! Positions are exposed as [`Cursor`] handles. A cursor does not borrow the
//! tree, so it survives across calls, but any insertion or erasure makes
//! earlier cursors stale and the tree rejects them with
//! [`BPlusTreeError::InvalidCursor`]. Cursors from a different tree are
//! rejected the same way.
//!
//! # Examples
//!
//! ```
//! use bptree_map::BPlusTreeMap;
//!
//! let mut tree = BPlusTreeMap::new(4).unwrap();
//! for i in 1..=10 {
//!     tree.insert(i, i * 10);
//! }
//! assert_eq!(tree.height(), 2);
//!
//! let mut cursor = tree.find(&4);
//! cursor = tree.erase_at(cursor).unwrap();
//! assert_eq!(tree.entry_at(cursor).unwrap(), (&5, &50));
//!
//! let tail: Vec<_> = tree.range(8..).map(|(k, _)| *k).collect();
//! assert_eq!(tail, vec![8, 9, 10]);
//! ```

mod compact_arena;
mod construction;
mod delete_operations;
mod error;
mod get_operations;
mod insert_operations;
mod iteration;
mod node;
mod types;
mod validation;

pub use compact_arena::{CompactArena, CompactArenaStats};
pub use error::{BPlusTreeError, BTreeResult, InitResult, KeyResult, ModifyResult};
pub use iteration::{ItemIterator, KeyIterator, ValueIterator};
pub use types::{
    BPlusTreeMap, BranchNode, Cursor, LeafNode, NodeId, NodeRef, DEFAULT_CAPACITY,
    MAX_CAPACITY, MIN_CAPACITY, NULL_NODE,
};
