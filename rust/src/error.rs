//! Error handling and result types for BPlusTreeMap operations.

use thiserror::Error;

/// Error type for B+ tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BPlusTreeError {
    /// Key not found in the tree.
    #[error("Key not found in tree")]
    KeyNotFound,
    /// Invalid capacity specified.
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),
    /// Cursor is the end sentinel, predates the latest mutation or belongs to
    /// another tree.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    /// Internal data structure integrity violation.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),
    /// Tree corruption detected.
    #[error("Corrupted tree: {0}")]
    CorruptedTree(String),
}

impl BPlusTreeError {
    /// Create an InvalidCapacity error with context
    pub fn invalid_capacity(capacity: usize, min_required: usize) -> Self {
        Self::InvalidCapacity(format!(
            "Capacity {} is invalid (minimum required: {})",
            capacity, min_required
        ))
    }

    /// Create an InvalidCapacity error for a capacity above the supported maximum
    pub fn capacity_too_large(capacity: usize, max_allowed: usize) -> Self {
        Self::InvalidCapacity(format!(
            "Capacity {} is invalid (maximum allowed: {})",
            capacity, max_allowed
        ))
    }

    /// Create an InvalidCursor error for a cursor from an older epoch
    pub fn stale_cursor(cursor_epoch: u64, tree_epoch: u64) -> Self {
        Self::InvalidCursor(format!(
            "cursor from epoch {} used at epoch {}",
            cursor_epoch, tree_epoch
        ))
    }

    /// Create an InvalidCursor error for a cursor handed out by another tree
    pub fn foreign_cursor() -> Self {
        Self::InvalidCursor("cursor belongs to a different tree".to_string())
    }

    /// Create an InvalidCursor error for a range whose end precedes its start
    pub fn inverted_cursors() -> Self {
        Self::InvalidCursor("range end precedes its start".to_string())
    }

    /// Create an InvalidCursor error for dereferencing past the end
    pub fn end_cursor(operation: &str) -> Self {
        Self::InvalidCursor(format!("cannot {} at the end position", operation))
    }

    /// Create a DataIntegrityError with context
    pub fn data_integrity(context: &str, details: &str) -> Self {
        Self::DataIntegrityError(format!("{}: {}", context, details))
    }

    /// Create a CorruptedTree error with context
    pub fn corrupted_tree(component: &str, details: &str) -> Self {
        Self::CorruptedTree(format!("{} corruption: {}", component, details))
    }

    /// Check if this error is a capacity error
    pub fn is_capacity_error(&self) -> bool {
        matches!(self, Self::InvalidCapacity(_))
    }

    /// Check if this error is a cursor error
    pub fn is_cursor_error(&self) -> bool {
        matches!(self, Self::InvalidCursor(_))
    }
}

/// Public result type for tree operations that may fail
pub type BTreeResult<T> = Result<T, BPlusTreeError>;

/// Result type for key lookup operations
pub type KeyResult<T> = Result<T, BPlusTreeError>;

/// Result type for tree modification operations
pub type ModifyResult<T> = Result<T, BPlusTreeError>;

/// Result type for tree construction
pub type InitResult<T> = Result<T, BPlusTreeError>;
