//! Model index for addressing items in hierarchical models.
//!
//! A `ModelIndex` names one item by its row and column within its parent plus
//! a model-defined internal id. The parent itself is not stored; ask the model
//! via `ItemModel::parent`.

/// Represents a position within an `ItemModel`.
///
/// # Index Validity
///
/// Indices are cheap `Copy` values and should be used immediately. After
/// insertions, removals or sorting, a stored index may name a different row.
/// Store item ids instead and re-resolve them.
///
/// # Example
///
/// ```ignore
/// // The single root item of a storage model
/// let root = model.index(0, 0, &ModelIndex::invalid());
///
/// // Its first controller
/// let controller = model.index(0, 0, &root);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelIndex {
    row: usize,
    column: usize,
    internal_id: u64,
    valid: bool,
}

impl Default for ModelIndex {
    fn default() -> Self {
        Self::invalid()
    }
}

impl ModelIndex {
    /// Creates an invalid (null) model index.
    ///
    /// An invalid index is used to represent the parent of top-level items
    /// and any non-existent or out-of-bounds item.
    #[inline]
    pub const fn invalid() -> Self {
        Self {
            row: 0,
            column: 0,
            internal_id: 0,
            valid: false,
        }
    }

    /// Creates a valid index carrying a model-specific internal id.
    #[inline]
    pub const fn with_internal_id(row: usize, column: usize, internal_id: u64) -> Self {
        Self {
            row,
            column,
            internal_id,
            valid: true,
        }
    }

    /// Returns `true` if this is a valid index.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns the row of this index within its parent.
    ///
    /// Returns 0 for invalid indices.
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Returns the column of this index within its parent.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Returns the internal id the model attached to this index.
    #[inline]
    pub fn internal_id(&self) -> u64 {
        self.internal_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_index() {
        let index = ModelIndex::invalid();
        assert!(!index.is_valid());
        assert_eq!(index, ModelIndex::default());
    }

    #[test]
    fn test_index_equality_uses_internal_id() {
        let a = ModelIndex::with_internal_id(0, 0, 7);
        let b = ModelIndex::with_internal_id(0, 0, 8);
        assert!(a.is_valid());
        assert_ne!(a, b);
        assert_eq!(a, ModelIndex::with_internal_id(0, 0, 7));
        assert_eq!(b.internal_id(), 8);
    }
}
