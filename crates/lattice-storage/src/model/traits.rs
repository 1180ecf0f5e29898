//! Core traits for the model/view contract.
//!
//! This module defines the trait a tree model implements so views and
//! editors can address its items generically, plus the signals it emits.

use lattice_storage_core::Signal;

use super::index::ModelIndex;
use super::role::{ItemData, ItemRole};

/// Flags indicating what operations are allowed on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemFlags {
    /// Item can be selected.
    pub selectable: bool,
    /// Item can be edited.
    pub editable: bool,
    /// Item can be dragged.
    pub drag_enabled: bool,
    /// Item can receive drops.
    pub drop_enabled: bool,
    /// Item is enabled (can interact).
    pub enabled: bool,
    /// Item should never have children (optimizes views).
    pub never_has_children: bool,
}

impl ItemFlags {
    /// Creates flags with all defaults (selectable and enabled only).
    pub fn new() -> Self {
        Self {
            selectable: true,
            enabled: true,
            ..Default::default()
        }
    }

    /// Creates flags for a disabled item.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Sets the drag-enabled flag.
    pub fn with_drag_enabled(mut self, drag_enabled: bool) -> Self {
        self.drag_enabled = drag_enabled;
        self
    }

    /// Sets the drop-enabled flag.
    pub fn with_drop_enabled(mut self, drop_enabled: bool) -> Self {
        self.drop_enabled = drop_enabled;
        self
    }

    /// Sets the never-has-children flag.
    pub fn with_never_has_children(mut self, never_has_children: bool) -> Self {
        self.never_has_children = never_has_children;
        self
    }
}

/// The generic indexable-tree contract.
///
/// Addresses are [`ModelIndex`] values: rows under a parent, one column, and
/// a model-defined internal id. Data is read and written per [`ItemRole`].
pub trait ItemModel: Send + Sync {
    /// Returns the number of rows under the given parent.
    fn row_count(&self, parent: &ModelIndex) -> usize;

    /// Returns the number of columns for children of the given parent.
    fn column_count(&self, parent: &ModelIndex) -> usize;

    /// Returns the data stored under the given role for the item at index.
    ///
    /// Returns `ItemData::None` if the index is invalid or the item does not
    /// carry the role.
    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData;

    /// Creates a model index for the given row and column under parent.
    ///
    /// Returns `ModelIndex::invalid()` if the position is out of bounds.
    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex;

    /// Returns the parent of the given index, or an invalid index for
    /// top-level and invalid indices.
    fn parent(&self, index: &ModelIndex) -> ModelIndex;

    /// Returns the signals for this model.
    fn signals(&self) -> &ModelSignals;

    /// Sets the data for the given index and role.
    ///
    /// Returns `true` if the data was set. Implementations emit
    /// `data_changed` after a successful write and nothing otherwise.
    fn set_data(&self, _index: &ModelIndex, _value: ItemData, _role: ItemRole) -> bool {
        false
    }

    /// Returns the flags for the item at the given index.
    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        if index.is_valid() {
            ItemFlags::new()
        } else {
            ItemFlags::disabled()
        }
    }

    /// Returns `true` if the item at parent has any children.
    fn has_children(&self, parent: &ModelIndex) -> bool {
        self.row_count(parent) > 0
    }

    /// Returns the display text for an item.
    fn display_text(&self, index: &ModelIndex) -> Option<String> {
        self.data(index, ItemRole::Display).into_string()
    }

    /// Creates a sibling index at the given row and column.
    fn sibling(&self, index: &ModelIndex, row: usize, column: usize) -> ModelIndex {
        if !index.is_valid() {
            return ModelIndex::invalid();
        }
        self.index(row, column, &self.parent(index))
    }
}

/// Collection of signals emitted by item models.
///
/// - **Before modifications**: `rows_about_to_be_*` or `layout_about_to_change`
/// - **After modifications**: `rows_*` or `layout_changed`
/// - **Data changes**: `data_changed`
/// - **Major restructuring**: `model_*reset`
pub struct ModelSignals {
    /// Emitted just before rows are inserted.
    /// Args: (parent index, first row, last row)
    pub rows_about_to_be_inserted: Signal<(ModelIndex, usize, usize)>,

    /// Emitted after rows have been inserted.
    /// Args: (parent index, first row, last row)
    pub rows_inserted: Signal<(ModelIndex, usize, usize)>,

    /// Emitted just before rows are removed.
    /// Args: (parent index, first row, last row)
    pub rows_about_to_be_removed: Signal<(ModelIndex, usize, usize)>,

    /// Emitted after rows have been removed.
    /// Args: (parent index, first row, last row)
    pub rows_removed: Signal<(ModelIndex, usize, usize)>,

    /// Emitted when data in existing items changes.
    /// Args: (top-left index, bottom-right index, changed roles)
    pub data_changed: Signal<(ModelIndex, ModelIndex, Vec<ItemRole>)>,

    /// Emitted before a layout change (e.g., sorting).
    pub layout_about_to_change: Signal<()>,

    /// Emitted after a layout change.
    pub layout_changed: Signal<()>,

    /// Emitted before the model is reset.
    pub model_about_to_reset: Signal<()>,

    /// Emitted after the model has been reset.
    pub model_reset: Signal<()>,
}

impl Default for ModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSignals {
    /// Creates a new set of model signals.
    pub fn new() -> Self {
        Self {
            rows_about_to_be_inserted: Signal::new(),
            rows_inserted: Signal::new(),
            rows_about_to_be_removed: Signal::new(),
            rows_removed: Signal::new(),
            data_changed: Signal::new(),
            layout_about_to_change: Signal::new(),
            layout_changed: Signal::new(),
            model_about_to_reset: Signal::new(),
            model_reset: Signal::new(),
        }
    }

    /// Emits signals for row insertion.
    ///
    /// Calls the provided function between the about_to_be_inserted and
    /// inserted signals, and returns its result.
    pub fn emit_rows_inserted<F, R>(&self, parent: ModelIndex, first: usize, last: usize, insert_fn: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.rows_about_to_be_inserted.emit((parent, first, last));
        let result = insert_fn();
        self.rows_inserted.emit((parent, first, last));
        result
    }

    /// Emits signals for row removal.
    ///
    /// Calls the provided function between the about_to_be_removed and
    /// removed signals, and returns its result.
    pub fn emit_rows_removed<F, R>(&self, parent: ModelIndex, first: usize, last: usize, remove_fn: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.rows_about_to_be_removed.emit((parent, first, last));
        let result = remove_fn();
        self.rows_removed.emit((parent, first, last));
        result
    }

    /// Emits the data_changed signal for a single item.
    pub fn emit_data_changed_single(&self, index: ModelIndex, roles: Vec<ItemRole>) {
        self.data_changed.emit((index, index, roles));
    }

    /// Emits signals for a model reset around `reset_fn`.
    pub fn emit_reset<F>(&self, reset_fn: F)
    where
        F: FnOnce(),
    {
        self.model_about_to_reset.emit(());
        reset_fn();
        self.model_reset.emit(());
    }

    /// Emits signals for a layout change around `change_fn`.
    pub fn emit_layout_changed<F>(&self, change_fn: F)
    where
        F: FnOnce(),
    {
        self.layout_about_to_change.emit(());
        change_fn();
        self.layout_changed.emit(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_item_flags() {
        let flags = ItemFlags::new();
        assert!(flags.selectable);
        assert!(flags.enabled);
        assert!(!flags.editable);

        let flags = flags.with_drag_enabled(true).with_never_has_children(true);
        assert!(flags.drag_enabled);
        assert!(flags.never_has_children);
        assert!(!ItemFlags::disabled().enabled);
    }

    #[test]
    fn test_emit_rows_inserted_order() {
        let signals = ModelSignals::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_clone = log.clone();
        signals.rows_about_to_be_inserted.connect(move |(_, first, last)| {
            log_clone.lock().push(format!("about {first}-{last}"));
        });
        let log_clone = log.clone();
        signals.rows_inserted.connect(move |(_, first, last)| {
            log_clone.lock().push(format!("done {first}-{last}"));
        });

        let log_clone = log.clone();
        let value = signals.emit_rows_inserted(ModelIndex::invalid(), 2, 2, || {
            log_clone.lock().push("insert".to_string());
            7
        });

        assert_eq!(value, 7);
        assert_eq!(*log.lock(), vec!["about 2-2", "insert", "done 2-2"]);
    }

    #[test]
    fn test_emit_layout_changed() {
        let signals = ModelSignals::new();
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        signals.layout_changed.connect(move |_| *count_clone.lock() += 1);
        signals.emit_layout_changed(|| {});
        signals.emit_layout_changed(|| {});

        assert_eq!(*count.lock(), 2);
    }
}
