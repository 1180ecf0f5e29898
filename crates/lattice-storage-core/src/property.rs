//! Reactive property cells.
//!
//! A [`Property<T>`] holds a value behind a lock and reports whether writes
//! actually changed it, so the owner knows when to emit its notification
//! signal.
//!
//! # Example
//!
//! ```
//! use lattice_storage_core::{Property, Signal};
//!
//! struct PortCount {
//!     value: Property<u32>,
//!     changed: Signal<u32>,
//! }
//!
//! impl PortCount {
//!     fn set(&self, ports: u32) {
//!         if self.value.set(ports) {
//!             self.changed.emit(ports);
//!         }
//!     }
//! }
//!
//! let ports = PortCount { value: Property::new(1), changed: Signal::new() };
//! ports.set(4);
//! assert_eq!(ports.value.get(), 4);
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A reactive property that tracks changes.
///
/// `Property<T>` wraps a value and provides change detection. When `set()` is
/// called, it compares the new value with the current one and returns whether
/// the value actually changed.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change detection.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    ///
    /// The caller should emit the associated notification signal when this
    /// returns `true`.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_set_reports_change() {
        let prop = Property::new(42);
        assert!(!prop.set(42));
        assert!(prop.set(100));
        assert_eq!(prop.get(), 100);
    }

    #[test]
    fn test_property_with() {
        let prop = Property::new("PIIX3".to_string());
        assert!(prop.set("AHCI".to_string()));
        assert_eq!(prop.with(|v| v.len()), 4);
    }

    #[test]
    fn test_property_set_silent() {
        let prop = Property::<u8>::default();
        prop.set_silent(7);
        assert_eq!(prop.get(), 7);
    }
}
