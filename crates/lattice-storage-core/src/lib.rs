//! Core systems for Lattice Storage.
//!
//! This crate provides the foundational pieces the storage model is built on:
//!
//! - **Signal/Slot System**: Type-safe change notification
//! - **Property System**: Value cells with change detection
//! - **Logging**: Tracing targets and tree dumps
//!
//! # Signal/Slot Example
//!
//! ```
//! use lattice_storage_core::{Property, Signal};
//!
//! let level = Property::new(0u8);
//! let level_changed = Signal::<u8>::new();
//!
//! let conn_id = level_changed.connect(|value| {
//!     println!("Access level changed to: {}", value);
//! });
//!
//! if level.set(3) {
//!     level_changed.emit(3);
//! }
//! level_changed.disconnect(conn_id);
//! ```

pub mod logging;
pub mod property;
pub mod signal;

pub use logging::{PerfSpan, TreeFormatOptions, TreeFormatter, TreeLine, TreeStyle};
pub use property::Property;
pub use signal::{ConnectionId, Signal};
