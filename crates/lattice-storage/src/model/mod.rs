//! Model layer: generic tree addressing, roles and change signals.
//!
//! The storage model implements [`ItemModel`]; views and the settings editor
//! only talk to it through this contract.

mod index;
mod role;
mod traits;

pub use index::ModelIndex;
pub use role::{ItemData, ItemRole, Point, Rect, Size};
pub use traits::{ItemFlags, ItemModel, ModelSignals};
