//! Storage domain: value types, the node arena and the tree model.
//!
//! # Collaborators
//!
//! The model never talks to a hypervisor or a GUI directly. Everything it
//! needs from the outside comes through three traits:
//!
//! - [`PlatformProperties`]: bus and controller capabilities
//! - [`MediumEnumerator`]: medium metadata
//! - [`MessageCenter`]: user confirmations for destructive edits

mod confirm;
mod data;
mod medium;
mod model;
mod platform;
mod role;
mod tree;
mod types;

pub use confirm::{AcceptAll, MessageCenter};
pub use data::{StorageAttachmentData, StorageControllerData, StorageSnapshot};
pub use medium::{Medium, MediumCache, MediumEnumerator, MediumId};
pub use model::{SortOrder, StorageModel};
pub use platform::PlatformProperties;
pub use role::{StorageRole, ToolTipKind};
pub use tree::{
    AttachmentItem, ControllerItem, Item, ItemKind, ItemState, MediumDisplay, NodeId, PixmapKey, StorageTree,
};
pub use types::{
    ALL_BUSES, ChipsetType, ConfigurationAccessLevel, ControllerType, DeviceType, ParseSlotError, StorageBus,
    StorageSlot,
};
