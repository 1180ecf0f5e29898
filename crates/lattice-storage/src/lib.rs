//! Lattice Storage - storage controller and attachment editing for virtual
//! machine settings.
//!
//! The crate is organised in layers:
//!
//! - [`model`]: a generic tree-model contract (indices, roles, signals)
//! - [`storage`]: storage value types, the node arena and [`StorageModel`]
//! - [`editor`]: [`StorageSettingsEditor`], which routes user actions into
//!   the model and round-trips configuration snapshots
//! - [`config`]: platform capability profiles and layout metrics
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_storage::config::PlatformProfile;
//! use lattice_storage::editor::{NoSelection, StorageSettingsEditor};
//! use lattice_storage::storage::{
//!     AcceptAll, ConfigurationAccessLevel, ControllerType, DeviceType, MediumCache, StorageModel,
//! };
//!
//! let mediums = Arc::new(MediumCache::new());
//! let model = Arc::new(StorageModel::new(
//!     Arc::new(PlatformProfile::x86()),
//!     mediums.clone(),
//!     Arc::new(AcceptAll),
//! ));
//! let editor = Arc::new(StorageSettingsEditor::new(model, Arc::new(NoSelection)));
//! editor.connect_medium_cache(&mediums);
//! editor.set_configuration_access_level(ConfigurationAccessLevel::Full);
//!
//! editor.add_controller_of_type(ControllerType::Piix4);
//! assert_eq!(editor.attachment_device_choices(), vec![DeviceType::HardDisk, DeviceType::Dvd]);
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod model;
pub mod storage;

pub use editor::StorageSettingsEditor;
pub use error::{Error, Result};
pub use storage::StorageModel;

pub use lattice_storage_core::{Property, Signal};
