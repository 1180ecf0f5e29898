//! Flat storage configuration exchanged with the host dialog.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::medium::MediumId;
use super::types::{ControllerType, DeviceType, StorageBus};
use crate::error::{Error, Result};

/// One storage controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageControllerData {
    /// Controller name.
    pub name: String,
    /// Bus.
    pub bus: StorageBus,
    /// Controller type.
    pub controller_type: ControllerType,
    /// Port count.
    #[serde(default)]
    pub port_count: u32,
    /// Host IO cache.
    #[serde(default)]
    pub use_host_io_cache: bool,
}

impl StorageControllerData {
    /// Key identifying the controller within a machine.
    pub fn key(&self) -> &str {
        &self.name
    }
}

/// One device attached to a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAttachmentData {
    /// Device type.
    pub device_type: DeviceType,
    /// Port.
    pub port: u32,
    /// Device on the port.
    pub device: u32,
    /// Medium, `None` for an empty drive.
    #[serde(default)]
    pub medium_id: Option<MediumId>,
    /// Passthrough.
    #[serde(default)]
    pub passthrough: bool,
    /// Temporary eject.
    #[serde(default)]
    pub temp_eject: bool,
    /// Non-rotational.
    #[serde(default)]
    pub non_rotational: bool,
    /// Hot-pluggable.
    #[serde(default)]
    pub hot_pluggable: bool,
}

impl StorageAttachmentData {
    /// Key identifying the attachment within its controller.
    pub fn key(&self) -> String {
        format!("{}:{}", self.port, self.device)
    }
}

/// Controllers and, per controller, their attachments.
///
/// `attachments[i]` belongs to `controllers[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageSnapshot {
    /// Controllers in presentation order.
    pub controllers: Vec<StorageControllerData>,
    /// Attachments of each controller.
    pub attachments: Vec<Vec<StorageAttachmentData>>,
}

impl StorageSnapshot {
    /// Check the structural invariants a model can be loaded from.
    ///
    /// Capability limits are not checked here; the model enforces them.
    pub fn validate(&self) -> Result<()> {
        if self.attachments.len() != self.controllers.len() {
            return Err(Error::invalid_snapshot(
                "",
                format!(
                    "{} attachment lists for {} controllers",
                    self.attachments.len(),
                    self.controllers.len()
                ),
            ));
        }

        let mut names = HashSet::new();
        for (controller, attachments) in self.controllers.iter().zip(&self.attachments) {
            if controller.name.trim().is_empty() {
                return Err(Error::invalid_snapshot(&controller.name, "empty controller name"));
            }
            if !names.insert(controller.key()) {
                return Err(Error::invalid_snapshot(&controller.name, "duplicate controller name"));
            }

            let mut slots = HashSet::new();
            for attachment in attachments {
                if !slots.insert((attachment.port, attachment.device)) {
                    return Err(Error::invalid_snapshot(
                        &controller.name,
                        format!("slot {} used twice", attachment.key()),
                    ));
                }
                if attachment.medium_id.is_none() && !attachment.device_type.allows_empty() {
                    return Err(Error::invalid_snapshot(
                        &controller.name,
                        format!("hard disk at {} has no medium", attachment.key()),
                    ));
                }
            }
        }
        Ok(())
    }
}
