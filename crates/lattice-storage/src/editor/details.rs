//! Read-only views the editor hands to its host: the details of the current
//! item, which widgets are enabled and which actions are available.

use std::collections::BTreeMap;

use crate::storage::{
    ConfigurationAccessLevel, ControllerType, DeviceType, MediumDisplay, MediumId, NodeId, StorageBus, StorageSlot,
};

/// Which parts of the editor accept input at an access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaneAvailability {
    /// Tree and informational fields.
    pub tree: bool,
    /// Controller name, type, port count and IO cache.
    pub controller_fields: bool,
    /// Hard disk medium label.
    pub hard_disk_label: bool,
    /// Optical and floppy medium labels.
    pub removable_labels: bool,
    /// Slot combo.
    pub slot: bool,
    /// Open-medium button for the current attachment.
    pub open_medium: bool,
    /// Passthrough check box.
    pub passthrough: bool,
    /// Temporary eject check box.
    pub temp_eject: bool,
    /// Non-rotational check box.
    pub non_rotational: bool,
    /// Hot-pluggable check box.
    pub hot_pluggable: bool,
}

impl PaneAvailability {
    /// Availability at `level` with `device` as the current attachment's
    /// device type, if any.
    pub fn for_level(level: ConfigurationAccessLevel, device: Option<DeviceType>) -> Self {
        let offline = level == ConfigurationAccessLevel::Full;
        let online = level == ConfigurationAccessLevel::PartialRunning;
        let valid = level.is_valid();
        Self {
            tree: valid,
            controller_fields: offline,
            hard_disk_label: offline,
            removable_labels: offline || online,
            slot: offline,
            open_medium: offline || (online && device != Some(DeviceType::HardDisk)),
            passthrough: offline,
            temp_eject: valid,
            non_rotational: offline,
            hot_pluggable: offline,
        }
    }
}

/// Enabled state of the editor's actions for the current item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionStates {
    /// The add-controller menu as a whole.
    pub add_controller: bool,
    /// Each entry of the add-controller menu.
    pub add_controller_types: BTreeMap<ControllerType, bool>,
    /// Add-attachment actions.
    pub add_attachment: bool,
    /// Remove the current controller.
    pub remove_controller: bool,
    /// Remove the current attachment.
    pub remove_attachment: bool,
}

/// Fields of the current controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerDetails {
    pub id: NodeId,
    pub name: String,
    pub bus: StorageBus,
    pub controller_type: ControllerType,
    /// `(bus, type)` pairs offered by the type combo.
    pub type_choices: Vec<(StorageBus, ControllerType)>,
    /// Whether the port count spin box is shown.
    pub port_count_visible: bool,
    pub port_count: u32,
    pub max_port_count: u32,
    pub use_io_cache: bool,
}

/// Fields of the current attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDetails {
    pub id: NodeId,
    pub controller: NodeId,
    pub device_type: DeviceType,
    pub slot: StorageSlot,
    pub slots: Vec<StorageSlot>,
    pub medium_id: Option<MediumId>,
    pub host_drive: bool,
    /// Passthrough, only meaningful for host drives.
    pub passthrough: bool,
    /// Temporary eject, only meaningful for images.
    pub temp_eject: bool,
    pub non_rotational: bool,
    pub hot_pluggable: bool,
    /// Whether the medium may be changed at the current access level.
    pub editable: bool,
    pub display: MediumDisplay,
}

/// What the details pane shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemDetails {
    /// Nothing or the root is current.
    Empty,
    Controller(ControllerDetails),
    Attachment(AttachmentDetails),
}

impl ItemDetails {
    /// Current controller details, if a controller is current.
    pub fn as_controller(&self) -> Option<&ControllerDetails> {
        match self {
            Self::Controller(details) => Some(details),
            _ => None,
        }
    }

    /// Current attachment details, if an attachment is current.
    pub fn as_attachment(&self) -> Option<&AttachmentDetails> {
        match self {
            Self::Attachment(details) => Some(details),
            _ => None,
        }
    }
}

/// Whether the medium of an attachment may be changed.
pub(crate) fn attachment_editable(level: ConfigurationAccessLevel, device: DeviceType, hot_pluggable: bool) -> bool {
    match level {
        ConfigurationAccessLevel::Full => true,
        ConfigurationAccessLevel::PartialRunning => device != DeviceType::HardDisk || hot_pluggable,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pane_availability() {
        let full = PaneAvailability::for_level(ConfigurationAccessLevel::Full, None);
        assert!(full.controller_fields && full.slot && full.open_medium);

        let running = PaneAvailability::for_level(ConfigurationAccessLevel::PartialRunning, Some(DeviceType::HardDisk));
        assert!(running.tree);
        assert!(running.removable_labels);
        assert!(!running.hard_disk_label);
        assert!(!running.open_medium);
        assert!(running.temp_eject);
        assert!(!running.passthrough);

        let running_dvd = PaneAvailability::for_level(ConfigurationAccessLevel::PartialRunning, Some(DeviceType::Dvd));
        assert!(running_dvd.open_medium);

        assert_eq!(
            PaneAvailability::for_level(ConfigurationAccessLevel::Null, None),
            PaneAvailability::default()
        );
    }

    #[test]
    fn test_attachment_editable() {
        use ConfigurationAccessLevel::*;
        assert!(attachment_editable(Full, DeviceType::HardDisk, false));
        assert!(attachment_editable(PartialRunning, DeviceType::Dvd, false));
        assert!(!attachment_editable(PartialRunning, DeviceType::HardDisk, false));
        assert!(attachment_editable(PartialRunning, DeviceType::HardDisk, true));
        assert!(!attachment_editable(PartialSaved, DeviceType::Floppy, true));
    }
}
