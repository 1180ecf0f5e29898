//! Storage-specific roles.

use super::types::{DeviceType, StorageBus};

/// Which tooltip a controller row shows, depending on what the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolTipKind {
    /// The controller itself.
    #[default]
    Default,
    /// The expand/collapse arrow.
    Expander,
    /// The inline "add hard disk" button.
    HardDiskAdder,
    /// The inline "add optical drive" button.
    OpticalAdder,
    /// The inline "add floppy drive" button.
    FloppyAdder,
}

/// Fields of the storage tree addressable through `ItemRole::Storage`.
///
/// Roles prefixed `Ctr` are answered by controllers and roles prefixed `Att`
/// by attachments; other kinds read `ItemData::None` and reject writes.
/// Unprefixed roles are answered by every item. Writable roles are marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageRole {
    /// Item id. `Id`.
    ItemId,
    /// Item kind. `Kind`.
    ItemType,
    /// Whether the item is a controller. `Bool`.
    IsController,
    /// Whether the item is an attachment. `Bool`.
    IsAttachment,
    /// Display name. `String`.
    ItemName,
    /// Icon in the default state. `Pixmap`.
    ItemPixmapDefault,
    /// Icon when collapsed. `Pixmap`.
    ItemPixmapCollapsed,
    /// Icon when expanded. `Pixmap`.
    ItemPixmapExpanded,
    /// Where the icon is drawn within the row. `Rect`.
    ItemPixmapRect,
    /// Where the name baseline starts within the row. `Point`.
    ItemNamePoint,
    /// Tooltip mode; writable on any item. `ToolTipKind`.
    ToolTipType,

    /// Whether another controller on the bus may be added. `Bool`.
    IsMoreControllersPossible(StorageBus),
    /// Whether another attachment may be added to the controller (or the
    /// attachment's controller). `Bool`.
    IsMoreAttachmentsPossible,

    /// Controller name; writable. `String`.
    CtrName,
    /// Controller type; writable. `ControllerType`.
    CtrType,
    /// Controller types offered for a bus. `ControllerTypes`.
    CtrTypesForBus(StorageBus),
    /// Device types attachable to the controller. `DeviceTypes`.
    CtrDevices,
    /// Controller bus; writable, runs the bus change cascade. `Bus`.
    CtrBusType,
    /// Buses the controller may switch to, current first. `Buses`.
    CtrBusTypes,
    /// Port count; writable, clamped. `Int`.
    CtrPortCount,
    /// Maximum port count for the bus. `Int`.
    CtrMaxPortCount,
    /// Host IO cache; writable. `Bool`.
    CtrIoCache,

    /// Slot; writable, re-sorts. `Slot`.
    AttSlot,
    /// Slots the attachment may move to. `Slots`.
    AttSlots,
    /// Device type. `DeviceType`.
    AttDevice,
    /// Medium id; writable, refreshes cached fields. `Medium`.
    AttMediumId,
    /// Whether the medium is a host drive. `Bool`.
    AttIsHostDrive,
    /// Passthrough; writable. `Bool`.
    AttIsPassthrough,
    /// Temporary eject; writable. `Bool`.
    AttIsTempEject,
    /// Non-rotational; writable. `Bool`.
    AttIsNonRotational,
    /// Hot-pluggable; writable. `Bool`.
    AttIsHotPluggable,
    /// Actual size. `String`.
    AttSize,
    /// Virtual size. `String`.
    AttLogicalSize,
    /// Location. `String`.
    AttLocation,
    /// Format description. `String`.
    AttFormat,
    /// Storage details. `String`.
    AttDetails,
    /// Usage. `String`.
    AttUsage,
    /// Encryption password id. `String`.
    AttEncryptionPasswordId,

    /// Row margin. `Int`.
    Margin,
    /// Row spacing. `Int`.
    Spacing,
    /// Icon edge length. `Int`.
    IconSize,
    /// Icon of the inline add button for a device type. `Pixmap`.
    DeviceAddPixmap(DeviceType),
    /// Where the inline add button is drawn, anchored right. `Rect`.
    DeviceAddPixmapRect(DeviceType),
}

impl StorageRole {
    /// Whether the role addresses controller fields.
    pub fn is_controller_role(self) -> bool {
        matches!(
            self,
            Self::CtrName
                | Self::CtrType
                | Self::CtrTypesForBus(_)
                | Self::CtrDevices
                | Self::CtrBusType
                | Self::CtrBusTypes
                | Self::CtrPortCount
                | Self::CtrMaxPortCount
                | Self::CtrIoCache
        )
    }

    /// Whether the role addresses attachment fields.
    pub fn is_attachment_role(self) -> bool {
        matches!(
            self,
            Self::AttSlot
                | Self::AttSlots
                | Self::AttDevice
                | Self::AttMediumId
                | Self::AttIsHostDrive
                | Self::AttIsPassthrough
                | Self::AttIsTempEject
                | Self::AttIsNonRotational
                | Self::AttIsHotPluggable
                | Self::AttSize
                | Self::AttLogicalSize
                | Self::AttLocation
                | Self::AttFormat
                | Self::AttDetails
                | Self::AttUsage
                | Self::AttEncryptionPasswordId
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_families() {
        assert!(StorageRole::CtrTypesForBus(StorageBus::Ide).is_controller_role());
        assert!(!StorageRole::CtrName.is_attachment_role());
        assert!(StorageRole::AttEncryptionPasswordId.is_attachment_role());
        assert!(!StorageRole::Margin.is_controller_role());
        assert!(!StorageRole::IsMoreAttachmentsPossible.is_attachment_role());
    }
}
