//! Data roles for item models.
//!
//! Roles define what kind of data is being requested from or written to a
//! model item. The generic roles cover what any view needs; storage-specific
//! fields are addressed through [`ItemRole::Storage`].

use crate::storage::{
    ControllerType, DeviceType, ItemKind, MediumId, NodeId, PixmapKey, StorageBus, StorageRole,
    StorageSlot, ToolTipKind,
};

/// Roles for accessing different aspects of item data.
///
/// # Example
///
/// ```ignore
/// use lattice_storage::model::{ItemModel, ItemRole};
/// use lattice_storage::storage::StorageRole;
///
/// let text = model.data(&index, ItemRole::Display);
/// let bus = model.data(&index, StorageRole::CtrBusType.into());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRole {
    /// Primary text to display. Returns `String`.
    Display,
    /// Icon to show. Returns `Pixmap`.
    Decoration,
    /// Tooltip text shown on hover. Returns `String`.
    ToolTip,
    /// Preferred row size. Returns `Size`.
    SizeHint,
    /// A storage field.
    Storage(StorageRole),
}

impl From<StorageRole> for ItemRole {
    fn from(role: StorageRole) -> Self {
        Self::Storage(role)
    }
}

/// An integer point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

/// An integer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

/// An integer rectangle.
///
/// Rectangles anchored to a row's right edge use negative `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rect {
    /// Creates a rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A typed value read from or written to a model item.
///
/// Each role has one expected variant. Reading a role the item does not
/// support yields `ItemData::None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ItemData {
    /// No data.
    #[default]
    None,
    /// Text.
    String(String),
    /// Integer.
    Int(i64),
    /// Flag.
    Bool(bool),
    /// Tree item identifier.
    Id(NodeId),
    /// Kind of tree item.
    Kind(ItemKind),
    /// Tooltip mode.
    ToolTipKind(ToolTipKind),
    /// Medium identifier; `None` is the empty medium.
    Medium(Option<MediumId>),
    /// A bus.
    Bus(StorageBus),
    /// A list of buses.
    Buses(Vec<StorageBus>),
    /// A controller type.
    ControllerType(ControllerType),
    /// A list of controller types.
    ControllerTypes(Vec<ControllerType>),
    /// A device type.
    DeviceType(DeviceType),
    /// A list of device types.
    DeviceTypes(Vec<DeviceType>),
    /// A slot.
    Slot(StorageSlot),
    /// A list of slots.
    Slots(Vec<StorageSlot>),
    /// Icon key.
    Pixmap(PixmapKey),
    /// A point.
    Point(Point),
    /// A size.
    Size(Size),
    /// A rectangle.
    Rect(Rect),
}

impl ItemData {
    /// Returns `true` if this holds no data.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` if this holds data.
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Returns the text, if this is a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Consumes and returns the text, if this is a string.
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer as `u32`, if it is one and fits.
    pub fn as_u32(&self) -> Option<u32> {
        self.as_int().and_then(|v| u32::try_from(v).ok())
    }

    /// Returns the flag, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the item id, if this is one.
    pub fn as_id(&self) -> Option<NodeId> {
        match self {
            Self::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the item kind, if this is one.
    pub fn as_kind(&self) -> Option<ItemKind> {
        match self {
            Self::Kind(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Returns the medium id, if this is a medium value.
    ///
    /// The outer `Option` tells whether this is a medium value at all.
    pub fn as_medium(&self) -> Option<Option<MediumId>> {
        match self {
            Self::Medium(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the bus, if this is one.
    pub fn as_bus(&self) -> Option<StorageBus> {
        match self {
            Self::Bus(bus) => Some(*bus),
            _ => None,
        }
    }

    /// Returns the controller type, if this is one.
    pub fn as_controller_type(&self) -> Option<ControllerType> {
        match self {
            Self::ControllerType(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the device type, if this is one.
    pub fn as_device_type(&self) -> Option<DeviceType> {
        match self {
            Self::DeviceType(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the slot, if this is one.
    pub fn as_slot(&self) -> Option<StorageSlot> {
        match self {
            Self::Slot(slot) => Some(*slot),
            _ => None,
        }
    }

    /// Returns the pixmap key, if this is one.
    pub fn as_pixmap(&self) -> Option<PixmapKey> {
        match self {
            Self::Pixmap(key) => Some(*key),
            _ => None,
        }
    }

    /// Returns the rectangle, if this is one.
    pub fn as_rect(&self) -> Option<Rect> {
        match self {
            Self::Rect(rect) => Some(*rect),
            _ => None,
        }
    }

    /// Returns the bus list, if this is one.
    pub fn into_buses(self) -> Option<Vec<StorageBus>> {
        match self {
            Self::Buses(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the controller type list, if this is one.
    pub fn into_controller_types(self) -> Option<Vec<ControllerType>> {
        match self {
            Self::ControllerTypes(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the device type list, if this is one.
    pub fn into_device_types(self) -> Option<Vec<DeviceType>> {
        match self {
            Self::DeviceTypes(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the slot list, if this is one.
    pub fn into_slots(self) -> Option<Vec<StorageSlot>> {
        match self {
            Self::Slots(v) => Some(v),
            _ => None,
        }
    }
}

impl From<String> for ItemData {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for ItemData {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for ItemData {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ItemData {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ItemData {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<StorageBus> for ItemData {
    fn from(value: StorageBus) -> Self {
        Self::Bus(value)
    }
}

impl From<ControllerType> for ItemData {
    fn from(value: ControllerType) -> Self {
        Self::ControllerType(value)
    }
}

impl From<DeviceType> for ItemData {
    fn from(value: DeviceType) -> Self {
        Self::DeviceType(value)
    }
}

impl From<StorageSlot> for ItemData {
    fn from(value: StorageSlot) -> Self {
        Self::Slot(value)
    }
}

impl From<Option<MediumId>> for ItemData {
    fn from(value: Option<MediumId>) -> Self {
        Self::Medium(value)
    }
}

impl From<ToolTipKind> for ItemData {
    fn from(value: ToolTipKind) -> Self {
        Self::ToolTipKind(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_data_accessors() {
        assert_eq!(ItemData::from("SATA").as_string(), Some("SATA"));
        assert_eq!(ItemData::from(30u32).as_u32(), Some(30));
        assert_eq!(ItemData::Int(-1).as_u32(), None);
        assert_eq!(ItemData::from(true).as_bool(), Some(true));
        assert_eq!(ItemData::from(StorageBus::Sas).as_bus(), Some(StorageBus::Sas));
        assert_eq!(ItemData::from(None::<MediumId>).as_medium(), Some(None));
        assert!(ItemData::None.as_string().is_none());
        assert!(ItemData::from(DeviceType::Dvd).is_some());
    }

    #[test]
    fn test_mismatched_accessor_is_none() {
        let data = ItemData::from(StorageSlot::new(StorageBus::Sata, 1, 0));
        assert!(data.as_bus().is_none());
        assert!(data.clone().into_slots().is_none());
        assert_eq!(data.as_slot(), Some(StorageSlot::new(StorageBus::Sata, 1, 0)));
    }

    #[test]
    fn test_storage_role_conversion() {
        let role: ItemRole = StorageRole::CtrName.into();
        assert_eq!(role, ItemRole::Storage(StorageRole::CtrName));
    }
}
