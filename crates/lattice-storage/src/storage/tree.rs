//! The storage node arena.
//!
//! A [`StorageTree`] holds one root, the controllers under it and the
//! attachments under each controller. Nodes live in a [`SlotMap`] and refer
//! to each other by [`NodeId`]; parents own their children, so removing a
//! controller removes its attachments with it.

use std::fmt;

use slotmap::{Key, KeyData, SlotMap, new_key_type};

use super::medium::{Medium, MediumEnumerator, MediumId};
use super::platform::PlatformProperties;
use super::types::{ControllerType, DeviceType, StorageBus, StorageSlot};

new_key_type! {
    /// Identifier of a node in a [`StorageTree`].
    ///
    /// Ids stay valid while the node exists. Looking up a removed id yields
    /// `None`, never a different node.
    pub struct NodeId;
}

impl NodeId {
    /// Convert the id to a raw `u64`, for storing in a `ModelIndex`.
    #[inline]
    pub fn as_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Rebuild an id from [`NodeId::as_raw`] output.
    ///
    /// This does not check that the node still exists.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(KeyData::from_ffi(raw))
    }
}

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// The single top-level node.
    Root,
    /// A storage controller.
    Controller,
    /// A device attached to a controller.
    Attachment,
}

impl ItemKind {
    /// Short name for debug output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::Controller => "Controller",
            Self::Attachment => "Attachment",
        }
    }
}

/// Visual state an icon is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ItemState {
    /// Plain.
    #[default]
    Default,
    /// Controller with its attachments hidden.
    Collapsed,
    /// Controller with its attachments shown.
    Expanded,
}

/// Key of an icon a view should draw. Resolving keys to images is the
/// view's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixmapKey {
    /// Controller icon for a bus.
    Controller {
        /// Bus of the controller.
        bus: StorageBus,
        /// Requested state.
        state: ItemState,
    },
    /// Attachment icon for a device type.
    Attachment(DeviceType),
    /// Inline "add device" button.
    DeviceAdd {
        /// Device the button adds.
        device: DeviceType,
        /// Whether the button is active.
        enabled: bool,
    },
}

/// A storage controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerItem {
    name: String,
    bus: StorageBus,
    controller_type: ControllerType,
    port_count: u32,
    use_io_cache: bool,
    buses: Vec<StorageBus>,
    types: Vec<(StorageBus, Vec<ControllerType>)>,
}

impl ControllerItem {
    /// Create a controller with the platform's default IO cache setting.
    pub fn new(
        name: impl Into<String>,
        bus: StorageBus,
        controller_type: ControllerType,
        platform: &dyn PlatformProperties,
    ) -> Self {
        let mut item = Self {
            name: name.into(),
            bus,
            controller_type,
            port_count: 0,
            use_io_cache: platform.default_io_cache(controller_type),
            buses: Vec::new(),
            types: Vec::new(),
        };
        item.update_bus_info(platform);
        item.update_type_info(platform);
        item
    }

    /// Controller name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the controller.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Current bus.
    pub fn bus(&self) -> StorageBus {
        self.bus
    }

    /// Move the controller to another bus, refreshing the possible buses
    /// and types and clamping the port count to the new bus. The type is
    /// left alone; callers pick a valid one.
    pub fn set_bus(&mut self, bus: StorageBus, platform: &dyn PlatformProperties) {
        self.bus = bus;
        self.port_count = self.port_count.min(platform.max_port_count(bus));
        self.update_bus_info(platform);
        self.update_type_info(platform);
    }

    /// Buses the controller may switch to, current bus first.
    pub fn buses(&self) -> &[StorageBus] {
        &self.buses
    }

    /// Current controller type.
    pub fn controller_type(&self) -> ControllerType {
        self.controller_type
    }

    /// Change the controller type.
    pub fn set_controller_type(&mut self, controller_type: ControllerType, platform: &dyn PlatformProperties) {
        self.controller_type = controller_type;
        self.update_type_info(platform);
    }

    /// Types offered for `bus`. The current type is always offered for the
    /// current bus, even if the platform no longer supports it.
    pub fn types_for_bus(&self, bus: StorageBus) -> &[ControllerType] {
        self.types
            .iter()
            .find(|(b, _)| *b == bus)
            .map(|(_, types)| types.as_slice())
            .unwrap_or(&[])
    }

    /// Stored port count, without accounting for attachments.
    pub fn stored_port_count(&self) -> u32 {
        self.port_count
    }

    /// Set the port count, clamped to the bus maximum.
    pub fn set_port_count(&mut self, port_count: u32, platform: &dyn PlatformProperties) {
        self.port_count = port_count.min(platform.max_port_count(self.bus));
    }

    /// Whether the host IO cache is used.
    pub fn use_io_cache(&self) -> bool {
        self.use_io_cache
    }

    /// Toggle the host IO cache.
    pub fn set_use_io_cache(&mut self, use_io_cache: bool) {
        self.use_io_cache = use_io_cache;
    }

    fn update_bus_info(&mut self, platform: &dyn PlatformProperties) {
        self.buses.clear();
        // A floppy controller cannot change bus.
        if self.bus != StorageBus::Floppy {
            self.buses
                .extend(platform.supported_buses().into_iter().filter(|b| *b != self.bus));
        }
        self.buses.insert(0, self.bus);
    }

    fn update_type_info(&mut self, platform: &dyn PlatformProperties) {
        let supported = platform.supported_controller_types();
        let mut buses = vec![self.bus];
        buses.extend(platform.supported_buses().into_iter().filter(|b| *b != self.bus));

        self.types = buses
            .into_iter()
            .map(|bus| {
                let types = platform
                    .controller_types_for_bus(bus)
                    .into_iter()
                    .filter(|t| supported.contains(t) || *t == self.controller_type)
                    .collect();
                (bus, types)
            })
            .collect();
    }
}

/// Display fields of an attachment, cached from its medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediumDisplay {
    /// Medium name, or "Empty".
    pub name: String,
    /// Tooltip text.
    pub tool_tip: String,
    /// Whether the medium is a host drive.
    pub host_drive: bool,
    /// Actual size.
    pub size: String,
    /// Virtual size.
    pub logical_size: String,
    /// Location.
    pub location: String,
    /// Format description.
    pub format: String,
    /// Storage details.
    pub details: String,
    /// Usage.
    pub usage: String,
    /// Encryption password id.
    pub encryption_password_id: String,
}

const PLACEHOLDER: &str = "--";

impl MediumDisplay {
    /// Display fields of an empty drive.
    pub fn empty() -> Self {
        Self {
            name: "Empty".to_string(),
            tool_tip: String::new(),
            host_drive: false,
            size: PLACEHOLDER.to_string(),
            logical_size: PLACEHOLDER.to_string(),
            location: PLACEHOLDER.to_string(),
            format: PLACEHOLDER.to_string(),
            details: String::new(),
            usage: PLACEHOLDER.to_string(),
            encryption_password_id: PLACEHOLDER.to_string(),
        }
    }

    /// Display fields of `medium` attached as `device_type`.
    pub fn from_medium(device_type: DeviceType, medium: &Medium) -> Self {
        let or_placeholder = |s: &str| {
            if s.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                s.to_string()
            }
        };

        let mut display = Self {
            name: medium.name.clone(),
            tool_tip: medium.tool_tip.clone(),
            host_drive: medium.host_drive,
            size: or_placeholder(&medium.size),
            logical_size: or_placeholder(&medium.logical_size),
            location: or_placeholder(&medium.location),
            format: PLACEHOLDER.to_string(),
            details: String::new(),
            usage: or_placeholder(&medium.usage),
            encryption_password_id: PLACEHOLDER.to_string(),
        };

        match device_type {
            DeviceType::HardDisk => {
                display.format = format!("{} ({})", medium.disk_type, medium.disk_format);
                display.details = medium.storage_details.clone();
                if let Some(id) = &medium.encryption_password_id {
                    display.encryption_password_id = id.clone();
                }
            }
            DeviceType::Dvd | DeviceType::Floppy => {
                display.format = if medium.host_drive { "Host Drive" } else { "Image" }.to_string();
            }
        }
        display
    }
}

impl Default for MediumDisplay {
    fn default() -> Self {
        Self::empty()
    }
}

/// A device attached to a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentItem {
    device_type: DeviceType,
    slot: StorageSlot,
    medium_id: Option<MediumId>,
    passthrough: bool,
    temp_eject: bool,
    non_rotational: bool,
    hot_pluggable: bool,
    display: MediumDisplay,
}

impl AttachmentItem {
    fn new(device_type: DeviceType, slot: StorageSlot) -> Self {
        Self {
            device_type,
            slot,
            medium_id: None,
            passthrough: false,
            temp_eject: false,
            non_rotational: false,
            hot_pluggable: false,
            display: MediumDisplay::empty(),
        }
    }

    /// Device type.
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Slot on the controller.
    pub fn slot(&self) -> StorageSlot {
        self.slot
    }

    pub(crate) fn set_slot(&mut self, slot: StorageSlot) {
        self.slot = slot;
    }

    /// Attached medium, `None` for an empty drive.
    pub fn medium_id(&self) -> Option<MediumId> {
        self.medium_id
    }

    /// Attach a medium and refresh the cached display fields.
    ///
    /// An id the enumerator does not know is kept but displayed like an
    /// empty drive until the medium is enumerated.
    pub fn set_medium(&mut self, medium_id: Option<MediumId>, mediums: &dyn MediumEnumerator) {
        self.medium_id = medium_id;
        self.recache(mediums);
    }

    /// Refresh the cached display fields from the enumerator.
    pub fn recache(&mut self, mediums: &dyn MediumEnumerator) {
        self.display = self
            .medium_id
            .and_then(|id| mediums.medium(&id))
            .map(|medium| MediumDisplay::from_medium(self.device_type, &medium))
            .unwrap_or_else(MediumDisplay::empty);
    }

    /// Cached display fields.
    pub fn display(&self) -> &MediumDisplay {
        &self.display
    }

    /// Whether the medium is a host drive.
    pub fn is_host_drive(&self) -> bool {
        self.display.host_drive
    }

    /// Passthrough of a host optical drive.
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Set passthrough.
    pub fn set_passthrough(&mut self, passthrough: bool) {
        self.passthrough = passthrough;
    }

    /// Whether the guest may eject the medium temporarily.
    pub fn is_temp_eject(&self) -> bool {
        self.temp_eject
    }

    /// Set temporary eject.
    pub fn set_temp_eject(&mut self, temp_eject: bool) {
        self.temp_eject = temp_eject;
    }

    /// Whether the disk reports itself as solid state.
    pub fn is_non_rotational(&self) -> bool {
        self.non_rotational
    }

    /// Set non-rotational.
    pub fn set_non_rotational(&mut self, non_rotational: bool) {
        self.non_rotational = non_rotational;
    }

    /// Whether the device may be plugged while the machine runs.
    pub fn is_hot_pluggable(&self) -> bool {
        self.hot_pluggable
    }

    /// Set hot-pluggable.
    pub fn set_hot_pluggable(&mut self, hot_pluggable: bool) {
        self.hot_pluggable = hot_pluggable;
    }
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// The root.
    Root,
    /// A controller.
    Controller(ControllerItem),
    /// An attachment.
    Attachment(AttachmentItem),
}

impl Item {
    /// Kind of this item.
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Root => ItemKind::Root,
            Self::Controller(_) => ItemKind::Controller,
            Self::Attachment(_) => ItemKind::Attachment,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    item: Item,
}

/// Arena of storage nodes.
///
/// All structural invariants hold between calls: every non-root node has
/// exactly one parent listing it, and attachments of one controller occupy
/// distinct slots.
#[derive(Debug, Clone)]
pub struct StorageTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

impl Default for StorageTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageTree {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            parent: None,
            children: Vec::new(),
            item: Item::Root,
        });
        Self { nodes, root }
    }

    /// The root id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Kind of the node, if it exists.
    pub fn kind(&self, id: NodeId) -> Option<ItemKind> {
        self.item(id).map(Item::kind)
    }

    /// Payload of the node, if it exists.
    pub fn item(&self, id: NodeId) -> Option<&Item> {
        self.nodes.get(id).map(|node| &node.item)
    }

    /// The controller named by `id`, if it is one.
    pub fn controller(&self, id: NodeId) -> Option<&ControllerItem> {
        match self.item(id)? {
            Item::Controller(controller) => Some(controller),
            _ => None,
        }
    }

    /// Mutable access to the controller named by `id`.
    pub fn controller_mut(&mut self, id: NodeId) -> Option<&mut ControllerItem> {
        match &mut self.nodes.get_mut(id)?.item {
            Item::Controller(controller) => Some(controller),
            _ => None,
        }
    }

    /// The attachment named by `id`, if it is one.
    pub fn attachment(&self, id: NodeId) -> Option<&AttachmentItem> {
        match self.item(id)? {
            Item::Attachment(attachment) => Some(attachment),
            _ => None,
        }
    }

    /// Mutable access to the attachment named by `id`.
    pub fn attachment_mut(&mut self, id: NodeId) -> Option<&mut AttachmentItem> {
        match &mut self.nodes.get_mut(id)?.item {
            Item::Attachment(attachment) => Some(attachment),
            _ => None,
        }
    }

    /// Parent of the node; `None` for the root and unknown ids.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Children of the node in presentation order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Controllers in presentation order.
    pub fn controllers(&self) -> &[NodeId] {
        self.children(self.root)
    }

    /// Child of `parent` at `index`.
    pub fn child_item(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.children(parent).get(index).copied()
    }

    /// `id` if it is a direct child of `parent`.
    pub fn child_item_by_id(&self, parent: NodeId, id: NodeId) -> Option<NodeId> {
        self.children(parent).iter().copied().find(|child| *child == id)
    }

    /// Position of `child` within `parent`.
    pub fn pos_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|id| *id == child)
    }

    /// Number of children of the node.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Row of the node within its parent; 0 for the root.
    pub fn row_of(&self, id: NodeId) -> Option<usize> {
        if id == self.root {
            return Some(0);
        }
        self.pos_of_child(self.parent(id)?, id)
    }

    /// Number of controllers on `bus`.
    pub fn controller_count(&self, bus: StorageBus) -> u32 {
        let count = self
            .controllers()
            .iter()
            .filter_map(|id| self.controller(*id))
            .filter(|controller| controller.bus() == bus)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Append a controller to the root.
    pub fn add_controller(&mut self, controller: ControllerItem) -> NodeId {
        let id = self.nodes.insert(Node {
            parent: Some(self.root),
            children: Vec::new(),
            item: Item::Controller(controller),
        });
        if let Some(root) = self.nodes.get_mut(self.root) {
            root.children.push(id);
        }
        id
    }

    /// Append an attachment to `controller` in its first free slot.
    ///
    /// Returns `None` if `controller` is not a controller or has no free
    /// slot left.
    pub fn add_attachment(
        &mut self,
        controller: NodeId,
        device_type: DeviceType,
        platform: &dyn PlatformProperties,
    ) -> Option<NodeId> {
        let slot = self.free_slots(controller, platform).into_iter().next()?;
        let id = self.nodes.insert(Node {
            parent: Some(controller),
            children: Vec::new(),
            item: Item::Attachment(AttachmentItem::new(device_type, slot)),
        });
        self.nodes.get_mut(controller)?.children.push(id);
        Some(id)
    }

    /// Remove a node and everything below it.
    ///
    /// The root cannot be removed. Returns whether anything was removed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.root {
            return false;
        }
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|child| *child != id);
        }
        self.remove_subtree(id);
        true
    }

    fn remove_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            for child in node.children {
                self.remove_subtree(child);
            }
        }
    }

    /// Remove every controller.
    pub fn clear(&mut self) {
        let root = self.root;
        self.nodes.retain(|id, _| id == root);
        if let Some(root) = self.nodes.get_mut(root) {
            root.children.clear();
        }
    }

    /// Display text of the node.
    pub fn text(&self, id: NodeId) -> String {
        match self.item(id) {
            Some(Item::Controller(controller)) => format!("Controller: {}", controller.name()),
            Some(Item::Attachment(attachment)) => attachment.display().name.clone(),
            Some(Item::Root) | None => String::new(),
        }
    }

    /// Tooltip of the node.
    pub fn tool_tip(&self, id: NodeId) -> String {
        match self.item(id) {
            Some(Item::Controller(controller)) => format!(
                "{}\nBus: {}\nType: {}",
                controller.name(),
                controller.bus(),
                controller.controller_type()
            ),
            Some(Item::Attachment(attachment)) => attachment.display().tool_tip.clone(),
            Some(Item::Root) | None => String::new(),
        }
    }

    /// Icon of the node in `state`.
    pub fn pixmap(&self, id: NodeId, state: ItemState) -> Option<PixmapKey> {
        match self.item(id)? {
            Item::Controller(controller) => Some(PixmapKey::Controller {
                bus: controller.bus(),
                state,
            }),
            Item::Attachment(attachment) => Some(PixmapKey::Attachment(attachment.device_type())),
            Item::Root => None,
        }
    }

    /// Slots occupied on `controller`, in child order.
    pub fn used_slots(&self, controller: NodeId) -> Vec<StorageSlot> {
        self.children(controller)
            .iter()
            .filter_map(|id| self.attachment(*id))
            .map(AttachmentItem::slot)
            .collect()
    }

    /// Slots on `controller` that no attachment occupies.
    pub fn free_slots(&self, controller: NodeId, platform: &dyn PlatformProperties) -> Vec<StorageSlot> {
        let Some(item) = self.controller(controller) else {
            return Vec::new();
        };
        let used = self.used_slots(controller);
        platform
            .all_slots(item.bus())
            .into_iter()
            .filter(|slot| !used.contains(slot))
            .collect()
    }

    /// Slots `attachment` may occupy: its own plus every free one.
    pub fn available_slots(&self, attachment: NodeId, platform: &dyn PlatformProperties) -> Vec<StorageSlot> {
        let (Some(item), Some(controller)) = (self.attachment(attachment), self.parent(attachment)) else {
            return Vec::new();
        };
        let own = item.slot();
        let used = self.used_slots(controller);
        let Some(bus) = self.controller(controller).map(ControllerItem::bus) else {
            return Vec::new();
        };
        platform
            .all_slots(bus)
            .into_iter()
            .filter(|slot| *slot == own || !used.contains(slot))
            .collect()
    }

    /// Port count of `controller`, raised to cover every used port.
    pub fn effective_port_count(&self, controller: NodeId) -> u32 {
        let stored = self.controller(controller).map_or(0, ControllerItem::stored_port_count);
        self.used_slots(controller)
            .into_iter()
            .map(|slot| slot.port.saturating_add(1))
            .fold(stored, u32::max)
    }

    /// Attachments of `controller`, optionally only those of one device type.
    pub fn attachment_ids(&self, controller: NodeId, device_type: Option<DeviceType>) -> Vec<NodeId> {
        self.children(controller)
            .iter()
            .copied()
            .filter(|id| {
                self.attachment(*id)
                    .is_some_and(|att| device_type.is_none_or(|t| att.device_type() == t))
            })
            .collect()
    }

    /// Stably reorder the attachments of `controller` by slot.
    pub fn sort_attachments(&mut self, controller: NodeId, descending: bool) {
        let Some(node) = self.nodes.get(controller) else {
            return;
        };
        let mut keyed: Vec<(StorageSlot, NodeId)> = node
            .children
            .iter()
            .filter_map(|id| self.attachment(*id).map(|att| (att.slot(), *id)))
            .collect();
        if descending {
            keyed.sort_by(|a, b| b.0.cmp(&a.0));
        } else {
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
        }
        if let Some(node) = self.nodes.get_mut(controller) {
            node.children = keyed.into_iter().map(|(_, id)| id).collect();
        }
    }

    /// Total number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
