//! The storage tree model.
//!
//! [`StorageModel`] exposes a [`StorageTree`] through the [`ItemModel`]
//! contract and owns every structural mutation: adding and removing
//! controllers and attachments, moving attachments between controllers,
//! changing a controller's bus, and sorting attachments by slot.
//!
//! # Addressing
//!
//! Row 0 under the invalid index is the root. Rows under the root are the
//! controllers, rows under a controller its attachments. There is exactly
//! one column. Each index carries the [`NodeId`] of its node, so a stale
//! index resolves to nothing rather than to a different node.
//!
//! # Notifications
//!
//! Mutations update the tree under a write lock and emit model signals
//! after the lock is released, so slots may read the model freely.

use std::collections::BTreeMap;
use std::sync::Arc;

use lattice_storage_core::logging::{TreeFormatOptions, TreeFormatter, TreeLine, span_names, targets};
use lattice_storage_core::Property;
use parking_lot::RwLock;
use static_assertions::assert_impl_all;

use super::confirm::MessageCenter;
use super::medium::{MediumEnumerator, MediumId};
use super::platform::PlatformProperties;
use super::role::{StorageRole, ToolTipKind};
use super::tree::{AttachmentItem, ControllerItem, Item, ItemKind, ItemState, NodeId, PixmapKey, StorageTree};
use super::types::{
    ALL_BUSES, ChipsetType, ConfigurationAccessLevel, ControllerType, DeviceType, StorageBus, StorageSlot,
};
use crate::config::ViewMetrics;
use crate::model::{ItemData, ItemFlags, ItemModel, ItemRole, ModelIndex, ModelSignals, Point, Rect, Size};

/// Direction of [`StorageModel::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Lowest slot first.
    #[default]
    Ascending,
    /// Highest slot first.
    Descending,
}

/// Attachments a bus change has to drop, worked out before anything is
/// touched.
struct BusChangePlan {
    name: String,
    new_type: ControllerType,
    optical: Vec<NodeId>,
    excess: Vec<NodeId>,
}

/// Tree model of a machine's storage controllers and attachments.
pub struct StorageModel {
    tree: RwLock<StorageTree>,
    platform: Arc<dyn PlatformProperties>,
    mediums: Arc<dyn MediumEnumerator>,
    message_center: Arc<dyn MessageCenter>,
    access_level: Property<ConfigurationAccessLevel>,
    chipset: Property<ChipsetType>,
    tool_tip_kind: Property<ToolTipKind>,
    metrics: ViewMetrics,
    signals: ModelSignals,
}

assert_impl_all!(StorageModel: Send, Sync);

impl StorageModel {
    /// Create an empty model.
    ///
    /// The chipset starts as PIIX3 and the access level as `Null`, so no
    /// edits are possible until the host sets a level.
    pub fn new(
        platform: Arc<dyn PlatformProperties>,
        mediums: Arc<dyn MediumEnumerator>,
        message_center: Arc<dyn MessageCenter>,
    ) -> Self {
        Self {
            tree: RwLock::new(StorageTree::new()),
            platform,
            mediums,
            message_center,
            access_level: Property::default(),
            chipset: Property::default(),
            tool_tip_kind: Property::default(),
            metrics: ViewMetrics::default(),
            signals: ModelSignals::new(),
        }
    }

    /// Replace the layout metrics.
    pub fn with_metrics(mut self, metrics: ViewMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Platform capabilities in use.
    pub fn platform(&self) -> &Arc<dyn PlatformProperties> {
        &self.platform
    }

    /// Medium source in use.
    pub fn mediums(&self) -> &Arc<dyn MediumEnumerator> {
        &self.mediums
    }

    /// Confirmation source in use.
    pub fn message_center(&self) -> &Arc<dyn MessageCenter> {
        &self.message_center
    }

    /// Layout metrics in use.
    pub fn metrics(&self) -> ViewMetrics {
        self.metrics
    }

    /// Run `f` with read access to the tree.
    pub fn with_tree<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&StorageTree) -> R,
    {
        f(&self.tree.read())
    }

    // -------------------------------------------------------------------------
    // Addressing
    // -------------------------------------------------------------------------

    /// Index of the root item.
    pub fn root(&self) -> ModelIndex {
        self.index(0, 0, &ModelIndex::invalid())
    }

    /// Index of a node, or the invalid index if it does not exist.
    pub fn index_of(&self, id: NodeId) -> ModelIndex {
        Self::index_in(&self.tree.read(), id)
    }

    /// Node named by `index`, if it still exists.
    pub fn item_id(&self, index: &ModelIndex) -> Option<NodeId> {
        Self::resolve(&self.tree.read(), index)
    }

    /// Kind of the node named by `index`.
    pub fn item_kind(&self, index: &ModelIndex) -> Option<ItemKind> {
        let tree = self.tree.read();
        Self::resolve(&tree, index).and_then(|id| tree.kind(id))
    }

    /// Controllers in presentation order.
    pub fn controllers(&self) -> Vec<NodeId> {
        self.tree.read().controllers().to_vec()
    }

    /// Attachments of `controller` in presentation order.
    pub fn attachments(&self, controller: NodeId) -> Vec<NodeId> {
        self.tree.read().attachment_ids(controller, None)
    }

    /// Controller owning `attachment`.
    pub fn controller_of(&self, attachment: NodeId) -> Option<NodeId> {
        let tree = self.tree.read();
        tree.attachment(attachment)?;
        tree.parent(attachment)
    }

    fn index_in(tree: &StorageTree, id: NodeId) -> ModelIndex {
        match tree.row_of(id) {
            Some(row) => ModelIndex::with_internal_id(row, 0, id.as_raw()),
            None => ModelIndex::invalid(),
        }
    }

    fn resolve(tree: &StorageTree, index: &ModelIndex) -> Option<NodeId> {
        if !index.is_valid() {
            return None;
        }
        let id = NodeId::from_raw(index.internal_id());
        tree.contains(id).then_some(id)
    }

    /// `id` if it names a controller under the root.
    fn top_level(tree: &StorageTree, id: NodeId) -> Option<NodeId> {
        tree.child_item_by_id(tree.root(), id)
    }

    // -------------------------------------------------------------------------
    // External state
    // -------------------------------------------------------------------------

    /// Current configuration access level.
    pub fn configuration_access_level(&self) -> ConfigurationAccessLevel {
        self.access_level.get()
    }

    /// Change the configuration access level. Returns whether it changed.
    pub fn set_configuration_access_level(&self, level: ConfigurationAccessLevel) -> bool {
        let changed = self.access_level.set(level);
        if changed {
            tracing::debug!(target: targets::MODEL, ?level, "configuration access level changed");
        }
        changed
    }

    /// Current chipset.
    pub fn chipset_type(&self) -> ChipsetType {
        self.chipset.get()
    }

    /// Change the chipset. Returns whether it changed.
    pub fn set_chipset_type(&self, chipset: ChipsetType) -> bool {
        let changed = self.chipset.set(chipset);
        if changed {
            tracing::debug!(target: targets::MODEL, ?chipset, "chipset changed");
        }
        changed
    }

    /// Tooltip mode shared by every controller row.
    pub fn tool_tip_kind(&self) -> ToolTipKind {
        self.tool_tip_kind.get()
    }

    // -------------------------------------------------------------------------
    // Capacity queries
    // -------------------------------------------------------------------------

    /// Number of controllers per bus.
    pub fn current_controller_types(&self) -> BTreeMap<StorageBus, u32> {
        let tree = self.tree.read();
        ALL_BUSES
            .iter()
            .map(|bus| (*bus, tree.controller_count(*bus)))
            .collect()
    }

    /// Maximum number of controllers per bus for the current chipset.
    pub fn maximum_controller_types(&self) -> BTreeMap<StorageBus, u32> {
        let chipset = self.chipset_type();
        ALL_BUSES
            .iter()
            .map(|bus| (*bus, self.platform.max_instances(chipset, *bus)))
            .collect()
    }

    /// Whether another controller on `bus` may be added.
    pub fn is_more_controllers_possible(&self, bus: StorageBus) -> bool {
        self.controllers_possible(&self.tree.read(), bus)
    }

    /// Whether another attachment may be added to `id`, a controller or an
    /// attachment of it.
    pub fn is_more_attachments_possible(&self, id: NodeId) -> bool {
        self.attachments_possible(&self.tree.read(), id)
    }

    fn controllers_possible(&self, tree: &StorageTree, bus: StorageBus) -> bool {
        self.configuration_access_level() == ConfigurationAccessLevel::Full
            && tree.controller_count(bus) < self.platform.max_instances(self.chipset_type(), bus)
    }

    fn attachments_possible(&self, tree: &StorageTree, id: NodeId) -> bool {
        let controller = match tree.kind(id) {
            Some(ItemKind::Controller) => id,
            Some(ItemKind::Attachment) => match tree.parent(id) {
                Some(parent) => parent,
                None => return false,
            },
            _ => return false,
        };
        let Some(bus) = tree.controller(controller).map(ControllerItem::bus) else {
            return false;
        };

        let count = u32::try_from(tree.child_count(controller)).unwrap_or(u32::MAX);
        if count >= self.platform.slot_capacity(bus) {
            return false;
        }
        match self.configuration_access_level() {
            ConfigurationAccessLevel::Full => true,
            ConfigurationAccessLevel::PartialRunning => match bus {
                StorageBus::Usb => true,
                StorageBus::Sata => count < tree.effective_port_count(controller),
                _ => false,
            },
            _ => false,
        }
    }

    /// Number of attachments of `device_type` across all controllers.
    pub fn device_count(&self, device_type: DeviceType) -> usize {
        let tree = self.tree.read();
        tree.controllers()
            .iter()
            .map(|ctr| tree.attachment_ids(*ctr, Some(device_type)).len())
            .sum()
    }

    /// Device type of `attachment` on `controller`, if both exist and match.
    pub fn attachment_device_type(&self, controller: NodeId, attachment: NodeId) -> Option<DeviceType> {
        let tree = self.tree.read();
        let controller = Self::top_level(&tree, controller)?;
        let attachment = tree.child_item_by_id(controller, attachment)?;
        tree.attachment(attachment).map(|att| att.device_type())
    }

    // -------------------------------------------------------------------------
    // Structural mutations
    // -------------------------------------------------------------------------

    /// Append a controller. Returns its index.
    ///
    /// The caller checks `is_more_controllers_possible` first.
    pub fn add_controller(&self, name: &str, bus: StorageBus, controller_type: ControllerType) -> ModelIndex {
        let (root, row) = {
            let tree = self.tree.read();
            (Self::index_in(&tree, tree.root()), tree.controllers().len())
        };
        let controller = ControllerItem::new(name, bus, controller_type, self.platform.as_ref());
        let id = self
            .signals
            .emit_rows_inserted(root, row, row, || self.tree.write().add_controller(controller));

        tracing::debug!(target: targets::MODEL, controller = name, %bus, %controller_type, "controller added");
        ModelIndex::with_internal_id(row, 0, id.as_raw())
    }

    /// Remove a controller and all of its attachments. No-op if `id` is not
    /// a controller.
    pub fn del_controller(&self, id: NodeId) {
        let (root, row) = {
            let tree = self.tree.read();
            let Some(id) = Self::top_level(&tree, id) else {
                return;
            };
            let Some(row) = tree.pos_of_child(tree.root(), id) else {
                return;
            };
            (Self::index_in(&tree, tree.root()), row)
        };
        self.signals
            .emit_rows_removed(root, row, row, || self.tree.write().remove(id));
        tracing::debug!(target: targets::MODEL, ?id, "controller removed");
    }

    /// Append an attachment in the controller's first free slot.
    ///
    /// Attachments added at any access level other than `Full` start out
    /// hot-pluggable. Returns the new index, or the invalid index if the
    /// controller does not exist or is full.
    pub fn add_attachment(
        &self,
        controller: NodeId,
        device_type: DeviceType,
        medium_id: Option<MediumId>,
    ) -> ModelIndex {
        let (parent, row) = {
            let tree = self.tree.read();
            let Some(controller) = Self::top_level(&tree, controller) else {
                return ModelIndex::invalid();
            };
            if tree.free_slots(controller, self.platform.as_ref()).is_empty() {
                tracing::debug!(target: targets::MODEL, ?controller, "no free slot for attachment");
                return ModelIndex::invalid();
            }
            (Self::index_in(&tree, controller), tree.child_count(controller))
        };

        let hot_pluggable = self.configuration_access_level() != ConfigurationAccessLevel::Full;
        let inserted = self.signals.emit_rows_inserted(parent, row, row, || {
            let mut tree = self.tree.write();
            let id = tree.add_attachment(controller, device_type, self.platform.as_ref())?;
            let attachment = tree.attachment_mut(id)?;
            attachment.set_hot_pluggable(hot_pluggable);
            attachment.set_medium(medium_id, self.mediums.as_ref());
            Some((id, attachment.slot()))
        });

        match inserted {
            Some((id, slot)) => {
                tracing::debug!(target: targets::MODEL, %slot, ?device_type, ?medium_id, hot_pluggable, "attachment added");
                ModelIndex::with_internal_id(row, 0, id.as_raw())
            }
            None => ModelIndex::invalid(),
        }
    }

    /// Remove an attachment of a controller. No-op unless both exist and
    /// belong together.
    pub fn del_attachment(&self, controller: NodeId, attachment: NodeId) {
        let (parent, row) = {
            let tree = self.tree.read();
            let Some(controller) = Self::top_level(&tree, controller) else {
                return;
            };
            let Some(row) = tree.pos_of_child(controller, attachment) else {
                return;
            };
            (Self::index_in(&tree, controller), row)
        };
        self.signals
            .emit_rows_removed(parent, row, row, || self.tree.write().remove(attachment));
        tracing::debug!(target: targets::MODEL, ?controller, ?attachment, "attachment removed");
    }

    /// Move an attachment to another controller.
    ///
    /// The attachment is recreated on `to` with the same device type and
    /// medium, in `to`'s first free slot. If `from` does not hold
    /// `attachment`, nothing happens on either side.
    pub fn move_attachment(&self, attachment: NodeId, from: NodeId, to: NodeId) {
        let captured = {
            let tree = self.tree.read();
            Self::top_level(&tree, from)
                .and_then(|from| tree.child_item_by_id(from, attachment))
                .and_then(|id| tree.attachment(id))
                .map(|att| (att.device_type(), att.medium_id()))
        };
        let Some((device_type, medium_id)) = captured else {
            tracing::trace!(target: targets::MODEL, ?attachment, ?from, "move source not found");
            return;
        };

        self.del_attachment(from, attachment);
        let index = self.add_attachment(to, device_type, medium_id);
        tracing::debug!(target: targets::MODEL, ?from, ?to, ?device_type, moved = index.is_valid(), "attachment moved");
    }

    /// Remove every controller.
    pub fn clear(&self) {
        self.signals.emit_reset(|| self.tree.write().clear());
        tracing::debug!(target: targets::MODEL, "model cleared");
    }

    /// Stably reorder every controller's attachments by slot.
    pub fn sort(&self, order: SortOrder) {
        self.signals.emit_layout_changed(|| {
            let mut tree = self.tree.write();
            let controllers = tree.controllers().to_vec();
            for controller in controllers {
                tree.sort_attachments(controller, order == SortOrder::Descending);
            }
        });
    }

    /// Re-read medium metadata for every attachment showing `medium_id`.
    /// Returns how many were refreshed.
    pub fn refresh_medium(&self, medium_id: MediumId) -> usize {
        self.update_attachments_with_medium(medium_id, |att, mediums| att.recache(mediums))
    }

    /// Empty every attachment showing `medium_id`. Returns how many were
    /// emptied.
    pub fn forget_medium(&self, medium_id: MediumId) -> usize {
        self.update_attachments_with_medium(medium_id, |att, mediums| att.set_medium(None, mediums))
    }

    fn update_attachments_with_medium<F>(&self, medium_id: MediumId, mut update: F) -> usize
    where
        F: FnMut(&mut AttachmentItem, &dyn MediumEnumerator),
    {
        let changed: Vec<ModelIndex> = {
            let mut tree = self.tree.write();
            let matching: Vec<NodeId> = tree
                .controllers()
                .to_vec()
                .into_iter()
                .flat_map(|ctr| tree.attachment_ids(ctr, None))
                .filter(|id| tree.attachment(*id).is_some_and(|att| att.medium_id() == Some(medium_id)))
                .collect();
            for id in &matching {
                if let Some(att) = tree.attachment_mut(*id) {
                    update(att, self.mediums.as_ref());
                }
            }
            matching.into_iter().map(|id| Self::index_in(&tree, id)).collect()
        };

        for index in &changed {
            self.signals
                .emit_data_changed_single(*index, vec![StorageRole::AttMediumId.into()]);
        }
        changed.len()
    }

    // -------------------------------------------------------------------------
    // Bus change
    // -------------------------------------------------------------------------

    /// Move a controller to another bus.
    ///
    /// Optical drives are dropped when moving to PCIe, and attachments
    /// beyond the new bus's capacity are dropped in list order. Each drop
    /// needs the user's consent; both questions are asked before anything
    /// changes, and a refusal leaves the controller untouched.
    fn change_bus(&self, controller: NodeId, bus: StorageBus) -> bool {
        let _span = tracing::debug_span!(target: targets::MODEL, span_names::BUS_CHANGE, %bus).entered();

        let Some(plan) = self.plan_bus_change(controller, bus) else {
            return false;
        };

        if !plan.optical.is_empty()
            && !self
                .message_center
                .confirm_bus_change_with_optical_removal(&plan.name, bus.name())
        {
            tracing::info!(target: targets::MODEL, controller = %plan.name, %bus, "optical removal declined");
            return false;
        }
        if !plan.excess.is_empty()
            && !self
                .message_center
                .confirm_bus_change_with_excessive_removal(&plan.name, bus.name(), plan.excess.len())
        {
            tracing::info!(target: targets::MODEL, controller = %plan.name, %bus, "excess removal declined");
            return false;
        }

        for attachment in plan.optical.iter().chain(&plan.excess) {
            self.del_attachment(controller, *attachment);
        }

        let (index, moved) = {
            let mut tree = self.tree.write();
            let Some(item) = tree.controller_mut(controller) else {
                return false;
            };
            item.set_bus(bus, self.platform.as_ref());
            item.set_controller_type(plan.new_type, self.platform.as_ref());

            let mut moved = Vec::new();
            for attachment in tree.attachment_ids(controller, None) {
                let available = tree.available_slots(attachment, self.platform.as_ref());
                let current = tree.attachment(attachment).map(|att| att.slot());
                if let (Some(first), Some(current)) = (available.first().copied(), current) {
                    if !available.contains(&current) {
                        if let Some(att) = tree.attachment_mut(attachment) {
                            att.set_slot(first);
                        }
                        moved.push(Self::index_in(&tree, attachment));
                    }
                }
            }
            (Self::index_in(&tree, controller), moved)
        };

        self.signals.emit_data_changed_single(
            index,
            vec![StorageRole::CtrBusType.into(), StorageRole::CtrType.into()],
        );
        for index in moved {
            self.signals
                .emit_data_changed_single(index, vec![StorageRole::AttSlot.into()]);
        }

        tracing::debug!(
            target: targets::MODEL,
            controller = %plan.name,
            %bus,
            controller_type = %plan.new_type,
            removed = plan.optical.len() + plan.excess.len(),
            "bus changed"
        );
        true
    }

    fn plan_bus_change(&self, controller: NodeId, bus: StorageBus) -> Option<BusChangePlan> {
        let tree = self.tree.read();
        let item = tree.controller(controller)?;

        let mut preview = item.clone();
        preview.set_bus(bus, self.platform.as_ref());
        let Some(new_type) = preview.types_for_bus(bus).first().copied() else {
            tracing::trace!(target: targets::MODEL, %bus, "no controller type for bus");
            return None;
        };

        let optical = if bus == StorageBus::PCIe {
            tree.attachment_ids(controller, Some(DeviceType::Dvd))
        } else {
            Vec::new()
        };
        let remaining: Vec<NodeId> = tree
            .attachment_ids(controller, None)
            .into_iter()
            .filter(|id| !optical.contains(id))
            .collect();
        let capacity = usize::try_from(self.platform.slot_capacity(bus)).unwrap_or(usize::MAX);
        let excess = remaining.get(capacity..).map(<[NodeId]>::to_vec).unwrap_or_default();

        Some(BusChangePlan {
            name: item.name().to_string(),
            new_type,
            optical,
            excess,
        })
    }

    // -------------------------------------------------------------------------
    // Field access
    // -------------------------------------------------------------------------

    fn size_hint(&self) -> Size {
        let metrics = self.metrics;
        let height = 2 * metrics.margin + metrics.line_height.max(metrics.icon_size);
        Size {
            width: 1,
            height: i32::try_from(height).unwrap_or(i32::MAX),
        }
    }

    fn read(&self, tree: &StorageTree, id: NodeId, role: ItemRole) -> ItemData {
        let Some(item) = tree.item(id) else {
            return ItemData::None;
        };

        match role {
            ItemRole::Display => match item {
                Item::Root => ItemData::None,
                _ => ItemData::String(tree.text(id)),
            },
            ItemRole::Decoration => tree
                .pixmap(id, ItemState::Default)
                .map_or(ItemData::None, ItemData::Pixmap),
            ItemRole::ToolTip => match item {
                Item::Controller(_) => {
                    let hint = match self.tool_tip_kind() {
                        ToolTipKind::Default => None,
                        ToolTipKind::Expander => (tree.child_count(id) > 0).then_some("Expand/Collapse item"),
                        ToolTipKind::HardDiskAdder => Some("Add hard disk"),
                        ToolTipKind::OpticalAdder => Some("Add optical drive"),
                        ToolTipKind::FloppyAdder => Some("Add floppy drive"),
                    };
                    ItemData::String(hint.map_or_else(|| tree.tool_tip(id), str::to_string))
                }
                Item::Attachment(_) => ItemData::String(tree.tool_tip(id)),
                Item::Root => ItemData::None,
            },
            ItemRole::SizeHint => ItemData::Size(self.size_hint()),
            ItemRole::Storage(role) => self.read_storage(tree, id, item, role),
        }
    }

    fn read_storage(&self, tree: &StorageTree, id: NodeId, item: &Item, role: StorageRole) -> ItemData {
        let metrics = self.metrics;
        let margin = i32::try_from(metrics.margin).unwrap_or(0);
        let spacing = i32::try_from(metrics.spacing).unwrap_or(0);
        let icon = i32::try_from(metrics.icon_size).unwrap_or(0);

        match role {
            StorageRole::ItemId => ItemData::Id(id),
            StorageRole::ItemType => ItemData::Kind(item.kind()),
            StorageRole::IsController => ItemData::Bool(matches!(item, Item::Controller(_))),
            StorageRole::IsAttachment => ItemData::Bool(matches!(item, Item::Attachment(_))),
            StorageRole::ItemName => ItemData::String(tree.text(id)),
            StorageRole::ItemPixmapDefault => self.pixmap_data(tree, id, ItemState::Default),
            StorageRole::ItemPixmapCollapsed => self.pixmap_data(tree, id, ItemState::Collapsed),
            StorageRole::ItemPixmapExpanded => self.pixmap_data(tree, id, ItemState::Expanded),
            StorageRole::ItemPixmapRect => ItemData::Rect(Rect::new(margin, margin, icon, icon)),
            StorageRole::ItemNamePoint => {
                let height = self.size_hint().height;
                let ascent = i32::try_from(metrics.line_height).unwrap_or(0);
                ItemData::Point(Point {
                    x: margin + icon + 2 * spacing,
                    y: height / 2 + ascent / 2 - 1,
                })
            }
            StorageRole::ToolTipType => ItemData::ToolTipKind(self.tool_tip_kind()),

            StorageRole::IsMoreControllersPossible(bus) => ItemData::Bool(self.controllers_possible(tree, bus)),
            StorageRole::IsMoreAttachmentsPossible => ItemData::Bool(self.attachments_possible(tree, id)),

            StorageRole::Margin => ItemData::Int(i64::from(metrics.margin)),
            StorageRole::Spacing => ItemData::Int(i64::from(metrics.spacing)),
            StorageRole::IconSize => ItemData::Int(i64::from(metrics.icon_size)),
            StorageRole::DeviceAddPixmap(device) => match item {
                Item::Controller(_) => ItemData::Pixmap(PixmapKey::DeviceAdd {
                    device,
                    enabled: self.attachments_possible(tree, id),
                }),
                _ => ItemData::None,
            },
            StorageRole::DeviceAddPixmapRect(device) => {
                let x = match device {
                    DeviceType::Dvd => -icon - spacing - icon - margin,
                    DeviceType::HardDisk | DeviceType::Floppy => -icon - margin,
                };
                ItemData::Rect(Rect::new(x, margin, icon, icon))
            }

            role if role.is_controller_role() => match item {
                Item::Controller(controller) => self.read_controller(tree, id, controller, role),
                _ => ItemData::None,
            },
            role if role.is_attachment_role() => self.read_attachment(tree, id, role),
            _ => ItemData::None,
        }
    }

    fn pixmap_data(&self, tree: &StorageTree, id: NodeId, state: ItemState) -> ItemData {
        tree.pixmap(id, state).map_or(ItemData::None, ItemData::Pixmap)
    }

    fn read_controller(&self, tree: &StorageTree, id: NodeId, controller: &ControllerItem, role: StorageRole) -> ItemData {
        match role {
            StorageRole::CtrName => ItemData::String(controller.name().to_string()),
            StorageRole::CtrType => ItemData::ControllerType(controller.controller_type()),
            StorageRole::CtrTypesForBus(bus) => ItemData::ControllerTypes(controller.types_for_bus(bus).to_vec()),
            StorageRole::CtrDevices => ItemData::DeviceTypes(self.platform.device_types_for_bus(controller.bus())),
            StorageRole::CtrBusType => ItemData::Bus(controller.bus()),
            StorageRole::CtrBusTypes => ItemData::Buses(controller.buses().to_vec()),
            StorageRole::CtrPortCount => ItemData::Int(i64::from(tree.effective_port_count(id))),
            StorageRole::CtrMaxPortCount => ItemData::Int(i64::from(self.platform.max_port_count(controller.bus()))),
            StorageRole::CtrIoCache => ItemData::Bool(controller.use_io_cache()),
            _ => ItemData::None,
        }
    }

    fn read_attachment(&self, tree: &StorageTree, id: NodeId, role: StorageRole) -> ItemData {
        let Some(att) = tree.attachment(id) else {
            return ItemData::None;
        };
        let display = att.display();
        match role {
            StorageRole::AttSlot => ItemData::Slot(att.slot()),
            StorageRole::AttSlots => ItemData::Slots(tree.available_slots(id, self.platform.as_ref())),
            StorageRole::AttDevice => ItemData::DeviceType(att.device_type()),
            StorageRole::AttMediumId => ItemData::Medium(att.medium_id()),
            StorageRole::AttIsHostDrive => ItemData::Bool(att.is_host_drive()),
            StorageRole::AttIsPassthrough => ItemData::Bool(att.is_passthrough()),
            StorageRole::AttIsTempEject => ItemData::Bool(att.is_temp_eject()),
            StorageRole::AttIsNonRotational => ItemData::Bool(att.is_non_rotational()),
            StorageRole::AttIsHotPluggable => ItemData::Bool(att.is_hot_pluggable()),
            StorageRole::AttSize => ItemData::String(display.size.clone()),
            StorageRole::AttLogicalSize => ItemData::String(display.logical_size.clone()),
            StorageRole::AttLocation => ItemData::String(display.location.clone()),
            StorageRole::AttFormat => ItemData::String(display.format.clone()),
            StorageRole::AttDetails => ItemData::String(display.details.clone()),
            StorageRole::AttUsage => ItemData::String(display.usage.clone()),
            StorageRole::AttEncryptionPasswordId => ItemData::String(display.encryption_password_id.clone()),
            _ => ItemData::None,
        }
    }

    /// Apply a write under the lock. Returns whether the attachment order
    /// may have changed, or `None` if the write was rejected.
    fn write(&self, tree: &mut StorageTree, id: NodeId, role: StorageRole, value: &ItemData) -> Option<bool> {
        let platform = self.platform.as_ref();
        match role {
            StorageRole::CtrName => {
                let name = value.as_string()?;
                tree.controller_mut(id)?.set_name(name);
            }
            StorageRole::CtrType => {
                let controller_type = value.as_controller_type()?;
                let controller = tree.controller_mut(id)?;
                if !controller.types_for_bus(controller.bus()).contains(&controller_type) {
                    return None;
                }
                controller.set_controller_type(controller_type, platform);
            }
            StorageRole::CtrPortCount => {
                let port_count = value.as_u32()?;
                tree.controller_mut(id)?.set_port_count(port_count, platform);
            }
            StorageRole::CtrIoCache => {
                let use_io_cache = value.as_bool()?;
                tree.controller_mut(id)?.set_use_io_cache(use_io_cache);
            }
            StorageRole::AttSlot => {
                let slot: StorageSlot = value.as_slot()?;
                if !tree.available_slots(id, platform).contains(&slot) {
                    return None;
                }
                tree.attachment_mut(id)?.set_slot(slot);
                return Some(true);
            }
            StorageRole::AttMediumId => {
                let medium_id = value.as_medium()?;
                tree.attachment_mut(id)?.set_medium(medium_id, self.mediums.as_ref());
            }
            StorageRole::AttIsPassthrough => {
                let flag = value.as_bool()?;
                tree.attachment_mut(id)?.set_passthrough(flag);
            }
            StorageRole::AttIsTempEject => {
                let flag = value.as_bool()?;
                tree.attachment_mut(id)?.set_temp_eject(flag);
            }
            StorageRole::AttIsNonRotational => {
                let flag = value.as_bool()?;
                tree.attachment_mut(id)?.set_non_rotational(flag);
            }
            StorageRole::AttIsHotPluggable => {
                let flag = value.as_bool()?;
                tree.attachment_mut(id)?.set_hot_pluggable(flag);
            }
            _ => return None,
        }
        Some(false)
    }

    // -------------------------------------------------------------------------
    // Debugging
    // -------------------------------------------------------------------------

    /// Render the tree for logs.
    pub fn debug_tree(&self, options: TreeFormatOptions) -> String {
        let tree = self.tree.read();
        let mut lines = vec![TreeLine {
            depth: 0,
            is_last: true,
            label: "Storage".to_string(),
            id: Some(format!("{:?}", tree.root())),
            kind: Some(ItemKind::Root.name()),
            properties: vec![
                ("access_level", format!("{:?}", self.configuration_access_level())),
                ("chipset", format!("{:?}", self.chipset_type())),
            ],
        }];

        let controllers = tree.controllers();
        for (i, ctr) in controllers.iter().enumerate() {
            let Some(controller) = tree.controller(*ctr) else {
                continue;
            };
            lines.push(TreeLine {
                depth: 1,
                is_last: i + 1 == controllers.len(),
                label: controller.name().to_string(),
                id: Some(format!("{ctr:?}")),
                kind: Some(ItemKind::Controller.name()),
                properties: vec![
                    ("bus", controller.bus().to_string()),
                    ("type", controller.controller_type().to_string()),
                    ("port_count", tree.effective_port_count(*ctr).to_string()),
                    ("io_cache", controller.use_io_cache().to_string()),
                ],
            });

            let attachments = tree.children(*ctr);
            for (j, att_id) in attachments.iter().enumerate() {
                let Some(att) = tree.attachment(*att_id) else {
                    continue;
                };
                lines.push(TreeLine {
                    depth: 2,
                    is_last: j + 1 == attachments.len(),
                    label: format!("{}: {}", att.slot(), att.display().name),
                    id: Some(format!("{att_id:?}")),
                    kind: Some(ItemKind::Attachment.name()),
                    properties: vec![
                        ("device", att.device_type().to_string()),
                        (
                            "medium",
                            att.medium_id().map_or_else(|| "--".to_string(), |id| id.to_string()),
                        ),
                        ("hot_pluggable", att.is_hot_pluggable().to_string()),
                    ],
                });
            }
        }

        TreeFormatter::with_options(options).format("Storage tree", &lines)
    }
}

impl ItemModel for StorageModel {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        if !parent.is_valid() {
            return 1;
        }
        let tree = self.tree.read();
        Self::resolve(&tree, parent).map_or(0, |id| tree.child_count(id))
    }

    fn column_count(&self, _parent: &ModelIndex) -> usize {
        1
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        let tree = self.tree.read();
        match Self::resolve(&tree, index) {
            Some(id) => self.read(&tree, id, role),
            None => ItemData::None,
        }
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if column != 0 {
            return ModelIndex::invalid();
        }
        let tree = self.tree.read();
        if !parent.is_valid() {
            return if row == 0 {
                ModelIndex::with_internal_id(0, 0, tree.root().as_raw())
            } else {
                ModelIndex::invalid()
            };
        }
        Self::resolve(&tree, parent)
            .and_then(|parent| tree.child_item(parent, row))
            .map_or_else(ModelIndex::invalid, |id| ModelIndex::with_internal_id(row, 0, id.as_raw()))
    }

    fn parent(&self, index: &ModelIndex) -> ModelIndex {
        let tree = self.tree.read();
        Self::resolve(&tree, index)
            .and_then(|id| tree.parent(id))
            .map_or_else(ModelIndex::invalid, |parent| Self::index_in(&tree, parent))
    }

    fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    fn set_data(&self, index: &ModelIndex, value: ItemData, role: ItemRole) -> bool {
        let Some(id) = self.item_id(index) else {
            return false;
        };
        let ItemRole::Storage(role) = role else {
            return false;
        };

        match role {
            StorageRole::ToolTipType => {
                let ItemData::ToolTipKind(kind) = value else {
                    return false;
                };
                self.tool_tip_kind.set_silent(kind);
            }
            StorageRole::CtrBusType => {
                let Some(bus) = value.as_bus() else {
                    return false;
                };
                // Emits its own notifications.
                return self.change_bus(id, bus);
            }
            _ => {
                let result = self.write(&mut self.tree.write(), id, role, &value);
                match result {
                    None => {
                        tracing::trace!(target: targets::MODEL, ?id, ?role, "write rejected");
                        return false;
                    }
                    Some(reorder) => {
                        let index = self.index_of(id);
                        self.signals.emit_data_changed_single(index, vec![role.into()]);
                        if reorder {
                            self.sort(SortOrder::Ascending);
                        }
                        return true;
                    }
                }
            }
        }

        self.signals
            .emit_data_changed_single(self.index_of(id), vec![role.into()]);
        true
    }

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        match self.item_kind(index) {
            Some(ItemKind::Controller) => ItemFlags::new().with_drop_enabled(true),
            Some(ItemKind::Attachment) => ItemFlags::new()
                .with_drag_enabled(true)
                .with_never_has_children(true),
            Some(ItemKind::Root) => ItemFlags::new(),
            None => ItemFlags::disabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformProfile;
    use crate::storage::{AcceptAll, Medium, MediumCache};
    use parking_lot::Mutex;
    use uuid::Uuid;

    fn model() -> StorageModel {
        let model = StorageModel::new(
            Arc::new(PlatformProfile::x86()),
            Arc::new(MediumCache::new()),
            Arc::new(AcceptAll),
        );
        model.set_configuration_access_level(ConfigurationAccessLevel::Full);
        model
    }

    fn id(model: &StorageModel, index: &ModelIndex) -> NodeId {
        model.item_id(index).unwrap()
    }

    #[test]
    fn test_addressing() {
        let model = model();
        let root = model.root();
        assert!(root.is_valid());
        assert_eq!(model.row_count(&ModelIndex::invalid()), 1);
        assert_eq!(model.row_count(&root), 0);
        assert!(!model.index(1, 0, &ModelIndex::invalid()).is_valid());
        assert!(!model.parent(&root).is_valid());

        let ctr = model.add_controller("SATA", StorageBus::Sata, ControllerType::IntelAhci);
        let att = model.add_attachment(id(&model, &ctr), DeviceType::HardDisk, None);
        assert_eq!(model.index(0, 0, &root), ctr);
        assert_eq!(model.index(0, 0, &ctr), att);
        assert_eq!(model.parent(&att), ctr);
        assert_eq!(model.parent(&ctr), root);
        assert_eq!(model.column_count(&root), 1);
        assert!(!model.index(0, 1, &root).is_valid());
    }

    #[test]
    fn test_wrong_kind_reads_default() {
        let model = model();
        let ctr = model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4);

        assert!(model.data(&ctr, StorageRole::AttSlot.into()).is_none());
        assert!(model.data(&model.root(), StorageRole::CtrName.into()).is_none());
        assert_eq!(
            model.data(&ctr, StorageRole::CtrName.into()).as_string(),
            Some("IDE")
        );
        assert!(!model.set_data(&ctr, ItemData::Bool(true), StorageRole::AttIsPassthrough.into()));
    }

    #[test]
    fn test_set_data_notifies_once() {
        let model = model();
        let ctr = model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4);
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        model.signals().data_changed.connect(move |(index, _, roles)| {
            sink.lock().push((*index, roles.clone()));
        });

        assert!(model.set_data(&ctr, "Primary".into(), StorageRole::CtrName.into()));
        assert!(!model.set_data(&ctr, ItemData::Int(5), StorageRole::CtrName.into()));

        let changes = changes.lock();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, ctr);
        assert_eq!(model.data(&ctr, ItemRole::Display).as_string(), Some("Controller: Primary"));
    }

    #[test]
    fn test_controller_type_must_match_bus() {
        let model = model();
        let ctr = model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4);
        assert!(!model.set_data(&ctr, ControllerType::IntelAhci.into(), StorageRole::CtrType.into()));
        assert!(model.set_data(&ctr, ControllerType::Ich6.into(), StorageRole::CtrType.into()));
        assert_eq!(
            model.data(&ctr, StorageRole::CtrType.into()).as_controller_type(),
            Some(ControllerType::Ich6)
        );
    }

    #[test]
    fn test_slot_write_resorts() {
        let model = model();
        let ctr = model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4);
        let ctr_id = id(&model, &ctr);
        let first = model.add_attachment(ctr_id, DeviceType::HardDisk, None);
        let first_id = id(&model, &first);
        model.add_attachment(ctr_id, DeviceType::Dvd, None);

        let taken = StorageSlot::new(StorageBus::Ide, 0, 1);
        assert!(!model.set_data(&first, taken.into(), StorageRole::AttSlot.into()));

        let last = StorageSlot::new(StorageBus::Ide, 1, 1);
        assert!(model.set_data(&first, last.into(), StorageRole::AttSlot.into()));
        assert_eq!(model.attachments(ctr_id)[1], first_id);
    }

    #[test]
    fn test_tool_tip_kind() {
        let model = model();
        let ctr = model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4);
        assert_eq!(
            model.data(&ctr, ItemRole::ToolTip).as_string(),
            Some("IDE\nBus: IDE\nType: PIIX4")
        );

        assert!(model.set_data(&ctr, ToolTipKind::Expander.into(), StorageRole::ToolTipType.into()));
        assert_eq!(
            model.data(&ctr, ItemRole::ToolTip).as_string(),
            Some("IDE\nBus: IDE\nType: PIIX4")
        );

        model.set_data(&ctr, ToolTipKind::OpticalAdder.into(), StorageRole::ToolTipType.into());
        assert_eq!(model.data(&ctr, ItemRole::ToolTip).as_string(), Some("Add optical drive"));
    }

    #[test]
    fn test_layout_roles() {
        let model = model();
        let ctr = model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4);
        assert_eq!(
            model.data(&ctr, ItemRole::SizeHint),
            ItemData::Size(Size { width: 1, height: 24 })
        );
        assert_eq!(
            model.data(&ctr, StorageRole::DeviceAddPixmapRect(DeviceType::Dvd).into()).as_rect(),
            Some(Rect::new(-40, 4, 16, 16))
        );
        assert_eq!(
            model.data(&ctr, StorageRole::ItemNamePoint.into()),
            ItemData::Point(Point { x: 28, y: 19 })
        );
        assert_eq!(
            model.data(&ctr, StorageRole::DeviceAddPixmap(DeviceType::HardDisk).into()).as_pixmap(),
            Some(PixmapKey::DeviceAdd {
                device: DeviceType::HardDisk,
                enabled: true
            })
        );
    }

    #[test]
    fn test_controller_capacity() {
        let model = model();
        assert!(model.is_more_controllers_possible(StorageBus::Ide));
        model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4);
        assert!(!model.is_more_controllers_possible(StorageBus::Ide));

        model.set_chipset_type(ChipsetType::Ich9);
        assert!(model.is_more_controllers_possible(StorageBus::Sata));
        assert_eq!(model.maximum_controller_types()[&StorageBus::Sata], 8);
        assert_eq!(model.current_controller_types()[&StorageBus::Ide], 1);

        model.set_configuration_access_level(ConfigurationAccessLevel::PartialRunning);
        assert!(!model.is_more_controllers_possible(StorageBus::Sata));
    }

    #[test]
    fn test_attachment_capacity_while_running() {
        let model = model();
        let sata = id(&model, &model.add_controller("SATA", StorageBus::Sata, ControllerType::IntelAhci));
        let ide = id(&model, &model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4));
        let usb = id(&model, &model.add_controller("USB", StorageBus::Usb, ControllerType::Usb));
        model.set_data(&model.index_of(sata), ItemData::Int(1), StorageRole::CtrPortCount.into());

        model.set_configuration_access_level(ConfigurationAccessLevel::PartialRunning);
        assert!(model.is_more_attachments_possible(sata));
        assert!(model.is_more_attachments_possible(usb));
        assert!(!model.is_more_attachments_possible(ide));

        model.add_attachment(sata, DeviceType::HardDisk, None);
        assert!(!model.is_more_attachments_possible(sata));

        model.set_configuration_access_level(ConfigurationAccessLevel::PartialSaved);
        assert!(!model.is_more_attachments_possible(usb));
    }

    #[test]
    fn test_medium_refresh_and_forget() {
        let mediums = Arc::new(MediumCache::new());
        let model = StorageModel::new(Arc::new(PlatformProfile::x86()), mediums.clone(), Arc::new(AcceptAll));
        let ctr = id(&model, &model.add_controller("SATA", StorageBus::Sata, ControllerType::IntelAhci));
        let medium_id = Uuid::new_v4();
        let att = model.add_attachment(ctr, DeviceType::Dvd, Some(medium_id));
        assert_eq!(model.data(&att, ItemRole::Display).as_string(), Some("Empty"));

        mediums.insert(Medium {
            id: medium_id,
            device_type: Some(DeviceType::Dvd),
            name: "install.iso".to_string(),
            ..Medium::default()
        });
        assert_eq!(model.refresh_medium(medium_id), 1);
        assert_eq!(model.data(&att, ItemRole::Display).as_string(), Some("install.iso"));

        assert_eq!(model.forget_medium(medium_id), 1);
        assert_eq!(model.data(&att, StorageRole::AttMediumId.into()), ItemData::Medium(None));
        assert_eq!(model.forget_medium(medium_id), 0);
    }

    #[test]
    fn test_debug_tree() {
        let model = model();
        let ctr = id(&model, &model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4));
        model.add_attachment(ctr, DeviceType::Dvd, None);

        let dump = model.debug_tree(TreeFormatOptions::minimal());
        assert!(dump.contains("Storage tree"));
        assert!(dump.contains("IDE"));
        assert!(dump.contains("IDE Primary Device 0: Empty"));
    }

    #[test]
    fn test_flags() {
        let model = model();
        let ctr = model.add_controller("IDE", StorageBus::Ide, ControllerType::Piix4);
        let att = model.add_attachment(id(&model, &ctr), DeviceType::Dvd, None);
        assert!(model.flags(&ctr).drop_enabled);
        assert!(model.flags(&att).drag_enabled);
        assert!(!model.flags(&ModelIndex::invalid()).enabled);
    }
}
