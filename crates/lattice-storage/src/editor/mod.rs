//! The storage settings editor.
//!
//! [`StorageSettingsEditor`] sits between a host settings dialog and a
//! [`StorageModel`]. It loads and saves [`StorageSnapshot`]s, tracks the
//! current item, routes user actions into model mutations and reports
//! which actions and fields are available.
//!
//! # Signals
//!
//! - `value_changed`: after every successful edit
//! - `current_changed`: after the current item changes
//! - `actions_changed`: after the set of available actions changes
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_storage::config::PlatformProfile;
//! use lattice_storage::editor::{NoSelection, StorageSettingsEditor};
//! use lattice_storage::storage::{
//!     AcceptAll, ConfigurationAccessLevel, ControllerType, MediumCache, StorageModel,
//! };
//!
//! let model = Arc::new(StorageModel::new(
//!     Arc::new(PlatformProfile::x86()),
//!     Arc::new(MediumCache::new()),
//!     Arc::new(AcceptAll),
//! ));
//! let editor = StorageSettingsEditor::new(model, Arc::new(NoSelection));
//! editor.set_configuration_access_level(ConfigurationAccessLevel::Full);
//!
//! editor.add_controller_of_type(ControllerType::Usb);
//! editor.add_controller_of_type(ControllerType::Usb);
//! assert_eq!(editor.save().controllers[1].name, "USB 2");
//! ```

mod details;
mod selector;

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use lattice_storage_core::logging::{span_names, targets};
use lattice_storage_core::{ConnectionId, PerfSpan, Property, Signal};
use parking_lot::RwLock;
use static_assertions::assert_impl_all;

pub use details::{ActionStates, AttachmentDetails, ControllerDetails, ItemDetails, PaneAvailability};
pub use selector::{MediumSelection, MediumSelector, NoSelection};

use crate::error::{Error, Result};
use crate::model::{ItemData, ItemModel, ModelIndex};
use crate::storage::{
    ChipsetType, ConfigurationAccessLevel, ControllerType, DeviceType, ItemKind, MediumCache, MediumId, NodeId,
    SortOrder, StorageAttachmentData, StorageBus, StorageControllerData, StorageModel, StorageRole, StorageSlot,
    StorageSnapshot,
};

/// Controller of the storage settings page.
pub struct StorageSettingsEditor {
    model: Arc<StorageModel>,
    selector: Arc<dyn MediumSelector>,
    /// `None` when the root is current.
    current: RwLock<Option<NodeId>>,
    actions: Property<ActionStates>,

    /// Emitted after every successful edit.
    pub value_changed: Signal<()>,

    /// Emitted with the new current index.
    pub current_changed: Signal<ModelIndex>,

    /// Emitted when action availability changes.
    pub actions_changed: Signal<ActionStates>,
}

assert_impl_all!(StorageSettingsEditor: Send, Sync);

impl StorageSettingsEditor {
    /// Create an editor over `model`.
    pub fn new(model: Arc<StorageModel>, selector: Arc<dyn MediumSelector>) -> Self {
        let editor = Self {
            model,
            selector,
            current: RwLock::new(None),
            actions: Property::default(),
            value_changed: Signal::new(),
            current_changed: Signal::new(),
            actions_changed: Signal::new(),
        };
        editor.actions.set_silent(editor.compute_action_states());
        editor
    }

    /// The model being edited.
    pub fn model(&self) -> &Arc<StorageModel> {
        &self.model
    }

    // -------------------------------------------------------------------------
    // Host state
    // -------------------------------------------------------------------------

    /// Current configuration access level.
    pub fn configuration_access_level(&self) -> ConfigurationAccessLevel {
        self.model.configuration_access_level()
    }

    /// Change the access level and re-evaluate what may be edited.
    pub fn set_configuration_access_level(&self, level: ConfigurationAccessLevel) {
        if !self.model.set_configuration_access_level(level) {
            return;
        }
        tracing::debug!(target: targets::EDITOR, ?level, "access level applied");
        self.update_action_states();
    }

    /// Current chipset.
    pub fn chipset_type(&self) -> ChipsetType {
        self.model.chipset_type()
    }

    /// Change the chipset, which changes the controller limits.
    pub fn set_chipset_type(&self, chipset: ChipsetType) {
        if !self.model.set_chipset_type(chipset) {
            return;
        }
        self.update_action_states();
        self.value_changed.emit(());
    }

    /// Number of controllers per bus.
    pub fn current_controller_types(&self) -> BTreeMap<StorageBus, u32> {
        self.model.current_controller_types()
    }

    /// Maximum number of controllers per bus.
    pub fn maximum_controller_types(&self) -> BTreeMap<StorageBus, u32> {
        self.model.maximum_controller_types()
    }

    /// Number of attachments of `device_type` across all controllers.
    pub fn device_count(&self, device_type: DeviceType) -> usize {
        self.model.device_count(device_type)
    }

    // -------------------------------------------------------------------------
    // Load and save
    // -------------------------------------------------------------------------

    /// Replace the model contents with `snapshot`.
    ///
    /// The snapshot is validated first; on error the model is untouched.
    /// Every controller type must belong to its bus and every attachment
    /// must sit on a slot the bus has.
    pub fn load(&self, snapshot: &StorageSnapshot) -> Result<()> {
        snapshot.validate()?;
        let platform = self.model.platform();
        for (controller, attachments) in snapshot.controllers.iter().zip(&snapshot.attachments) {
            if platform.bus_for_controller_type(controller.controller_type) != Some(controller.bus) {
                return Err(Error::invalid_snapshot(
                    &controller.name,
                    format!("{} is not a {} controller", controller.controller_type, controller.bus),
                ));
            }
            let max_ports = platform.max_port_count(controller.bus);
            let max_devices = platform.max_devices_per_port(controller.bus);
            if let Some(outside) = attachments
                .iter()
                .find(|att| att.port >= max_ports || att.device >= max_devices)
            {
                return Err(Error::invalid_snapshot(
                    &controller.name,
                    format!(
                        "slot {} outside {} ports x {} devices of {}",
                        outside.key(),
                        max_ports,
                        max_devices,
                        controller.bus
                    ),
                ));
            }
        }

        let _perf = PerfSpan::new(span_names::LOAD);
        self.model.clear();

        for (controller, attachments) in snapshot.controllers.iter().zip(&snapshot.attachments) {
            let index = self
                .model
                .add_controller(&controller.name, controller.bus, controller.controller_type);
            let Some(controller_id) = self.model.item_id(&index) else {
                continue;
            };
            self.model
                .set_data(&index, controller.port_count.into(), StorageRole::CtrPortCount.into());
            self.model
                .set_data(&index, controller.use_host_io_cache.into(), StorageRole::CtrIoCache.into());

            for attachment in attachments {
                self.load_attachment(controller_id, controller, attachment);
            }
        }

        let first = self.model.controllers().first().copied();
        *self.current.write() = first;
        tracing::debug!(
            target: targets::EDITOR,
            controllers = snapshot.controllers.len(),
            attachments = snapshot.attachments.iter().map(Vec::len).sum::<usize>(),
            "storage loaded"
        );
        self.update_action_states();
        self.current_changed.emit(self.current());
        Ok(())
    }

    fn load_attachment(&self, controller_id: NodeId, controller: &StorageControllerData, data: &StorageAttachmentData) {
        let index = self
            .model
            .add_attachment(controller_id, data.device_type, data.medium_id);
        let Some(id) = self.model.item_id(&index) else {
            tracing::warn!(
                target: targets::EDITOR,
                controller = %controller.name,
                slot = %data.key(),
                "no room for attachment, skipped"
            );
            return;
        };

        let slot = StorageSlot::new(controller.bus, data.port, data.device);
        if !self
            .model
            .set_data(&self.model.index_of(id), slot.into(), StorageRole::AttSlot.into())
        {
            tracing::warn!(target: targets::EDITOR, controller = %controller.name, %slot, "slot not available");
        }

        let fields = [
            (StorageRole::AttIsPassthrough, data.passthrough),
            (StorageRole::AttIsTempEject, data.temp_eject),
            (StorageRole::AttIsNonRotational, data.non_rotational),
            (StorageRole::AttIsHotPluggable, data.hot_pluggable),
        ];
        for (role, value) in fields {
            self.model.set_data(&self.model.index_of(id), value.into(), role.into());
        }
    }

    /// Produce a snapshot of the current model contents.
    ///
    /// Attachments come out in slot order.
    pub fn save(&self) -> StorageSnapshot {
        let _perf = PerfSpan::new(span_names::SAVE);
        let model = self.model.as_ref();
        let root = model.root();

        let mut snapshot = StorageSnapshot::default();
        for row in 0..model.row_count(&root) {
            let index = model.index(row, 0, &root);
            let read = |role: StorageRole| model.data(&index, role.into());
            let (Some(bus), Some(controller_type)) =
                (read(StorageRole::CtrBusType).as_bus(), read(StorageRole::CtrType).as_controller_type())
            else {
                continue;
            };

            snapshot.controllers.push(StorageControllerData {
                name: read(StorageRole::CtrName).into_string().unwrap_or_default(),
                bus,
                controller_type,
                port_count: read(StorageRole::CtrPortCount).as_u32().unwrap_or(0),
                use_host_io_cache: read(StorageRole::CtrIoCache).as_bool().unwrap_or(false),
            });
            snapshot.attachments.push(
                (0..model.row_count(&index))
                    .filter_map(|row| Self::save_attachment(model, &model.index(row, 0, &index)))
                    .collect(),
            );
        }

        tracing::debug!(target: targets::EDITOR, controllers = snapshot.controllers.len(), "storage saved");
        snapshot
    }

    fn save_attachment(model: &StorageModel, index: &ModelIndex) -> Option<StorageAttachmentData> {
        let read = |role: StorageRole| model.data(index, role.into());
        let flag = |role: StorageRole| read(role).as_bool().unwrap_or(false);
        let slot = read(StorageRole::AttSlot).as_slot()?;
        Some(StorageAttachmentData {
            device_type: read(StorageRole::AttDevice).as_device_type()?,
            port: slot.port,
            device: slot.device,
            medium_id: read(StorageRole::AttMediumId).as_medium().flatten(),
            passthrough: flag(StorageRole::AttIsPassthrough),
            temp_eject: flag(StorageRole::AttIsTempEject),
            non_rotational: flag(StorageRole::AttIsNonRotational),
            hot_pluggable: flag(StorageRole::AttIsHotPluggable),
        })
    }

    // -------------------------------------------------------------------------
    // Current item
    // -------------------------------------------------------------------------

    /// Index of the current item. Falls back to the root when the current
    /// item no longer exists.
    pub fn current(&self) -> ModelIndex {
        match self.current_id() {
            Some(id) => self.model.index_of(id),
            None => self.model.root(),
        }
    }

    /// Node of the current item, `None` for the root.
    pub fn current_id(&self) -> Option<NodeId> {
        let id = (*self.current.read())?;
        self.model
            .item_kind(&self.model.index_of(id))
            .filter(|kind| *kind != ItemKind::Root)
            .map(|_| id)
    }

    /// Make `index` current. Invalid or stale indices select the root.
    pub fn set_current(&self, index: &ModelIndex) {
        let id = self
            .model
            .item_id(index)
            .filter(|_| self.model.item_kind(index) != Some(ItemKind::Root));
        self.select(id);
    }

    fn select(&self, id: Option<NodeId>) {
        *self.current.write() = id;
        self.update_action_states();
        self.current_changed.emit(self.current());
    }

    fn current_kind(&self) -> Option<ItemKind> {
        self.model.item_kind(&self.current())
    }

    /// The current controller, or the controller of the current attachment.
    pub fn current_controller(&self) -> Option<NodeId> {
        let id = self.current_id()?;
        match self.current_kind()? {
            ItemKind::Controller => Some(id),
            ItemKind::Attachment => self.model.controller_of(id),
            ItemKind::Root => None,
        }
    }

    fn current_attachment(&self) -> Option<NodeId> {
        let id = self.current_id()?;
        (self.current_kind()? == ItemKind::Attachment).then_some(id)
    }

    // -------------------------------------------------------------------------
    // Availability
    // -------------------------------------------------------------------------

    /// Which fields accept input for the current item.
    pub fn pane_availability(&self) -> PaneAvailability {
        let device = self
            .current_attachment()
            .and_then(|_| self.read_current(StorageRole::AttDevice).as_device_type());
        PaneAvailability::for_level(self.configuration_access_level(), device)
    }

    /// Which actions are available for the current item.
    pub fn action_states(&self) -> ActionStates {
        self.actions.get()
    }

    fn compute_action_states(&self) -> ActionStates {
        let platform = self.model.platform();
        let add_controller_types: BTreeMap<ControllerType, bool> = ControllerType::ALL
            .iter()
            .map(|ty| {
                let possible = platform
                    .bus_for_controller_type(*ty)
                    .is_some_and(|bus| self.model.is_more_controllers_possible(bus));
                (*ty, possible)
            })
            .collect();

        let level = self.configuration_access_level();
        let kind = self.current_id().and(self.current_kind());
        let hot_pluggable = self
            .read_current(StorageRole::AttIsHotPluggable)
            .as_bool()
            .unwrap_or(false);

        ActionStates {
            add_controller: add_controller_types.values().any(|possible| *possible),
            add_controller_types,
            add_attachment: self
                .current_id()
                .is_some_and(|id| self.model.is_more_attachments_possible(id)),
            remove_controller: kind == Some(ItemKind::Controller) && level == ConfigurationAccessLevel::Full,
            remove_attachment: kind == Some(ItemKind::Attachment)
                && (level == ConfigurationAccessLevel::Full
                    || (level == ConfigurationAccessLevel::PartialRunning && hot_pluggable)),
        }
    }

    fn update_action_states(&self) {
        let states = self.compute_action_states();
        if self.actions.set(states.clone()) {
            self.actions_changed.emit(states);
        }
    }

    // -------------------------------------------------------------------------
    // Controllers
    // -------------------------------------------------------------------------

    /// Controller types offered by the add-controller menu.
    pub fn addable_controller_types(&self) -> Vec<ControllerType> {
        let platform = self.model.platform();
        let buses = platform.supported_buses();
        platform
            .supported_controller_types()
            .into_iter()
            .filter(|ty| {
                platform
                    .bus_for_controller_type(*ty)
                    .is_some_and(|bus| buses.contains(&bus))
            })
            .collect()
    }

    /// A controller name based on `template` that no controller uses yet.
    ///
    /// The bare template counts as number 1, so with "PIIX3" and "PIIX3 2"
    /// present the result is "PIIX3 3".
    pub fn generate_unique_controller_name(&self, template: &str) -> String {
        let names: Vec<String> = self.model.with_tree(|tree| {
            tree.controllers()
                .iter()
                .filter_map(|id| tree.controller(*id))
                .map(|controller| controller.name().to_string())
                .collect()
        });

        let highest = names
            .iter()
            .filter_map(|name| {
                let rest = name.strip_prefix(template)?;
                if rest.is_empty() {
                    Some(1)
                } else {
                    rest.strip_prefix(' ')?.parse::<u32>().ok()
                }
            })
            .max();

        match highest {
            Some(number) => format!("{template} {}", number.saturating_add(1)),
            None => template.to_string(),
        }
    }

    /// Add a controller of `controller_type` with a generated name and make
    /// it current.
    pub fn add_controller_of_type(&self, controller_type: ControllerType) -> Option<NodeId> {
        let bus = self.model.platform().bus_for_controller_type(controller_type)?;
        if !self.model.is_more_controllers_possible(bus) {
            tracing::debug!(target: targets::EDITOR, %bus, "no more controllers possible");
            return None;
        }

        let name = self.generate_unique_controller_name(controller_type.name_template());
        let index = self.model.add_controller(&name, bus, controller_type);
        let id = self.model.item_id(&index)?;
        self.select(Some(id));
        self.value_changed.emit(());
        Some(id)
    }

    /// Remove the current controller with all of its attachments.
    pub fn remove_controller(&self) -> bool {
        if !self.actions.with(|states| states.remove_controller) {
            return false;
        }
        let Some(id) = self.current_id() else {
            return false;
        };
        let row = self.current().row();

        self.model.del_controller(id);
        let controllers = self.model.controllers();
        let next = controllers
            .get(row)
            .or_else(|| controllers.last())
            .copied();
        self.select(next);
        self.value_changed.emit(());
        true
    }

    // -------------------------------------------------------------------------
    // Attachments
    // -------------------------------------------------------------------------

    /// Device types the current controller accepts.
    pub fn attachment_device_choices(&self) -> Vec<DeviceType> {
        self.current_controller()
            .and_then(|id| {
                self.model
                    .data(&self.model.index_of(id), StorageRole::CtrDevices.into())
                    .into_device_types()
            })
            .unwrap_or_default()
    }

    /// Add a `device_type` attachment to the current controller, asking the
    /// medium selector what to put in it.
    pub fn add_attachment(&self, device_type: DeviceType) -> Option<NodeId> {
        let controller = self.current_controller()?;
        if !self.model.is_more_attachments_possible(controller)
            || !self.attachment_device_choices().contains(&device_type)
        {
            tracing::debug!(target: targets::EDITOR, ?device_type, "attachment not possible");
            return None;
        }

        let selection = self.selector.select_medium(device_type, None);
        let Some(medium_id) = selection.resolve(device_type) else {
            tracing::debug!(target: targets::EDITOR, ?device_type, ?selection, "medium selection aborted");
            return None;
        };

        let index = self.model.add_attachment(controller, device_type, medium_id);
        let id = self.model.item_id(&index)?;
        self.model.sort(SortOrder::Ascending);
        self.update_action_states();
        self.value_changed.emit(());
        Some(id)
    }

    /// Remove the current attachment.
    ///
    /// Removing the machine's last optical drive needs confirmation.
    pub fn remove_attachment(&self) -> bool {
        if !self.actions.with(|states| states.remove_attachment) {
            return false;
        }
        let (Some(attachment), Some(controller)) = (self.current_attachment(), self.current_controller()) else {
            return false;
        };

        let device_type = self.model.attachment_device_type(controller, attachment);
        if device_type == Some(DeviceType::Dvd) && self.model.device_count(DeviceType::Dvd) == 1 {
            let name = self
                .model
                .data(&self.model.index_of(controller), StorageRole::CtrName.into())
                .into_string()
                .unwrap_or_default();
            if !self.model.message_center().confirm_removing_last_optical_drive(&name) {
                tracing::info!(target: targets::EDITOR, controller = %name, "last optical drive kept");
                return false;
            }
        }

        self.model.del_attachment(controller, attachment);
        self.select(Some(controller));
        self.value_changed.emit(());
        true
    }

    // -------------------------------------------------------------------------
    // Medium choice
    // -------------------------------------------------------------------------

    /// Let the user pick a medium for the current attachment.
    pub fn choose_existing_medium(&self) -> bool {
        let Some((device_type, current)) = self.editable_attachment_medium() else {
            return false;
        };
        let selection = self.selector.select_medium(device_type, current);
        match selection.resolve(device_type) {
            Some(medium_id) => self.set_current_medium(medium_id),
            None => false,
        }
    }

    /// Let the user open an image file for the current attachment.
    pub fn choose_disk_file(&self) -> bool {
        let Some((device_type, _)) = self.editable_attachment_medium() else {
            return false;
        };
        match self.selector.open_medium_file(device_type) {
            Some(medium_id) => self.set_current_medium(Some(medium_id)),
            None => false,
        }
    }

    /// Put host drive `drive` into the current optical or floppy drive.
    pub fn choose_host_drive(&self, drive: MediumId) -> bool {
        match self.editable_attachment_medium() {
            Some((device_type, _)) if device_type.allows_empty() => self.set_current_medium(Some(drive)),
            _ => false,
        }
    }

    /// Eject the medium of the current optical or floppy drive.
    pub fn unmount_device(&self) -> bool {
        match self.editable_attachment_medium() {
            Some((device_type, Some(_))) if device_type.allows_empty() => self.set_current_medium(None),
            _ => false,
        }
    }

    /// Device type and medium of the current attachment if its medium may
    /// be changed.
    fn editable_attachment_medium(&self) -> Option<(DeviceType, Option<MediumId>)> {
        self.current_attachment()?;
        let device_type = self.read_current(StorageRole::AttDevice).as_device_type()?;
        let hot_pluggable = self.read_current(StorageRole::AttIsHotPluggable).as_bool()?;
        if !details::attachment_editable(self.configuration_access_level(), device_type, hot_pluggable) {
            return None;
        }
        let medium = self.read_current(StorageRole::AttMediumId).as_medium()?;
        Some((device_type, medium))
    }

    fn set_current_medium(&self, medium_id: Option<MediumId>) -> bool {
        self.edit_current(ItemKind::Attachment, StorageRole::AttMediumId, medium_id.into())
    }

    // -------------------------------------------------------------------------
    // Field edits
    // -------------------------------------------------------------------------

    /// Rename the current controller.
    pub fn set_controller_name(&self, name: &str) -> bool {
        self.pane_availability().controller_fields
            && self.edit_current(ItemKind::Controller, StorageRole::CtrName, name.into())
    }

    /// Switch the current controller to `controller_type` on `bus`.
    ///
    /// A bus change runs first; the type is applied only if it went
    /// through.
    pub fn set_controller_type(&self, bus: StorageBus, controller_type: ControllerType) -> bool {
        if !self.pane_availability().controller_fields {
            return false;
        }
        let current_bus = self.read_current(StorageRole::CtrBusType).as_bus();
        if current_bus.is_none() {
            return false;
        }
        if current_bus != Some(bus) && !self.edit_current(ItemKind::Controller, StorageRole::CtrBusType, bus.into()) {
            return false;
        }
        if self.read_current(StorageRole::CtrType).as_controller_type() == Some(controller_type) {
            return true;
        }
        self.edit_current(ItemKind::Controller, StorageRole::CtrType, controller_type.into())
    }

    /// Set the current controller's port count.
    pub fn set_port_count(&self, port_count: u32) -> bool {
        self.pane_availability().controller_fields
            && self.edit_current(ItemKind::Controller, StorageRole::CtrPortCount, port_count.into())
    }

    /// Set the current controller's host IO cache flag.
    pub fn set_use_io_cache(&self, use_io_cache: bool) -> bool {
        self.pane_availability().controller_fields
            && self.edit_current(ItemKind::Controller, StorageRole::CtrIoCache, use_io_cache.into())
    }

    /// Move the current attachment to `slot` and keep it selected.
    pub fn set_attachment_slot(&self, slot: StorageSlot) -> bool {
        if !self.pane_availability().slot
            || !self.edit_current(ItemKind::Attachment, StorageRole::AttSlot, slot.into())
        {
            return false;
        }
        let Some(controller) = self.current_controller() else {
            return true;
        };
        let moved = self.model.attachments(controller).into_iter().find(|id| {
            self.model
                .data(&self.model.index_of(*id), StorageRole::AttSlot.into())
                .as_slot()
                == Some(slot)
        });
        if moved.is_some() {
            self.select(moved);
        }
        true
    }

    /// Set passthrough on the current attachment. Host drives only.
    pub fn set_passthrough(&self, passthrough: bool) -> bool {
        self.pane_availability().passthrough
            && self.read_current(StorageRole::AttIsHostDrive).as_bool() == Some(true)
            && self.edit_current(ItemKind::Attachment, StorageRole::AttIsPassthrough, passthrough.into())
    }

    /// Set temporary eject on the current attachment. Images only.
    pub fn set_temp_eject(&self, temp_eject: bool) -> bool {
        self.pane_availability().temp_eject
            && self.read_current(StorageRole::AttIsHostDrive).as_bool() == Some(false)
            && self.edit_current(ItemKind::Attachment, StorageRole::AttIsTempEject, temp_eject.into())
    }

    /// Mark the current attachment as non-rotational.
    pub fn set_non_rotational(&self, non_rotational: bool) -> bool {
        self.pane_availability().non_rotational
            && self.edit_current(ItemKind::Attachment, StorageRole::AttIsNonRotational, non_rotational.into())
    }

    /// Mark the current attachment as hot-pluggable.
    pub fn set_hot_pluggable(&self, hot_pluggable: bool) -> bool {
        self.pane_availability().hot_pluggable
            && self.edit_current(ItemKind::Attachment, StorageRole::AttIsHotPluggable, hot_pluggable.into())
    }

    fn read_current(&self, role: StorageRole) -> ItemData {
        self.model.data(&self.current(), role.into())
    }

    fn edit_current(&self, kind: ItemKind, role: StorageRole, value: ItemData) -> bool {
        if self.current_id().is_none() || self.current_kind() != Some(kind) {
            return false;
        }
        if !self.model.set_data(&self.current(), value, role.into()) {
            tracing::trace!(target: targets::EDITOR, ?role, "edit rejected");
            return false;
        }
        self.update_action_states();
        self.value_changed.emit(());
        true
    }

    // -------------------------------------------------------------------------
    // Details
    // -------------------------------------------------------------------------

    /// What the details pane shows for the current item.
    pub fn details(&self) -> ItemDetails {
        let Some(id) = self.current_id() else {
            return ItemDetails::Empty;
        };
        match self.current_kind() {
            Some(ItemKind::Controller) => self.controller_details(id),
            Some(ItemKind::Attachment) => self.attachment_details(id),
            _ => ItemDetails::Empty,
        }
    }

    fn controller_details(&self, id: NodeId) -> ItemDetails {
        let read = |role: StorageRole| self.read_current(role);
        let (Some(bus), Some(controller_type)) =
            (read(StorageRole::CtrBusType).as_bus(), read(StorageRole::CtrType).as_controller_type())
        else {
            return ItemDetails::Empty;
        };

        let type_choices = read(StorageRole::CtrBusTypes)
            .into_buses()
            .unwrap_or_default()
            .into_iter()
            .flat_map(|bus| {
                read(StorageRole::CtrTypesForBus(bus))
                    .into_controller_types()
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |ty| (bus, ty))
            })
            .collect();

        ItemDetails::Controller(ControllerDetails {
            id,
            name: read(StorageRole::CtrName).into_string().unwrap_or_default(),
            bus,
            controller_type,
            type_choices,
            port_count_visible: matches!(bus, StorageBus::Sata | StorageBus::Sas),
            port_count: read(StorageRole::CtrPortCount).as_u32().unwrap_or(0),
            max_port_count: read(StorageRole::CtrMaxPortCount).as_u32().unwrap_or(0),
            use_io_cache: read(StorageRole::CtrIoCache).as_bool().unwrap_or(false),
        })
    }

    fn attachment_details(&self, id: NodeId) -> ItemDetails {
        let Some(controller) = self.model.controller_of(id) else {
            return ItemDetails::Empty;
        };
        let read = |role: StorageRole| self.read_current(role);
        let flag = |role: StorageRole| read(role).as_bool().unwrap_or(false);
        let (Some(device_type), Some(slot)) =
            (read(StorageRole::AttDevice).as_device_type(), read(StorageRole::AttSlot).as_slot())
        else {
            return ItemDetails::Empty;
        };
        let Some(display) = self
            .model
            .with_tree(|tree| tree.attachment(id).map(|att| att.display().clone()))
        else {
            return ItemDetails::Empty;
        };

        let host_drive = flag(StorageRole::AttIsHostDrive);
        let hot_pluggable = flag(StorageRole::AttIsHotPluggable);
        ItemDetails::Attachment(AttachmentDetails {
            id,
            controller,
            device_type,
            slot,
            slots: read(StorageRole::AttSlots).into_slots().unwrap_or_default(),
            medium_id: read(StorageRole::AttMediumId).as_medium().flatten(),
            host_drive,
            passthrough: host_drive && flag(StorageRole::AttIsPassthrough),
            temp_eject: !host_drive && flag(StorageRole::AttIsTempEject),
            non_rotational: flag(StorageRole::AttIsNonRotational),
            hot_pluggable,
            editable: details::attachment_editable(self.configuration_access_level(), device_type, hot_pluggable),
            display,
        })
    }

    // -------------------------------------------------------------------------
    // Drag and drop
    // -------------------------------------------------------------------------

    /// Whether `attachment` of `source` may be dropped onto `target`.
    pub fn can_drop_attachment(&self, source: NodeId, attachment: NodeId, target: NodeId) -> bool {
        if source == target || self.model.item_kind(&self.model.index_of(target)) != Some(ItemKind::Controller) {
            return false;
        }
        let Some(device_type) = self.model.attachment_device_type(source, attachment) else {
            return false;
        };
        let accepted = self
            .model
            .data(&self.model.index_of(target), StorageRole::CtrDevices.into())
            .into_device_types()
            .unwrap_or_default();
        accepted.contains(&device_type) && self.model.is_more_attachments_possible(target)
    }

    /// Move `attachment` from `source` to `target`.
    pub fn drop_attachment(&self, source: NodeId, attachment: NodeId, target: NodeId) -> bool {
        if !self.can_drop_attachment(source, attachment, target) {
            tracing::trace!(target: targets::EDITOR, ?source, ?attachment, ?target, "drop refused");
            return false;
        }
        self.model.move_attachment(attachment, source, target);
        self.model.sort(SortOrder::Ascending);
        if *self.current.read() == Some(attachment) {
            self.select(Some(target));
        } else {
            self.update_action_states();
        }
        self.value_changed.emit(());
        true
    }

    // -------------------------------------------------------------------------
    // Medium notifications
    // -------------------------------------------------------------------------

    /// Refresh attachments showing `medium_id` after it was (re)enumerated.
    pub fn handle_medium_enumerated(&self, medium_id: MediumId) {
        let refreshed = self.model.refresh_medium(medium_id);
        if refreshed > 0 {
            tracing::debug!(target: targets::EDITOR, %medium_id, refreshed, "medium refreshed");
            self.value_changed.emit(());
        }
    }

    /// Empty attachments showing `medium_id` after it was deleted.
    pub fn handle_medium_deleted(&self, medium_id: MediumId) {
        let emptied = self.model.forget_medium(medium_id);
        if emptied > 0 {
            tracing::debug!(target: targets::EDITOR, %medium_id, emptied, "medium detached");
            self.value_changed.emit(());
        }
    }

    /// Follow `cache`'s enumeration signals. The connections hold only a
    /// weak reference to the editor.
    pub fn connect_medium_cache(self: &Arc<Self>, cache: &MediumCache) -> (ConnectionId, ConnectionId) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let enumerated = cache.medium_enumerated().connect(move |id| {
            if let Some(editor) = weak.upgrade() {
                editor.handle_medium_enumerated(*id);
            }
        });

        let weak: Weak<Self> = Arc::downgrade(self);
        let deleted = cache.medium_deleted().connect(move |id| {
            if let Some(editor) = weak.upgrade() {
                editor.handle_medium_deleted(*id);
            }
        });
        (enumerated, deleted)
    }
}
