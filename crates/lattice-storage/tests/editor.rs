//! Tests for the storage settings editor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lattice_storage::config::PlatformProfile;
use lattice_storage::editor::{ItemDetails, MediumSelection, MediumSelector, StorageSettingsEditor};
use lattice_storage::storage::{
    ChipsetType, ConfigurationAccessLevel, ControllerType, DeviceType, Medium, MediumCache, MediumId, MessageCenter,
    StorageAttachmentData, StorageBus, StorageControllerData, StorageModel, StorageSlot, StorageSnapshot,
};
use lattice_storage::Error;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Returns whatever the test put in.
struct ScriptedSelector {
    selection: Mutex<MediumSelection>,
    file: Mutex<Option<MediumId>>,
}

impl ScriptedSelector {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            selection: Mutex::new(MediumSelection::Rejected),
            file: Mutex::new(None),
        })
    }

    fn answer(&self, selection: MediumSelection) {
        *self.selection.lock() = selection;
    }
}

impl MediumSelector for ScriptedSelector {
    fn select_medium(&self, _device_type: DeviceType, _current: Option<MediumId>) -> MediumSelection {
        *self.selection.lock()
    }

    fn open_medium_file(&self, _device_type: DeviceType) -> Option<MediumId> {
        *self.file.lock()
    }
}

/// Approves bus changes and answers the last-optical-drive question.
struct LastDriveCenter {
    keep_last_drive: AtomicBool,
    asked: AtomicUsize,
}

impl MessageCenter for LastDriveCenter {
    fn confirm_bus_change_with_optical_removal(&self, _controller: &str, _bus: &str) -> bool {
        true
    }

    fn confirm_bus_change_with_excessive_removal(&self, _controller: &str, _bus: &str, _excess: usize) -> bool {
        true
    }

    fn confirm_removing_last_optical_drive(&self, _controller: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        !self.keep_last_drive.load(Ordering::SeqCst)
    }
}

struct Fixture {
    editor: Arc<StorageSettingsEditor>,
    selector: Arc<ScriptedSelector>,
    center: Arc<LastDriveCenter>,
    mediums: Arc<MediumCache>,
}

fn fixture() -> Fixture {
    init_tracing();
    let mediums = Arc::new(MediumCache::new());
    let selector = ScriptedSelector::new();
    let center = Arc::new(LastDriveCenter {
        keep_last_drive: AtomicBool::new(false),
        asked: AtomicUsize::new(0),
    });
    let model = Arc::new(StorageModel::new(
        Arc::new(PlatformProfile::x86()),
        mediums.clone(),
        center.clone(),
    ));
    let editor = Arc::new(StorageSettingsEditor::new(model, selector.clone()));
    editor.connect_medium_cache(&mediums);
    editor.set_configuration_access_level(ConfigurationAccessLevel::Full);
    Fixture {
        editor,
        selector,
        center,
        mediums,
    }
}

fn count_changes(editor: &StorageSettingsEditor) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    editor.value_changed.connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    count
}

fn attachment(device_type: DeviceType, port: u32, device: u32, medium_id: Option<MediumId>) -> StorageAttachmentData {
    StorageAttachmentData {
        device_type,
        port,
        device,
        medium_id,
        passthrough: false,
        temp_eject: false,
        non_rotational: false,
        hot_pluggable: false,
    }
}

fn sample_snapshot() -> StorageSnapshot {
    let disk = Uuid::new_v4();
    StorageSnapshot {
        controllers: vec![
            StorageControllerData {
                name: "SATA".to_string(),
                bus: StorageBus::Sata,
                controller_type: ControllerType::IntelAhci,
                port_count: 4,
                use_host_io_cache: false,
            },
            StorageControllerData {
                name: "IDE".to_string(),
                bus: StorageBus::Ide,
                controller_type: ControllerType::Piix4,
                port_count: 2,
                use_host_io_cache: true,
            },
        ],
        attachments: vec![
            vec![
                StorageAttachmentData {
                    non_rotational: true,
                    hot_pluggable: true,
                    ..attachment(DeviceType::HardDisk, 2, 0, Some(disk))
                },
                StorageAttachmentData {
                    temp_eject: true,
                    ..attachment(DeviceType::Dvd, 0, 0, None)
                },
            ],
            vec![StorageAttachmentData {
                passthrough: true,
                ..attachment(DeviceType::Dvd, 1, 1, None)
            }],
        ],
    }
}

#[test]
fn test_load_save_round_trip() {
    let fx = fixture();
    let snapshot = sample_snapshot();
    fx.editor.load(&snapshot).unwrap();

    let mut expected = snapshot.clone();
    for attachments in &mut expected.attachments {
        attachments.sort_by_key(|att| (att.port, att.device));
    }
    assert_eq!(fx.editor.save(), expected);

    fx.editor.load(&expected).unwrap();
    assert_eq!(fx.editor.save(), expected);
}

#[test]
fn test_load_selects_first_controller() {
    let fx = fixture();
    fx.editor.load(&sample_snapshot()).unwrap();
    let details = fx.editor.details();
    assert_eq!(details.as_controller().map(|ctr| ctr.name.as_str()), Some("SATA"));
}

#[test]
fn test_load_rejects_invalid_snapshot() {
    let fx = fixture();
    fx.editor.load(&sample_snapshot()).unwrap();

    let mut snapshot = sample_snapshot();
    snapshot.controllers[1].controller_type = ControllerType::IntelAhci;
    let err = fx.editor.load(&snapshot).unwrap_err();
    assert!(matches!(err, Error::InvalidSnapshot { .. }));

    let mut snapshot = sample_snapshot();
    snapshot.attachments[0].push(attachment(DeviceType::Dvd, 2, 0, None));
    assert!(fx.editor.load(&snapshot).is_err());

    assert_eq!(fx.editor.save().controllers.len(), 2);
}

#[test]
fn test_load_rejects_slot_outside_bus() {
    let fx = fixture();
    fx.editor.load(&sample_snapshot()).unwrap();
    let before = fx.editor.save();

    let mut snapshot = sample_snapshot();
    snapshot.attachments[1] = vec![attachment(DeviceType::HardDisk, 7, 0, Some(Uuid::new_v4()))];
    let err = fx.editor.load(&snapshot).unwrap_err();
    assert!(matches!(err, Error::InvalidSnapshot { ref controller, .. } if controller == "IDE"));

    let mut snapshot = sample_snapshot();
    snapshot.attachments[0][1].device = 1;
    assert!(matches!(fx.editor.load(&snapshot), Err(Error::InvalidSnapshot { .. })));

    assert_eq!(fx.editor.save(), before);
}

#[test]
fn test_snapshot_from_json() {
    let fx = fixture();
    let json = r#"{
        "controllers": [
            { "name": "Floppy", "bus": "Floppy", "controller_type": "I82078", "port_count": 1 }
        ],
        "attachments": [
            [ { "device_type": "Floppy", "port": 0, "device": 1 } ]
        ]
    }"#;
    let snapshot: StorageSnapshot = serde_json::from_str(json).unwrap();
    fx.editor.load(&snapshot).unwrap();

    let saved = fx.editor.save();
    assert_eq!(saved.attachments[0][0].device, 1);
    assert_eq!(saved.attachments[0][0].medium_id, None);
}

#[test]
fn test_unique_controller_names() {
    let fx = fixture();
    fx.editor.set_chipset_type(ChipsetType::Ich9);
    fx.editor.model().add_controller("PIIX3", StorageBus::Ide, ControllerType::Piix3);
    fx.editor.model().add_controller("PIIX3 2", StorageBus::Ide, ControllerType::Piix3);
    assert_eq!(fx.editor.generate_unique_controller_name("PIIX3"), "PIIX3 3");

    fx.editor.add_controller_of_type(ControllerType::Usb);
    fx.editor.add_controller_of_type(ControllerType::Usb);
    let names: Vec<String> = fx.editor.save().controllers.into_iter().map(|ctr| ctr.name).collect();
    assert_eq!(names, ["PIIX3", "PIIX3 2", "USB", "USB 2"]);
}

#[test]
fn test_add_attachment_follows_selection() {
    let fx = fixture();
    let changes = count_changes(&fx.editor);
    fx.editor.add_controller_of_type(ControllerType::IntelAhci).unwrap();
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    fx.selector.answer(MediumSelection::Rejected);
    assert!(fx.editor.add_attachment(DeviceType::Dvd).is_none());

    fx.selector.answer(MediumSelection::LeftEmpty);
    assert!(fx.editor.add_attachment(DeviceType::HardDisk).is_none());
    assert!(fx.editor.add_attachment(DeviceType::Dvd).is_some());

    fx.selector.answer(MediumSelection::Accepted(None));
    assert!(fx.editor.add_attachment(DeviceType::HardDisk).is_none());

    let disk = Uuid::new_v4();
    fx.selector.answer(MediumSelection::Accepted(Some(disk)));
    assert!(fx.editor.add_attachment(DeviceType::HardDisk).is_some());
    assert!(fx.editor.add_attachment(DeviceType::Floppy).is_none());

    assert_eq!(changes.load(Ordering::SeqCst), 3);
    let saved = fx.editor.save();
    assert_eq!(saved.attachments[0].len(), 2);
    assert_eq!(saved.attachments[0][1].medium_id, Some(disk));
}

#[test]
fn test_remove_last_optical_drive_needs_confirmation() {
    let fx = fixture();
    fx.editor.add_controller_of_type(ControllerType::Piix4);
    fx.selector.answer(MediumSelection::LeftEmpty);
    let dvd = fx.editor.add_attachment(DeviceType::Dvd).unwrap();
    let index = fx.editor.model().index_of(dvd);
    fx.editor.set_current(&index);

    fx.center.keep_last_drive.store(true, Ordering::SeqCst);
    assert!(!fx.editor.remove_attachment());
    assert_eq!(fx.editor.device_count(DeviceType::Dvd), 1);

    fx.center.keep_last_drive.store(false, Ordering::SeqCst);
    assert!(fx.editor.remove_attachment());
    assert_eq!(fx.editor.device_count(DeviceType::Dvd), 0);
    assert_eq!(fx.center.asked.load(Ordering::SeqCst), 2);
    assert!(fx.editor.details().as_controller().is_some());
}

#[test]
fn test_remove_attachment_while_running() {
    let fx = fixture();
    fx.editor.add_controller_of_type(ControllerType::IntelAhci);
    fx.selector.answer(MediumSelection::Accepted(Some(Uuid::new_v4())));
    let disk = fx.editor.add_attachment(DeviceType::HardDisk).unwrap();
    fx.editor.set_current(&fx.editor.model().index_of(disk));

    fx.editor.set_configuration_access_level(ConfigurationAccessLevel::PartialRunning);
    assert!(!fx.editor.action_states().remove_attachment);
    assert!(!fx.editor.remove_attachment());

    fx.editor.set_configuration_access_level(ConfigurationAccessLevel::Full);
    assert!(fx.editor.set_hot_pluggable(true));
    fx.editor.set_configuration_access_level(ConfigurationAccessLevel::PartialRunning);
    assert!(fx.editor.action_states().remove_attachment);
    assert!(fx.editor.remove_attachment());
}

#[test]
fn test_medium_choice_on_current_attachment() {
    let fx = fixture();
    fx.editor.add_controller_of_type(ControllerType::Piix4);
    fx.selector.answer(MediumSelection::LeftEmpty);
    let dvd = fx.editor.add_attachment(DeviceType::Dvd).unwrap();
    fx.editor.set_current(&fx.editor.model().index_of(dvd));
    assert!(!fx.editor.unmount_device());

    let image = Uuid::new_v4();
    fx.mediums.insert(Medium {
        id: image,
        device_type: Some(DeviceType::Dvd),
        name: "tools.iso".to_string(),
        ..Medium::default()
    });
    fx.selector.answer(MediumSelection::Accepted(Some(image)));
    assert!(fx.editor.choose_existing_medium());

    let ItemDetails::Attachment(details) = fx.editor.details() else {
        panic!("attachment should be current");
    };
    assert_eq!(details.medium_id, Some(image));
    assert_eq!(details.display.name, "tools.iso");
    assert_eq!(details.display.format, "Image");

    let drive = Uuid::new_v4();
    assert!(fx.editor.choose_host_drive(drive));
    assert!(fx.editor.unmount_device());
    assert_eq!(fx.editor.details().as_attachment().unwrap().medium_id, None);

    *fx.selector.file.lock() = Some(image);
    assert!(fx.editor.choose_disk_file());
    assert_eq!(fx.editor.details().as_attachment().unwrap().medium_id, Some(image));
}

#[test]
fn test_medium_notifications() {
    let fx = fixture();
    fx.editor.add_controller_of_type(ControllerType::IntelAhci);
    let disk = Uuid::new_v4();
    fx.selector.answer(MediumSelection::Accepted(Some(disk)));
    let att = fx.editor.add_attachment(DeviceType::HardDisk).unwrap();
    fx.editor.set_current(&fx.editor.model().index_of(att));
    assert_eq!(fx.editor.details().as_attachment().unwrap().display.name, "Empty");

    let changes = count_changes(&fx.editor);
    fx.mediums.insert(Medium {
        id: disk,
        device_type: Some(DeviceType::HardDisk),
        name: "system.vdi".to_string(),
        disk_type: "Normal".to_string(),
        disk_format: "VDI".to_string(),
        ..Medium::default()
    });
    assert_eq!(changes.load(Ordering::SeqCst), 1);
    let details = fx.editor.details();
    let attachment = details.as_attachment().unwrap();
    assert_eq!(attachment.display.name, "system.vdi");
    assert_eq!(attachment.display.format, "Normal (VDI)");

    fx.mediums.remove(&disk);
    assert_eq!(changes.load(Ordering::SeqCst), 2);
    assert_eq!(fx.editor.details().as_attachment().unwrap().medium_id, None);

    fx.mediums.insert(Medium {
        id: Uuid::new_v4(),
        name: "unrelated.vdi".to_string(),
        ..Medium::default()
    });
    assert_eq!(changes.load(Ordering::SeqCst), 2);
}

#[test]
fn test_controller_type_change_runs_bus_change() {
    let fx = fixture();
    fx.editor.add_controller_of_type(ControllerType::IntelAhci);
    fx.selector.answer(MediumSelection::LeftEmpty);
    fx.editor.add_attachment(DeviceType::Dvd);
    let ctr = fx.editor.current_controller().unwrap();
    fx.editor.set_current(&fx.editor.model().index_of(ctr));

    assert!(fx.editor.set_controller_type(StorageBus::Scsi, ControllerType::BusLogic));
    let details = fx.editor.details();
    let controller = details.as_controller().unwrap();
    assert_eq!(controller.bus, StorageBus::Scsi);
    assert_eq!(controller.controller_type, ControllerType::BusLogic);
    assert!(!controller.port_count_visible);

    assert!(fx.editor.set_controller_type(StorageBus::PCIe, ControllerType::Nvme));
    assert_eq!(fx.editor.device_count(DeviceType::Dvd), 0);
    assert!(!fx.editor.set_controller_type(StorageBus::PCIe, ControllerType::Piix4));
}

#[test]
fn test_slot_edit_keeps_selection() {
    let fx = fixture();
    fx.editor.add_controller_of_type(ControllerType::Piix4);
    fx.selector.answer(MediumSelection::LeftEmpty);
    let first = fx.editor.add_attachment(DeviceType::Dvd).unwrap();
    fx.editor.add_attachment(DeviceType::Dvd).unwrap();
    fx.editor.set_current(&fx.editor.model().index_of(first));

    let target = StorageSlot::new(StorageBus::Ide, 1, 1);
    assert!(fx.editor.set_attachment_slot(target));
    assert_eq!(fx.editor.current_id(), Some(first));
    assert_eq!(fx.editor.current().row(), 1);
    assert_eq!(fx.editor.details().as_attachment().unwrap().slot, target);
    assert!(!fx.editor.set_attachment_slot(StorageSlot::new(StorageBus::Ide, 0, 1)));
}

#[test]
fn test_passthrough_and_temp_eject_depend_on_host_drive() {
    let fx = fixture();
    fx.editor.add_controller_of_type(ControllerType::Piix4);
    fx.selector.answer(MediumSelection::LeftEmpty);
    let dvd = fx.editor.add_attachment(DeviceType::Dvd).unwrap();
    fx.editor.set_current(&fx.editor.model().index_of(dvd));

    assert!(!fx.editor.set_passthrough(true));
    assert!(fx.editor.set_temp_eject(true));

    let drive = Uuid::new_v4();
    fx.mediums.insert(Medium {
        id: drive,
        device_type: Some(DeviceType::Dvd),
        name: "Host Drive 'sr0'".to_string(),
        host_drive: true,
        ..Medium::default()
    });
    assert!(fx.editor.choose_host_drive(drive));
    assert!(fx.editor.set_passthrough(true));
    assert!(!fx.editor.set_temp_eject(false));

    let details = fx.editor.details();
    let attachment = details.as_attachment().unwrap();
    assert!(attachment.host_drive);
    assert!(attachment.passthrough);
    assert!(!attachment.temp_eject);
}

#[test]
fn test_drag_and_drop() {
    let fx = fixture();
    let ide = fx.editor.add_controller_of_type(ControllerType::Piix4).unwrap();
    fx.selector.answer(MediumSelection::LeftEmpty);
    let dvd = fx.editor.add_attachment(DeviceType::Dvd).unwrap();
    let floppy = fx.editor.add_controller_of_type(ControllerType::I82078).unwrap();
    let sata = fx.editor.add_controller_of_type(ControllerType::IntelAhci).unwrap();

    assert!(!fx.editor.can_drop_attachment(ide, dvd, ide));
    assert!(!fx.editor.can_drop_attachment(ide, dvd, floppy));
    assert!(!fx.editor.can_drop_attachment(sata, dvd, ide));
    assert!(!fx.editor.can_drop_attachment(ide, dvd, dvd));
    assert!(fx.editor.can_drop_attachment(ide, dvd, sata));

    assert!(fx.editor.drop_attachment(ide, dvd, sata));
    assert!(fx.editor.model().attachments(ide).is_empty());
    assert_eq!(fx.editor.model().attachments(sata).len(), 1);
    assert!(!fx.editor.drop_attachment(ide, dvd, sata));
}

#[test]
fn test_action_states_follow_current_item() {
    let fx = fixture();
    let states = fx.editor.action_states();
    assert!(states.add_controller);
    assert!(!states.add_attachment);
    assert!(!states.remove_controller);

    let emitted = Arc::new(AtomicUsize::new(0));
    let counter = emitted.clone();
    fx.editor.actions_changed.connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    fx.editor.add_controller_of_type(ControllerType::Piix4);
    assert!(emitted.load(Ordering::SeqCst) >= 1);

    let states = fx.editor.action_states();
    assert!(states.add_attachment);
    assert!(states.remove_controller);
    assert!(!states.add_controller_types[&ControllerType::Piix3]);

    fx.editor.set_configuration_access_level(ConfigurationAccessLevel::PartialSaved);
    let states = fx.editor.action_states();
    assert!(!states.add_controller);
    assert!(!states.remove_controller);
    assert!(!fx.editor.pane_availability().controller_fields);
    assert!(fx.editor.pane_availability().temp_eject);
}

#[test]
fn test_addable_controller_types() {
    let mut profile = PlatformProfile::x86();
    if let Some(usb) = profile.buses.iter_mut().find(|entry| entry.bus == StorageBus::Usb) {
        usb.supported = false;
    }
    let model = Arc::new(StorageModel::new(
        Arc::new(profile),
        Arc::new(MediumCache::new()),
        Arc::new(lattice_storage::storage::AcceptAll),
    ));
    let editor = StorageSettingsEditor::new(model, ScriptedSelector::new());

    let types = editor.addable_controller_types();
    assert!(types.contains(&ControllerType::IntelAhci));
    assert!(!types.contains(&ControllerType::Usb));
}
