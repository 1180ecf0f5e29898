//! Platform profiles and view metrics.
//!
//! A [`PlatformProfile`] is a table-driven [`PlatformProperties`]
//! implementation. Hosts normally use [`PlatformProfile::x86`]; profiles for
//! other platforms can be loaded from TOML or JSON files:
//!
//! ```toml
//! name = "tiny"
//!
//! [[buses]]
//! bus = "IDE"
//! max_ports = 2
//! max_devices_per_port = 2
//! device_types = ["HardDisk", "DVD"]
//! max_instances = [{ chipset = "PIIX3", count = 1 }]
//!
//! [[controllers]]
//! controller_type = "PIIX4"
//! bus = "IDE"
//! default_io_cache = true
//! ```

use std::path::Path;

use lattice_storage_core::logging::targets;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::{ChipsetType, ControllerType, DeviceType, PlatformProperties, StorageBus};

fn default_true() -> bool {
    true
}

/// Per-chipset controller instance limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipsetLimit {
    /// Chipset the limit applies to.
    pub chipset: ChipsetType,
    /// Maximum controllers on the bus.
    pub count: u32,
}

/// Capabilities of one bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusProfile {
    /// The bus described.
    pub bus: StorageBus,
    /// Whether new controllers may use this bus.
    #[serde(default = "default_true")]
    pub supported: bool,
    /// Maximum ports per controller.
    pub max_ports: u32,
    /// Maximum devices per port.
    pub max_devices_per_port: u32,
    /// Attachable device types.
    pub device_types: Vec<DeviceType>,
    /// Controller instance limits. Chipsets not listed allow none.
    #[serde(default)]
    pub max_instances: Vec<ChipsetLimit>,
}

/// Capabilities of one controller type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerProfile {
    /// The controller type described.
    pub controller_type: ControllerType,
    /// The bus it sits on.
    pub bus: StorageBus,
    /// Whether new controllers may use this type.
    #[serde(default = "default_true")]
    pub supported: bool,
    /// Default host IO cache setting.
    #[serde(default)]
    pub default_io_cache: bool,
}

/// A complete, table-driven platform description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    /// Human readable profile name.
    pub name: String,
    /// Bus table, in preference order.
    pub buses: Vec<BusProfile>,
    /// Controller table. Types sharing a bus are listed preferred first.
    pub controllers: Vec<ControllerProfile>,
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self::x86()
    }
}

impl PlatformProfile {
    /// The built-in x86 platform.
    pub fn x86() -> Self {
        use ChipsetType::{Ich9, Piix3};
        use DeviceType::{Dvd, Floppy, HardDisk};

        let bus = |bus, max_ports, max_devices_per_port, device_types: &[DeviceType], piix3, ich9| {
            BusProfile {
                bus,
                supported: true,
                max_ports,
                max_devices_per_port,
                device_types: device_types.to_vec(),
                max_instances: vec![
                    ChipsetLimit { chipset: Piix3, count: piix3 },
                    ChipsetLimit { chipset: Ich9, count: ich9 },
                ],
            }
        };
        let controller = |controller_type, bus, default_io_cache| ControllerProfile {
            controller_type,
            bus,
            supported: true,
            default_io_cache,
        };

        Self {
            name: "x86".to_string(),
            buses: vec![
                bus(StorageBus::Ide, 2, 2, &[HardDisk, Dvd], 1, 1),
                bus(StorageBus::Sata, 30, 1, &[HardDisk, Dvd], 1, 8),
                bus(StorageBus::Scsi, 16, 1, &[HardDisk, Dvd], 1, 8),
                bus(StorageBus::Floppy, 1, 2, &[Floppy], 1, 1),
                bus(StorageBus::Sas, 255, 1, &[HardDisk, Dvd], 1, 8),
                bus(StorageBus::Usb, 8, 1, &[HardDisk, Dvd], 8, 8),
                bus(StorageBus::PCIe, 255, 1, &[HardDisk], 1, 8),
                bus(StorageBus::VirtioScsi, 256, 1, &[HardDisk, Dvd], 1, 8),
            ],
            controllers: vec![
                controller(ControllerType::Piix4, StorageBus::Ide, true),
                controller(ControllerType::Piix3, StorageBus::Ide, true),
                controller(ControllerType::Ich6, StorageBus::Ide, true),
                controller(ControllerType::IntelAhci, StorageBus::Sata, false),
                controller(ControllerType::LsiLogic, StorageBus::Scsi, false),
                controller(ControllerType::BusLogic, StorageBus::Scsi, false),
                controller(ControllerType::I82078, StorageBus::Floppy, true),
                controller(ControllerType::LsiLogicSas, StorageBus::Sas, false),
                controller(ControllerType::Usb, StorageBus::Usb, false),
                controller(ControllerType::Nvme, StorageBus::PCIe, false),
                controller(ControllerType::VirtioScsi, StorageBus::VirtioScsi, false),
            ],
        }
    }

    /// Parses a profile from TOML text.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Parses a profile from JSON text.
    pub fn from_json_str(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Loads and validates a profile from a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let profile = Self::from_toml_str(&content).map_err(|source| Error::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        profile.validate()?;
        tracing::debug!(target: targets::CONFIG, name = %profile.name, path = %path.display(), "loaded platform profile");
        Ok(profile)
    }

    /// Loads and validates a profile from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let profile = Self::from_json_str(&content).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        profile.validate()?;
        tracing::debug!(target: targets::CONFIG, name = %profile.name, path = %path.display(), "loaded platform profile");
        Ok(profile)
    }

    /// Serializes the profile as pretty TOML.
    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Checks the tables are self-consistent.
    ///
    /// Every bus appears once and offers at least one slot and one
    /// controller type; every controller type appears once, on a listed bus.
    pub fn validate(&self) -> Result<()> {
        for (i, entry) in self.buses.iter().enumerate() {
            if self.buses[..i].iter().any(|other| other.bus == entry.bus) {
                return Err(Error::InvalidProfile(format!("bus {} listed twice", entry.bus)));
            }
            if entry.max_ports == 0 || entry.max_devices_per_port == 0 {
                return Err(Error::InvalidProfile(format!("bus {} has no slots", entry.bus)));
            }
            if !self.controllers.iter().any(|c| c.bus == entry.bus) {
                return Err(Error::InvalidProfile(format!(
                    "bus {} has no controller types",
                    entry.bus
                )));
            }
        }
        for (i, entry) in self.controllers.iter().enumerate() {
            if self.controllers[..i]
                .iter()
                .any(|other| other.controller_type == entry.controller_type)
            {
                return Err(Error::InvalidProfile(format!(
                    "controller type {} listed twice",
                    entry.controller_type
                )));
            }
            if self.bus(entry.bus).is_none() {
                return Err(Error::InvalidProfile(format!(
                    "controller type {} uses unlisted bus {}",
                    entry.controller_type, entry.bus
                )));
            }
        }
        Ok(())
    }

    fn bus(&self, bus: StorageBus) -> Option<&BusProfile> {
        self.buses.iter().find(|entry| entry.bus == bus)
    }

    fn controller(&self, controller_type: ControllerType) -> Option<&ControllerProfile> {
        self.controllers
            .iter()
            .find(|entry| entry.controller_type == controller_type)
    }
}

impl PlatformProperties for PlatformProfile {
    fn supported_buses(&self) -> Vec<StorageBus> {
        self.buses
            .iter()
            .filter(|entry| entry.supported)
            .map(|entry| entry.bus)
            .collect()
    }

    fn supported_controller_types(&self) -> Vec<ControllerType> {
        self.controllers
            .iter()
            .filter(|entry| entry.supported)
            .map(|entry| entry.controller_type)
            .collect()
    }

    fn max_port_count(&self, bus: StorageBus) -> u32 {
        self.bus(bus).map_or(0, |entry| entry.max_ports)
    }

    fn max_devices_per_port(&self, bus: StorageBus) -> u32 {
        self.bus(bus).map_or(0, |entry| entry.max_devices_per_port)
    }

    fn max_instances(&self, chipset: ChipsetType, bus: StorageBus) -> u32 {
        self.bus(bus)
            .and_then(|entry| entry.max_instances.iter().find(|limit| limit.chipset == chipset))
            .map_or(0, |limit| limit.count)
    }

    fn controller_types_for_bus(&self, bus: StorageBus) -> Vec<ControllerType> {
        self.controllers
            .iter()
            .filter(|entry| entry.bus == bus)
            .map(|entry| entry.controller_type)
            .collect()
    }

    fn bus_for_controller_type(&self, controller_type: ControllerType) -> Option<StorageBus> {
        self.controller(controller_type).map(|entry| entry.bus)
    }

    fn default_io_cache(&self, controller_type: ControllerType) -> bool {
        self.controller(controller_type)
            .is_some_and(|entry| entry.default_io_cache)
    }

    fn device_types_for_bus(&self, bus: StorageBus) -> Vec<DeviceType> {
        self.bus(bus)
            .map(|entry| entry.device_types.clone())
            .unwrap_or_default()
    }
}

/// Layout metrics reported through the layout roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewMetrics {
    /// Outer margin around a row, in pixels.
    pub margin: u32,
    /// Spacing between row elements, in pixels.
    pub spacing: u32,
    /// Icon edge length, in pixels.
    pub icon_size: u32,
    /// Line height used for size hints, in pixels.
    pub line_height: u32,
}

impl Default for ViewMetrics {
    fn default() -> Self {
        Self {
            margin: 4,
            spacing: 4,
            icon_size: 16,
            line_height: 16,
        }
    }
}
