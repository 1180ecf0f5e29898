//! Value types describing storage buses, controllers, devices and slots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every storage bus, in slot-ordering order.
pub const ALL_BUSES: [StorageBus; 8] = [
    StorageBus::Ide,
    StorageBus::Sata,
    StorageBus::Scsi,
    StorageBus::Floppy,
    StorageBus::Sas,
    StorageBus::Usb,
    StorageBus::PCIe,
    StorageBus::VirtioScsi,
];

/// A storage bus a controller sits on.
///
/// The declaration order defines slot ordering, so it must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StorageBus {
    /// Parallel ATA.
    #[serde(rename = "IDE")]
    Ide,
    /// Serial ATA.
    #[serde(rename = "SATA")]
    Sata,
    /// Parallel SCSI.
    #[serde(rename = "SCSI")]
    Scsi,
    /// Floppy disk controller.
    Floppy,
    /// Serial attached SCSI.
    #[serde(rename = "SAS")]
    Sas,
    /// USB mass storage.
    #[serde(rename = "USB")]
    Usb,
    /// PCI Express (NVMe). Hard disks only.
    PCIe,
    /// VirtIO SCSI.
    #[serde(rename = "VirtioSCSI")]
    VirtioScsi,
}

impl StorageBus {
    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ide => "IDE",
            Self::Sata => "SATA",
            Self::Scsi => "SCSI",
            Self::Floppy => "Floppy",
            Self::Sas => "SAS",
            Self::Usb => "USB",
            Self::PCIe => "PCIe",
            Self::VirtioScsi => "virtio-scsi",
        }
    }
}

impl fmt::Display for StorageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Controller chip emulated on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControllerType {
    /// Intel PIIX3 IDE.
    #[serde(rename = "PIIX3")]
    Piix3,
    /// Intel PIIX4 IDE.
    #[serde(rename = "PIIX4")]
    Piix4,
    /// Intel ICH6 IDE.
    #[serde(rename = "ICH6")]
    Ich6,
    /// Intel AHCI SATA.
    IntelAhci,
    /// LSI Logic SCSI.
    LsiLogic,
    /// BusLogic SCSI.
    BusLogic,
    /// Intel 82078 floppy.
    I82078,
    /// LSI Logic SAS.
    LsiLogicSas,
    /// USB mass storage.
    #[serde(rename = "USB")]
    Usb,
    /// NVMe.
    #[serde(rename = "NVMe")]
    Nvme,
    /// VirtIO SCSI.
    #[serde(rename = "VirtioSCSI")]
    VirtioScsi,
}

impl ControllerType {
    /// Every controller type, in menu order.
    pub const ALL: [ControllerType; 11] = [
        Self::Piix3,
        Self::Piix4,
        Self::Ich6,
        Self::IntelAhci,
        Self::LsiLogic,
        Self::BusLogic,
        Self::I82078,
        Self::LsiLogicSas,
        Self::Usb,
        Self::Nvme,
        Self::VirtioScsi,
    ];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Piix3 => "PIIX3",
            Self::Piix4 => "PIIX4",
            Self::Ich6 => "ICH6",
            Self::IntelAhci => "AHCI",
            Self::LsiLogic => "Lsilogic",
            Self::BusLogic => "BusLogic",
            Self::I82078 => "I82078",
            Self::LsiLogicSas => "LsiLogic SAS",
            Self::Usb => "USB",
            Self::Nvme => "NVMe",
            Self::VirtioScsi => "VirtIO SCSI",
        }
    }

    /// Template used when generating a name for a new controller of this type.
    pub fn name_template(self) -> &'static str {
        match self {
            Self::Piix3 => "PIIX3",
            Self::Piix4 => "PIIX4",
            Self::Ich6 => "ICH6",
            Self::IntelAhci => "AHCI",
            Self::LsiLogic => "LsiLogic",
            Self::BusLogic => "BusLogic",
            Self::I82078 => "Floppy",
            Self::LsiLogicSas => "LsiLogic SAS",
            Self::Usb => "USB",
            Self::Nvme => "NVMe",
            Self::VirtioScsi => "VirtIO",
        }
    }
}

impl fmt::Display for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of device an attachment exposes to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceType {
    /// Hard disk.
    HardDisk,
    /// Optical drive.
    #[serde(rename = "DVD")]
    Dvd,
    /// Floppy drive.
    Floppy,
}

impl DeviceType {
    /// Whether an attachment of this type may be created without a medium.
    pub fn allows_empty(self) -> bool {
        matches!(self, Self::Dvd | Self::Floppy)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HardDisk => "Hard Disk",
            Self::Dvd => "Optical Drive",
            Self::Floppy => "Floppy Device",
        })
    }
}

/// Motherboard chipset, which bounds controller instance counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ChipsetType {
    /// Intel PIIX3.
    #[default]
    #[serde(rename = "PIIX3")]
    Piix3,
    /// Intel ICH9.
    #[serde(rename = "ICH9")]
    Ich9,
}

/// How much of the machine configuration may be edited right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConfigurationAccessLevel {
    /// No access.
    #[default]
    Null,
    /// Machine is powered off and not saved; everything is editable.
    Full,
    /// Machine is powered off but some settings are locked.
    PartialPoweredOff,
    /// Machine is in saved state.
    PartialSaved,
    /// Machine is running.
    PartialRunning,
}

impl ConfigurationAccessLevel {
    /// Whether the level describes an existing machine state.
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::Null)
    }
}

/// A position on a controller: bus, port and device.
///
/// Ordered lexicographically by `(bus, port, device)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageSlot {
    /// Bus of the owning controller.
    pub bus: StorageBus,
    /// Port number.
    pub port: u32,
    /// Device number on the port.
    pub device: u32,
}

impl StorageSlot {
    /// Create a slot.
    pub const fn new(bus: StorageBus, port: u32, device: u32) -> Self {
        Self { bus, port, device }
    }
}

impl fmt::Display for StorageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bus {
            StorageBus::Ide => {
                let channel = if self.port == 0 { "Primary" } else { "Secondary" };
                let role = if self.device == 0 { "Device 0" } else { "Device 1" };
                write!(f, "IDE {channel} {role}")
            }
            StorageBus::Floppy => write!(f, "Floppy Device {}", self.device),
            StorageBus::PCIe => write!(f, "NVMe Port {}", self.port),
            bus => write!(f, "{} Port {}", bus.name(), self.port),
        }
    }
}

/// Error returned when a slot description cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized storage slot: {0:?}")]
pub struct ParseSlotError(pub String);

impl FromStr for StorageSlot {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSlotError(s.to_string());
        let words: Vec<&str> = s.split_whitespace().collect();
        let number = |w: &str| w.parse::<u32>().map_err(|_| err());

        match words.as_slice() {
            ["IDE", channel, "Device", device] => {
                let port = match *channel {
                    "Primary" => 0,
                    "Secondary" => 1,
                    _ => return Err(err()),
                };
                Ok(Self::new(StorageBus::Ide, port, number(device)?))
            }
            ["Floppy", "Device", device] => Ok(Self::new(StorageBus::Floppy, 0, number(device)?)),
            [bus, "Port", port] => {
                let bus = match *bus {
                    "SATA" => StorageBus::Sata,
                    "SCSI" => StorageBus::Scsi,
                    "SAS" => StorageBus::Sas,
                    "USB" => StorageBus::Usb,
                    "NVMe" => StorageBus::PCIe,
                    "virtio-scsi" => StorageBus::VirtioScsi,
                    _ => return Err(err()),
                };
                Ok(Self::new(bus, number(port)?, 0))
            }
            _ => Err(err()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_ordering() {
        let a = StorageSlot::new(StorageBus::Ide, 0, 1);
        let b = StorageSlot::new(StorageBus::Ide, 1, 0);
        let c = StorageSlot::new(StorageBus::Sata, 0, 0);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a, StorageSlot::new(StorageBus::Ide, 0, 1));
    }

    #[test]
    fn test_slot_text() {
        assert_eq!(
            StorageSlot::new(StorageBus::Ide, 1, 0).to_string(),
            "IDE Secondary Device 0"
        );
        assert_eq!(StorageSlot::new(StorageBus::Sata, 3, 0).to_string(), "SATA Port 3");
        assert_eq!(StorageSlot::new(StorageBus::Floppy, 0, 1).to_string(), "Floppy Device 1");
        assert_eq!(StorageSlot::new(StorageBus::PCIe, 2, 0).to_string(), "NVMe Port 2");
    }

    #[test]
    fn test_slot_parse() {
        let slots = [
            StorageSlot::new(StorageBus::Ide, 0, 1),
            StorageSlot::new(StorageBus::Sata, 29, 0),
            StorageSlot::new(StorageBus::Floppy, 0, 1),
            StorageSlot::new(StorageBus::VirtioScsi, 7, 0),
            StorageSlot::new(StorageBus::PCIe, 0, 0),
        ];
        for slot in slots {
            assert_eq!(slot.to_string().parse::<StorageSlot>(), Ok(slot));
        }
        assert!("Tape Port 1".parse::<StorageSlot>().is_err());
        assert!("SATA Port x".parse::<StorageSlot>().is_err());
    }

    #[test]
    fn test_device_allows_empty() {
        assert!(DeviceType::Dvd.allows_empty());
        assert!(DeviceType::Floppy.allows_empty());
        assert!(!DeviceType::HardDisk.allows_empty());
    }

    #[test]
    fn test_bus_serde_names() {
        let json = serde_json::to_string(&StorageBus::VirtioScsi).unwrap();
        assert_eq!(json, "\"VirtioSCSI\"");
        let bus: StorageBus = serde_json::from_str("\"SATA\"").unwrap();
        assert_eq!(bus, StorageBus::Sata);
    }
}
