//! Capability queries answered by the virtualization platform.

use super::types::{ChipsetType, ControllerType, DeviceType, StorageBus, StorageSlot};

/// Storage capabilities of the platform a machine runs on.
///
/// The model never hard-codes limits; every ceiling it enforces comes from
/// here. [`crate::config::PlatformProfile`] is the table-driven
/// implementation.
pub trait PlatformProperties: Send + Sync {
    /// Buses the platform can host.
    fn supported_buses(&self) -> Vec<StorageBus>;

    /// Controller types the platform can emulate.
    fn supported_controller_types(&self) -> Vec<ControllerType>;

    /// Maximum number of ports a controller on `bus` can have.
    fn max_port_count(&self, bus: StorageBus) -> u32;

    /// Maximum number of devices per port on `bus`.
    fn max_devices_per_port(&self, bus: StorageBus) -> u32;

    /// Maximum number of controllers on `bus` for a chipset.
    fn max_instances(&self, chipset: ChipsetType, bus: StorageBus) -> u32;

    /// Controller types that can sit on `bus`, preferred type first.
    fn controller_types_for_bus(&self, bus: StorageBus) -> Vec<ControllerType>;

    /// The bus a controller type sits on.
    fn bus_for_controller_type(&self, controller_type: ControllerType) -> Option<StorageBus>;

    /// Whether host IO caching is on by default for a controller type.
    fn default_io_cache(&self, controller_type: ControllerType) -> bool;

    /// Device types that may be attached to `bus`.
    fn device_types_for_bus(&self, bus: StorageBus) -> Vec<DeviceType>;

    /// Number of attachment slots a controller on `bus` offers.
    fn slot_capacity(&self, bus: StorageBus) -> u32 {
        self.max_port_count(bus)
            .saturating_mul(self.max_devices_per_port(bus))
    }

    /// Every slot on `bus`, in slot order.
    fn all_slots(&self, bus: StorageBus) -> Vec<StorageSlot> {
        let devices = self.max_devices_per_port(bus);
        (0..self.max_port_count(bus))
            .flat_map(|port| (0..devices).map(move |device| StorageSlot::new(bus, port, device)))
            .collect()
    }
}
