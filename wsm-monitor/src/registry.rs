//! Device registry
//!
//! The polling engine only needs a read-only device list provider; the
//! trait keeps the storage backend out of the core, and the in-memory
//! implementation covers tests and embedders with their own persistence.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use ssc_client::DeviceType;

use crate::device::DeviceInfo;

/// Read-only provider of registered devices
///
/// The polling engine is constructed against this trait; process-wide
/// lifetime is the composition root's concern, never internal static state.
pub trait DeviceRegistry: Send + Sync {
    /// Enabled devices, sorted by name
    fn registered_devices(&self) -> Vec<DeviceInfo>;

    /// Enabled devices of one class, sorted by name
    fn devices_by_type(&self, device_type: DeviceType) -> Vec<DeviceInfo> {
        self.registered_devices()
            .into_iter()
            .filter(|d| d.device_type == device_type)
            .collect()
    }
}

/// In-memory registry keyed by IP address
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    devices: RwLock<HashMap<String, DeviceInfo>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, replacing any previous entry at the same address
    pub fn register(&self, device: DeviceInfo) {
        self.devices
            .write()
            .insert(device.ip_address.clone(), device);
    }

    /// Remove a device by address
    pub fn unregister(&self, ip_address: &str) {
        self.devices.write().remove(ip_address);
    }

    /// Disable a device without forgetting it
    ///
    /// `last_seen` stays untouched; the device simply stops appearing in
    /// the enabled lists.
    pub fn mark_unavailable(&self, ip_address: &str) {
        if let Some(device) = self.devices.write().get_mut(ip_address) {
            device.enabled = false;
            tracing::warn!(name = %device.name, %ip_address, "device marked unavailable");
        }
    }

    /// Re-enable a previously disabled device
    pub fn mark_available(&self, ip_address: &str) {
        if let Some(device) = self.devices.write().get_mut(ip_address) {
            device.enabled = true;
            device.last_seen = Utc::now();
            tracing::info!(name = %device.name, %ip_address, "device available again");
        }
    }

    /// Move a device to a new address (DHCP renumbering)
    pub fn update_device_ip(&self, old_ip: &str, new_ip: &str) {
        let mut devices = self.devices.write();
        if let Some(mut device) = devices.remove(old_ip) {
            tracing::info!(name = %device.name, %old_ip, %new_ip, "device address updated");
            device.ip_address = new_ip.to_string();
            device.last_seen = Utc::now();
            devices.insert(new_ip.to_string(), device);
        }
    }

    /// Look up a device by address, enabled or not
    pub fn get(&self, ip_address: &str) -> Option<DeviceInfo> {
        self.devices.read().get(ip_address).cloned()
    }
}

impl DeviceRegistry for MemoryRegistry {
    fn registered_devices(&self) -> Vec<DeviceInfo> {
        let mut devices: Vec<DeviceInfo> = self
            .devices
            .read()
            .values()
            .filter(|d| d.enabled)
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }
}

impl DeviceRegistry for Arc<MemoryRegistry> {
    fn registered_devices(&self) -> Vec<DeviceInfo> {
        self.as_ref().registered_devices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_devices() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry.register(DeviceInfo::new(
            "Rack B",
            "192.168.0.51",
            DeviceType::Receiver,
        ));
        registry.register(DeviceInfo::new(
            "Rack A",
            "192.168.0.50",
            DeviceType::Receiver,
        ));
        registry.register(DeviceInfo::new(
            "CHG 70N",
            "192.168.0.60",
            DeviceType::Charger,
        ));
        registry
    }

    #[test]
    fn test_registered_devices_sorted_by_name() {
        let registry = registry_with_devices();
        let names: Vec<String> = registry
            .registered_devices()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["CHG 70N", "Rack A", "Rack B"]);
    }

    #[test]
    fn test_devices_by_type() {
        let registry = registry_with_devices();
        assert_eq!(registry.devices_by_type(DeviceType::Receiver).len(), 2);
        assert_eq!(registry.devices_by_type(DeviceType::Charger).len(), 1);
    }

    #[test]
    fn test_disabled_devices_are_hidden() {
        let registry = registry_with_devices();
        registry.mark_unavailable("192.168.0.50");
        assert_eq!(registry.registered_devices().len(), 2);
        // Still known, just disabled.
        assert!(registry.get("192.168.0.50").is_some());

        registry.mark_available("192.168.0.50");
        assert_eq!(registry.registered_devices().len(), 3);
    }

    #[test]
    fn test_update_device_ip_rekeys_entry() {
        let registry = registry_with_devices();
        registry.update_device_ip("192.168.0.50", "192.168.0.99");
        assert!(registry.get("192.168.0.50").is_none());
        let moved = registry.get("192.168.0.99").unwrap();
        assert_eq!(moved.name, "Rack A");
    }

    #[test]
    fn test_register_replaces_same_address() {
        let registry = registry_with_devices();
        registry.register(DeviceInfo::new(
            "Rack A renamed",
            "192.168.0.50",
            DeviceType::Receiver,
        ));
        assert_eq!(registry.registered_devices().len(), 3);
        assert_eq!(registry.get("192.168.0.50").unwrap().name, "Rack A renamed");
    }
}
