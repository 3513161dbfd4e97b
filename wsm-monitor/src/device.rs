//! Registered-device descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ssc_client::{DeviceType, DEFAULT_PORT};
use wsm_discovery::DiscoveredDevice;

/// A device registered for monitoring, keyed by IP address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Display name as reported by the device (or set by the user)
    pub name: String,
    /// Unique key within the registry
    pub ip_address: String,
    /// SSC control port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Receiver or charger; decides which composite queries apply
    pub device_type: DeviceType,
    /// Disabled devices are skipped by the polling engine
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Last time this device was seen answering
    pub last_seen: DateTime<Utc>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_enabled() -> bool {
    true
}

impl DeviceInfo {
    /// Build a descriptor for a device at `ip_address`
    pub fn new(name: impl Into<String>, ip_address: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            name: name.into(),
            ip_address: ip_address.into(),
            port: DEFAULT_PORT,
            device_type,
            enabled: true,
            last_seen: Utc::now(),
        }
    }

    /// Same descriptor, talking to a non-standard port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl From<DiscoveredDevice> for DeviceInfo {
    fn from(device: DiscoveredDevice) -> Self {
        Self {
            name: device.name,
            ip_address: device.ip_address,
            port: device.port,
            device_type: device.device_type,
            enabled: true,
            last_seen: device.last_seen,
        }
    }
}
