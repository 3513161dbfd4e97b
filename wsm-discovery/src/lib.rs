//! Network discovery for SSC wireless-microphone devices
//!
//! Devices are discovered by probing every host of an IPv4 range with an
//! SSC name request and classifying whatever answers. There is no multicast
//! announcement in this protocol family, so discovery is plain fan-out over
//! the address range with short per-candidate timeouts.
//!
//! # Quick Start
//!
//! ```no_run
//! use wsm_discovery::NetworkScanner;
//!
//! # async fn example() -> wsm_discovery::Result<()> {
//! let scanner = NetworkScanner::new();
//! let devices = scanner.scan("192.168.0.x").await?;
//! for device in devices {
//!     println!("found {} at {}", device.name, device.ip_address);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A scan can be cancelled from another task; a cancelled scan yields an
//! empty result set rather than presenting half-finished data.

mod error;
mod scanner;

pub use error::{Result, ScanError};
pub use scanner::{NetworkScanner, CANDIDATE_TIMEOUT, SETTLE_DELAY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ssc_client::DeviceType;

/// A device that answered a scan probe
///
/// Carries the scanner's single-tier best-guess classification; the full
/// three-tier detector may later disagree, and both results are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Display name reported by the device
    pub name: String,
    /// Address the device answered on
    pub ip_address: String,
    /// SSC control port the probe used
    pub port: u16,
    /// Best-guess classification from the name heuristic
    pub device_type: DeviceType,
    /// When the probe response arrived
    pub last_seen: DateTime<Utc>,
}
