//! Wireless-microphone status monitoring
//!
//! Builds on [`ssc_client`] to keep a live, merged view of every registered
//! receiver and charger: the polling engine queries chargers for bay
//! occupancy and receivers for per-channel battery/signal readings, then
//! reconciles both into one status per microphone. State degrades gracefully
//! when devices stop answering — last known values are retained until a
//! microphone is corroborated as gone by both sources.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wsm_monitor::{DeviceInfo, DeviceType, MemoryRegistry, StatusMonitor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(MemoryRegistry::new());
//!     registry.register(DeviceInfo::new("EW-DX EM 2", "192.168.0.50", DeviceType::Receiver));
//!     registry.register(DeviceInfo::new("CHG 70N", "192.168.0.60", DeviceType::Charger));
//!
//!     let monitor = StatusMonitor::new(registry);
//!     let mut updates = monitor.subscribe();
//!     monitor.start_monitoring().unwrap();
//!
//!     while updates.changed().await.is_ok() {
//!         let snapshot = updates.borrow().clone();
//!         for mic in &snapshot.mic_statuses {
//!             println!("{}: {} ({}%)", mic.name, mic.state, mic.battery_percentage);
//!         }
//!     }
//! }
//! ```

mod client;
mod device;
mod error;
pub mod logging;
mod monitor;
mod registry;
mod status;

pub use client::DeviceClient;
pub use device::DeviceInfo;
pub use error::{MonitorError, Result};
pub use monitor::{MonitorConfig, StatusMonitor, StatusSnapshot};
pub use registry::{DeviceRegistry, MemoryRegistry};
pub use status::{ChargingBayStatus, MicState, MicStatus};

pub use ssc_client::DeviceType;
