//! Core scanning logic
//!
//! The scanner expands a base address pattern into the full host range and
//! races a short per-candidate timeout against a name probe on every
//! address. Results are collected unordered once every candidate has
//! answered, timed out, or been cancelled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;

use ssc_client::{request, DeviceType, SscClient, SscResponse, DEFAULT_PORT};

use crate::error::{Result, ScanError};
use crate::DiscoveredDevice;

/// Per-candidate probe budget, independent of the protocol client's own
/// response timeout
pub const CANDIDATE_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause between connect and probe, giving slow transports a chance to
/// reach ready state
pub const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Scans an address range for SSC devices
///
/// Cheap to clone; `cancel()` may be called from another task while a scan
/// is in flight.
#[derive(Debug, Clone)]
pub struct NetworkScanner {
    port: u16,
    cancelled: Arc<AtomicBool>,
    active_clients: Arc<Mutex<HashMap<String, SscClient>>>,
}

impl NetworkScanner {
    /// Create a scanner probing the standard SSC port
    pub fn new() -> Self {
        Self::with_port(DEFAULT_PORT)
    }

    /// Create a scanner probing a non-standard port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            cancelled: Arc::new(AtomicBool::new(false)),
            active_clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Scan the host range of `base_pattern` (e.g. `192.168.0.x`)
    ///
    /// Expands `x` to 1-254 and probes every candidate concurrently. A
    /// cancelled scan resolves to an empty result set rather than a partial
    /// one.
    pub async fn scan(&self, base_pattern: &str) -> Result<Vec<DiscoveredDevice>> {
        if !base_pattern.contains('x') {
            return Err(ScanError::InvalidPattern(base_pattern.to_string()));
        }

        self.cancelled.store(false, Ordering::SeqCst);
        self.active_clients.lock().clear();

        tracing::info!(pattern = base_pattern, "network scan started");

        let tasks: Vec<_> = expand_pattern(base_pattern)
            .into_iter()
            .map(|ip| {
                let scanner = self.clone();
                tokio::spawn(async move { scanner.probe_candidate(ip).await })
            })
            .collect();

        let mut found = Vec::new();
        for result in join_all(tasks).await {
            if let Ok(Some(device)) = result {
                found.push(device);
            }
        }

        if self.cancelled.load(Ordering::SeqCst) {
            tracing::warn!("scan cancelled, returning empty result set");
            return Ok(Vec::new());
        }

        tracing::info!(count = found.len(), "scan complete");
        Ok(found)
    }

    /// Cancel an in-flight scan
    ///
    /// Synchronously disconnects every still-pending candidate client; the
    /// running `scan()` call resolves to an empty list.
    pub fn cancel(&self) {
        tracing::info!("network scan cancellation requested");
        self.cancelled.store(true, Ordering::SeqCst);

        let clients: Vec<SscClient> = {
            let mut active = self.active_clients.lock();
            active.drain().map(|(_, client)| client).collect()
        };
        for client in &clients {
            client.disconnect();
        }
        tracing::debug!(count = clients.len(), "pending scan clients disconnected");
    }

    /// Number of candidate clients still being tracked
    pub fn active_count(&self) -> usize {
        self.active_clients.lock().len()
    }

    async fn probe_candidate(&self, ip: String) -> Option<DiscoveredDevice> {
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }

        let client = SscClient::with_port(ip.clone(), self.port);
        if client.connect().await.is_err() {
            return None;
        }
        self.active_clients
            .lock()
            .insert(ip.clone(), client.clone());

        let name = tokio::time::timeout(CANDIDATE_TIMEOUT, async {
            tokio::time::sleep(SETTLE_DELAY).await;
            if self.cancelled.load(Ordering::SeqCst) {
                return None;
            }
            let data = client.send_raw(&request::device_name()).await.ok()?;
            let response = SscResponse::parse(&data).ok()?;
            response.device_name().map(str::to_string)
        })
        .await
        .ok()
        .flatten();

        self.active_clients.lock().remove(&ip);
        client.disconnect();

        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }

        let name = name?;
        let device_type = classify_scan_name(&name);
        tracing::info!(%name, %ip, %device_type, "device found");

        Some(DiscoveredDevice {
            name,
            ip_address: ip,
            port: self.port,
            device_type,
            last_seen: Utc::now(),
        })
    }
}

impl Default for NetworkScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-tier scan classification
///
/// Scanning favors speed over certainty: only the name substring heuristic
/// is applied, and an ambiguous device is reported as best-guess receiver.
/// This is deliberately independent of the full three-tier detector; the
/// two results are never reconciled.
fn classify_scan_name(name: &str) -> DeviceType {
    if name.contains("CHG") {
        DeviceType::Charger
    } else if name.contains("EW-DX") || name.contains("EWDX") || name.contains("EM") {
        DeviceType::Receiver
    } else {
        tracing::debug!(%name, "unrecognized device name, assuming receiver");
        DeviceType::Receiver
    }
}

fn expand_pattern(base_pattern: &str) -> Vec<String> {
    (1..=254u16)
        .map(|i| base_pattern.replace('x', &i.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_expand_pattern_covers_host_range() {
        let hosts = expand_pattern("192.168.0.x");
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], "192.168.0.1");
        assert_eq!(hosts[253], "192.168.0.254");
    }

    #[rstest]
    #[case("CHG 70N", DeviceType::Charger)]
    #[case("EW-DX EM 2", DeviceType::Receiver)]
    #[case("EWDX-rack", DeviceType::Receiver)]
    #[case("Mystery Box", DeviceType::Receiver)]
    fn test_classify_scan_name(#[case] name: &str, #[case] expected: DeviceType) {
        assert_eq!(classify_scan_name(name), expected);
    }

    #[tokio::test]
    async fn test_invalid_pattern_rejected() {
        let scanner = NetworkScanner::new();
        let result = scanner.scan("192.168.0.7").await;
        assert!(matches!(result, Err(ScanError::InvalidPattern(_))));
    }
}
