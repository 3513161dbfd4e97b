//! Per-device composite queries
//!
//! `DeviceClient` wraps one protocol client and composes the individual
//! field probes into the two logical operations the polling engine needs:
//! "query mic status" for a receiver channel and "query bay status" for a
//! charger. Field probes degrade independently; a device only counts as
//! unreachable when nothing answers at all.

use ssc_client::{detect_device_type, request, DeviceType, SscClient, SscResponse};
use tracing::{debug, warn};

use crate::device::DeviceInfo;
use crate::error::{MonitorError, Result};
use crate::status::{ChargingBayStatus, MicState, MicStatus};

/// Battery-health placeholder used when the fallback bay queries cannot
/// report a real value
const FALLBACK_BATTERY_HEALTH: i32 = 99;

/// Composite-query client for one registered device
///
/// Cheap to clone; clones share the underlying UDP association.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    device: DeviceInfo,
    client: SscClient,
}

impl DeviceClient {
    pub fn new(device: DeviceInfo) -> Self {
        let client = SscClient::with_port(device.ip_address.clone(), device.port);
        Self { device, client }
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Open the UDP association up front instead of on first query
    pub async fn connect(&self) -> Result<()> {
        self.ensure_connected().await
    }

    pub fn disconnect(&self) {
        self.client.disconnect();
    }

    async fn ensure_connected(&self) -> Result<()> {
        if !self.client.is_connected() {
            self.client
                .connect()
                .await
                .map_err(|_| MonitorError::Unreachable(self.device.ip_address.clone()))?;
        }
        Ok(())
    }

    async fn probe(&self, request: String) -> ssc_client::Result<SscResponse> {
        let data = self.client.send_raw(&request).await?;
        SscResponse::parse(&data)
    }

    /// Query one receiver channel's microphone status
    ///
    /// Issues the five field probes (name, battery gauge, runtime, signal
    /// quality, warnings) concurrently and classifies the lifecycle from
    /// whatever answered. Returns `Err` only when every probe failed, which
    /// the polling engine treats as the device being unreachable.
    pub async fn query_mic_status(&self, channel: u8) -> Result<MicStatus> {
        self.ensure_connected().await?;

        let (name, gauge, lifetime, signal, warnings) = tokio::join!(
            self.probe(request::rx_name(channel)),
            self.probe(request::tx_battery_gauge(channel)),
            self.probe(request::tx_battery_lifetime(channel)),
            self.probe(request::rx_signal_quality(channel)),
            self.probe(request::tx_warnings(channel)),
        );

        if name.is_err()
            && gauge.is_err()
            && lifetime.is_err()
            && signal.is_err()
            && warnings.is_err()
        {
            return Err(MonitorError::Unreachable(self.device.ip_address.clone()));
        }

        // A hard failure on the identifying probes makes the whole reading
        // untrustworthy; runtime and warnings alone never rescue it.
        let error_detected = [&name, &gauge, &signal]
            .iter()
            .any(|r| r.as_ref().map_or(true, SscResponse::has_error));

        let mut status = MicStatus::empty(channel as usize);
        status.source_device = Some(self.device.clone());

        if let Ok(response) = &name {
            if let Some(rx_name) = response.rx_name(channel) {
                if !rx_name.is_empty() {
                    status.name = rx_name.to_string();
                }
            }
        }
        status.battery_percentage = gauge
            .ok()
            .and_then(|r| r.tx_battery_gauge(channel))
            .unwrap_or(0);
        status.battery_runtime = lifetime
            .ok()
            .and_then(|r| r.tx_battery_lifetime(channel))
            .unwrap_or(0);
        status.signal_strength = signal
            .ok()
            .and_then(|r| r.rx_signal_quality(channel))
            .unwrap_or(0);
        status.warning = warnings
            .ok()
            .and_then(|r| r.tx_warnings(channel).map(|w| !w.is_empty()))
            .unwrap_or(false);

        status.state = classify_lifecycle(
            error_detected,
            status.battery_percentage,
            status.signal_strength,
        );

        debug!(
            device = %self.device.name,
            channel,
            state = %status.state,
            battery = status.battery_percentage,
            "mic status gathered"
        );
        Ok(status)
    }

    /// Query a charger's bay statuses
    ///
    /// Tries one combined request for every bay attribute first; when the
    /// combined response is absent or empty, falls back to two sequential
    /// individual requests (occupant types, then battery gauges) zipped
    /// positionally. The fallback cannot observe health, time-to-full, or
    /// cycle counts, so those get conservative placeholders.
    pub async fn query_bay_status(&self) -> Result<Vec<ChargingBayStatus>> {
        self.ensure_connected().await?;

        match self.probe(request::bays_combined()).await {
            Ok(response) if !response.has_error() => {
                if let Some(bays) = &response.bays {
                    if bays.bay_count() > 0 {
                        return Ok(ChargingBayStatus::from_bays(bays, &self.device));
                    }
                }
            }
            Ok(_) => {}
            Err(e) => debug!(device = %self.device.name, error = %e, "combined bay query failed"),
        }

        debug!(device = %self.device.name, "falling back to individual bay queries");
        self.query_bays_individually().await
    }

    async fn query_bays_individually(&self) -> Result<Vec<ChargingBayStatus>> {
        let types = self.probe(request::bays_device_type()).await?;
        let gauges = self.probe(request::bays_battery_gauge()).await?;

        let device_type = types
            .bays
            .and_then(|b| b.device_type)
            .unwrap_or_default();
        let bat_gauge = gauges.bays.and_then(|b| b.bat_gauge).unwrap_or_default();
        let count = device_type.len().max(bat_gauge.len());

        Ok((0..count)
            .map(|i| ChargingBayStatus {
                id: i,
                device_type: device_type
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| "NONE".to_string()),
                battery_percentage: bat_gauge.get(i).copied().unwrap_or(0),
                battery_health: FALLBACK_BATTERY_HEALTH,
                time_to_full: 0,
                battery_cycles: 0,
                source_device: Some(self.device.clone()),
            })
            .collect())
    }

    /// Probe the device and compare its detected class against the
    /// registered one
    ///
    /// The registered class stays authoritative; a mismatch is logged so a
    /// misfiled device shows up in the logs instead of silently answering
    /// the wrong composite queries.
    pub async fn verify_device_type(&self) -> Result<Option<DeviceType>> {
        self.ensure_connected().await?;
        let detected = detect_device_type(&self.client).await?;
        if let Some(detected) = detected {
            if detected != self.device.device_type {
                warn!(
                    device = %self.device.name,
                    registered = %self.device.device_type,
                    %detected,
                    "device answered as a different type than registered"
                );
            }
        }
        Ok(detected)
    }
}

fn classify_lifecycle(error_detected: bool, battery: i32, signal: i32) -> MicState {
    if error_detected || battery <= 0 {
        MicState::Disconnected
    } else if signal > 0 {
        MicState::Active
    } else {
        MicState::Charging
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, 60, 50, MicState::Active)]
    #[case(false, 60, 0, MicState::Charging)]
    #[case(false, 0, 50, MicState::Disconnected)]
    #[case(true, 60, 50, MicState::Disconnected)]
    #[case(false, -1, 0, MicState::Disconnected)]
    fn test_classify_lifecycle(
        #[case] error_detected: bool,
        #[case] battery: i32,
        #[case] signal: i32,
        #[case] expected: MicState,
    ) {
        assert_eq!(classify_lifecycle(error_detected, battery, signal), expected);
    }

    #[test]
    fn test_clients_share_association() {
        let client = DeviceClient::new(DeviceInfo::new(
            "EW-DX EM 2",
            "192.168.0.50",
            DeviceType::Receiver,
        ));
        let clone = client.clone();
        assert_eq!(clone.device().ip_address, "192.168.0.50");
        assert!(!clone.client.is_connected());
    }
}
