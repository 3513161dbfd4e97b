//! Typed model for SSC response documents
//!
//! Responses mirror the partial request tree with values filled in. Only the
//! subtrees the monitoring queries actually read are modeled; everything else
//! a device sends is ignored during decode.

use serde::Deserialize;

use crate::error::{Result, SscError};
use crate::request::Channel;

/// Generic error code reported when the device's own code is not preserved
/// (`424` = failed dependency).
pub const GENERIC_DEVICE_ERROR: i64 = 424;

/// Root of a decoded SSC response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SscResponse {
    pub device: Option<DeviceData>,
    pub rx1: Option<ReceiverChannel>,
    pub rx2: Option<ReceiverChannel>,
    pub m: Option<MeterInfo>,
    pub mates: Option<MatesInfo>,
    pub bays: Option<BaysInfo>,
    pub osc: Option<OscInfo>,
}

/// Device-level properties (`device` subtree)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceData {
    pub name: Option<String>,
    pub identity: Option<DeviceIdentity>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceIdentity {
    pub version: Option<String>,
    pub vendor: Option<String>,
    pub serial: Option<String>,
    pub product: Option<String>,
}

/// Protocol bookkeeping subtree; `error` carries structured failures
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OscInfo {
    pub error: Option<serde_json::Value>,
    pub xid: Option<String>,
    pub version: Option<String>,
}

/// Receiver channel properties (`rx1`/`rx2` subtrees)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiverChannel {
    pub name: Option<String>,
    pub frequency: Option<i64>,
    pub mute: Option<bool>,
    pub warnings: Option<Vec<String>>,
}

/// Live metering (`m` subtree)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeterInfo {
    pub rx1: Option<RxMeter>,
    pub rx2: Option<RxMeter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RxMeter {
    pub rssi: Option<f64>,
    pub rsqi: Option<i32>,
}

/// Paired transmitters (`mates` subtree)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatesInfo {
    pub tx1: Option<TransmitterInfo>,
    pub tx2: Option<TransmitterInfo>,
    pub active: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransmitterInfo {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub warnings: Option<Vec<String>>,
    pub battery: Option<BatteryInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatteryInfo {
    #[serde(rename = "type")]
    pub battery_type: Option<String>,
    pub gauge: Option<i32>,
    pub lifetime: Option<i32>,
}

/// Charger bay arrays (`bays` subtree), indexed positionally by bay
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaysInfo {
    pub storage_mode: Option<bool>,
    pub device_type: Option<Vec<String>>,
    pub bat_gauge: Option<Vec<i32>>,
    pub bat_health: Option<Vec<i32>>,
    pub bat_timetofull: Option<Vec<i32>>,
    pub bat_cycles: Option<Vec<i32>>,
}

impl BaysInfo {
    /// Number of bays the response describes (longest reported array)
    pub fn bay_count(&self) -> usize {
        [
            self.device_type.as_ref().map_or(0, Vec::len),
            self.bat_gauge.as_ref().map_or(0, Vec::len),
            self.bat_health.as_ref().map_or(0, Vec::len),
            self.bat_timetofull.as_ref().map_or(0, Vec::len),
            self.bat_cycles.as_ref().map_or(0, Vec::len),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

impl SscResponse {
    /// Decode a raw response datagram
    pub fn parse(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| SscError::Malformed(e.to_string()))
    }

    /// Whether the response carries a structured `osc.error`
    pub fn has_error(&self) -> bool {
        self.osc.as_ref().map_or(false, |osc| osc.error.is_some())
    }

    /// Error code of a structured failure, if present
    ///
    /// The device reports the code as the first element of an array; when it
    /// cannot be read as an integer the generic `424` is substituted.
    pub fn error_code(&self) -> Option<i64> {
        let error = self.osc.as_ref()?.error.as_ref()?;
        Some(
            error
                .as_array()
                .and_then(|arr| arr.first())
                .and_then(|v| v.as_i64())
                .unwrap_or(GENERIC_DEVICE_ERROR),
        )
    }

    /// Promote a structured device error to an `Err`, passing the response
    /// through untouched otherwise
    pub fn into_checked(self) -> Result<Self> {
        match self.error_code() {
            Some(code) => Err(SscError::Device(code)),
            None => Ok(self),
        }
    }

    /// Device display name
    pub fn device_name(&self) -> Option<&str> {
        self.device.as_ref()?.name.as_deref()
    }

    fn rx(&self, channel: Channel) -> Option<&ReceiverChannel> {
        if channel == 1 {
            self.rx1.as_ref()
        } else {
            self.rx2.as_ref()
        }
    }

    fn tx(&self, channel: Channel) -> Option<&TransmitterInfo> {
        // A structured error means the mate data is unusable even if present.
        if self.has_error() {
            return None;
        }
        let mates = self.mates.as_ref()?;
        if channel == 1 {
            mates.tx1.as_ref()
        } else {
            mates.tx2.as_ref()
        }
    }

    /// Receiver channel display name
    pub fn rx_name(&self, channel: Channel) -> Option<&str> {
        self.rx(channel)?.name.as_deref()
    }

    /// Battery gauge (percent) of the transmitter paired with `channel`
    pub fn tx_battery_gauge(&self, channel: Channel) -> Option<i32> {
        self.tx(channel)?.battery.as_ref()?.gauge
    }

    /// Remaining runtime (minutes) of the transmitter paired with `channel`
    pub fn tx_battery_lifetime(&self, channel: Channel) -> Option<i32> {
        self.tx(channel)?.battery.as_ref()?.lifetime
    }

    /// Signal quality (rsqi, percent) of a receiver channel
    pub fn rx_signal_quality(&self, channel: Channel) -> Option<i32> {
        let meter = self.m.as_ref()?;
        if channel == 1 {
            meter.rx1.as_ref()?.rsqi
        } else {
            meter.rx2.as_ref()?.rsqi
        }
    }

    /// Active warnings of the transmitter paired with `channel`
    pub fn tx_warnings(&self, channel: Channel) -> Option<&[String]> {
        self.tx(channel)?.warnings.as_deref()
    }
}
