//! Device classification
//!
//! A freshly discovered endpoint is classified as receiver or charger by a
//! three-tier sequential probe: the display name first, then a receiver-only
//! channel path, then a charger-only bay path. The first conclusive tier
//! wins; a device matching none of them stays unclassified and is excluded
//! from typed querying.

use serde::{Deserialize, Serialize};

use crate::client::SscClient;
use crate::error::Result;
use crate::request;
use crate::response::SscResponse;

/// The two device classes the monitoring engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Rack receiver with two microphone channels
    Receiver,
    /// Charging unit with battery bays
    Charger,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Receiver => write!(f, "receiver"),
            DeviceType::Charger => write!(f, "charger"),
        }
    }
}

/// Classify a device by its display name (tier 1 heuristic)
///
/// Chargers carry a `CHG` model prefix; receivers report an `EW-DX EM`
/// family name, sometimes without the space. Unknown names return `None`.
pub fn classify_device_name(name: &str) -> Option<DeviceType> {
    if name.contains("CHG") {
        Some(DeviceType::Charger)
    } else if name.contains("EW-DX EM")
        || name.contains("EWDXEM")
        || (name.contains("EW-DX") && name.contains("EM"))
    {
        Some(DeviceType::Receiver)
    } else {
        None
    }
}

/// Run the three-tier device-type probe against a connected client
///
/// Tiers are issued sequentially; probe failures fall through to the next
/// tier rather than aborting, so a device that drops the name request can
/// still be classified structurally. Returns `None` when every tier is
/// inconclusive.
pub async fn detect_device_type(client: &SscClient) -> Result<Option<DeviceType>> {
    // Tier 1: display name pattern match.
    if let Ok(data) = client.send_raw(&request::device_name()).await {
        if let Ok(response) = SscResponse::parse(&data) {
            if let Some(name) = response.device_name() {
                if let Some(device_type) = classify_device_name(name) {
                    tracing::debug!(ip = %client.device_ip(), %device_type, "classified by name");
                    return Ok(Some(device_type));
                }
            }
        }
    }

    // Tier 2: receiver-only channel path answers without a structured error.
    if let Ok(data) = client.send_raw(&request::rx_name(1)).await {
        if let Ok(response) = SscResponse::parse(&data) {
            if response.rx1.is_some() && !response.has_error() {
                tracing::debug!(ip = %client.device_ip(), "classified as receiver by rx1 probe");
                return Ok(Some(DeviceType::Receiver));
            }
        }
    }

    // Tier 3: charger-only bay path.
    if let Ok(data) = client.send_raw(&request::bays_battery_gauge()).await {
        if let Ok(response) = SscResponse::parse(&data) {
            if response.bays.is_some() && !response.has_error() {
                tracing::debug!(ip = %client.device_ip(), "classified as charger by bays probe");
                return Ok(Some(DeviceType::Charger));
            }
        }
    }

    tracing::warn!(ip = %client.device_ip(), "device type could not be determined");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CHG 70N", Some(DeviceType::Charger))]
    #[case("CHG-70N-C", Some(DeviceType::Charger))]
    #[case("EW-DX EM 2", Some(DeviceType::Receiver))]
    #[case("EWDXEM2-StageLeft", Some(DeviceType::Receiver))]
    #[case("EW-DX-EM-DANTE", Some(DeviceType::Receiver))]
    #[case("SpeakerPhone", None)]
    #[case("", None)]
    fn test_classify_device_name(#[case] name: &str, #[case] expected: Option<DeviceType>) {
        assert_eq!(classify_device_name(name), expected);
    }

    #[test]
    fn test_device_type_display() {
        assert_eq!(DeviceType::Receiver.to_string(), "receiver");
        assert_eq!(DeviceType::Charger.to_string(), "charger");
    }

    #[test]
    fn test_device_type_serde_roundtrip() {
        let json = serde_json::to_string(&DeviceType::Charger).unwrap();
        assert_eq!(json, r#""charger""#);
        let back: DeviceType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DeviceType::Charger);
    }
}
