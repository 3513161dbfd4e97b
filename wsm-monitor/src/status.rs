//! Published status models
//!
//! `MicStatus` is the merged per-microphone view; it persists across cycles
//! and degrades to `Disconnected` rather than being destroyed. Bay statuses
//! are rebuilt from scratch every cycle from the owning charger's response.

use serde::{Deserialize, Serialize};

use ssc_client::BaysInfo;

use crate::device::DeviceInfo;

/// Product-family marker a bay occupant must carry to count as a microphone
const MIC_PRODUCT_FAMILY: &str = "EW-DX";

/// Lifecycle state of a microphone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MicState {
    /// Sitting in a charger bay
    Charging,
    /// Live on a receiver channel
    Active,
    /// Not corroborated by any source
    Disconnected,
}

impl std::fmt::Display for MicState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MicState::Charging => write!(f, "charging"),
            MicState::Active => write!(f, "active"),
            MicState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Merged status of one microphone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicStatus {
    /// Stable identifier (receiver channel index for receiver-sourced mics)
    pub id: usize,
    pub name: String,
    /// Battery gauge percent; 0 when unknown
    pub battery_percentage: i32,
    /// Signal quality percent; meaningful only while `Active`
    pub signal_strength: i32,
    /// Remaining runtime in minutes; 0 = unknown, retained across transient
    /// read glitches while `Active`
    pub battery_runtime: i32,
    /// Whether the transmitter reports any warning
    pub warning: bool,
    pub state: MicState,
    /// Device whose response this status came from
    pub source_device: Option<DeviceInfo>,
}

impl MicStatus {
    /// Fully-empty placeholder for an id never seen with real data
    pub fn empty(id: usize) -> Self {
        Self {
            id,
            name: format!("Mic {id}"),
            battery_percentage: 0,
            signal_strength: 0,
            battery_runtime: 0,
            warning: false,
            state: MicState::Disconnected,
            source_device: None,
        }
    }

    /// Degrade to disconnected, keeping the last battery gauge for UI
    /// continuity but zeroing the live-only fields
    pub fn set_disconnected(&mut self) {
        self.state = MicState::Disconnected;
        self.signal_strength = 0;
        self.battery_runtime = 0;
    }
}

/// Status of one charging bay, rebuilt every cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargingBayStatus {
    /// Bay index on the owning charger
    pub id: usize,
    /// Occupant product type; empty or `"NONE"` when the bay is free
    pub device_type: String,
    pub battery_percentage: i32,
    pub battery_health: i32,
    /// Minutes until fully charged
    pub time_to_full: i32,
    pub battery_cycles: i32,
    pub source_device: Option<DeviceInfo>,
}

impl ChargingBayStatus {
    /// Whether a recognized microphone sits in this bay
    ///
    /// True only for a non-empty occupant type that is not `"NONE"` and
    /// belongs to the expected product family; chargers happily report
    /// foreign hardware they cannot charge.
    pub fn has_device(&self) -> bool {
        self.device_type != "NONE"
            && !self.device_type.is_empty()
            && self.device_type.contains(MIC_PRODUCT_FAMILY)
    }

    /// Zip a charger's positional bay arrays into per-bay statuses
    ///
    /// Missing arrays default field-wise to zero; bay count follows the
    /// longest array present.
    pub fn from_bays(bays: &BaysInfo, source_device: &DeviceInfo) -> Vec<Self> {
        let get_str = |v: &Option<Vec<String>>, i: usize| {
            v.as_ref()
                .and_then(|v| v.get(i).cloned())
                .unwrap_or_else(|| "NONE".to_string())
        };
        let get_int =
            |v: &Option<Vec<i32>>, i: usize| v.as_ref().and_then(|v| v.get(i).copied()).unwrap_or(0);

        (0..bays.bay_count())
            .map(|i| Self {
                id: i,
                device_type: get_str(&bays.device_type, i),
                battery_percentage: get_int(&bays.bat_gauge, i),
                battery_health: get_int(&bays.bat_health, i),
                time_to_full: get_int(&bays.bat_timetofull, i),
                battery_cycles: get_int(&bays.bat_cycles, i),
                source_device: Some(source_device.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ssc_client::{DeviceType, SscResponse};

    fn charger() -> DeviceInfo {
        DeviceInfo::new("CHG 70N", "192.168.0.60", DeviceType::Charger)
    }

    #[rstest]
    #[case("EW-DX SK", true)]
    #[case("EW-DX SKM-S", true)]
    #[case("NONE", false)]
    #[case("", false)]
    #[case("AA-BATTERY", false)]
    fn test_has_device(#[case] device_type: &str, #[case] expected: bool) {
        let bay = ChargingBayStatus {
            id: 0,
            device_type: device_type.to_string(),
            battery_percentage: 50,
            battery_health: 99,
            time_to_full: 30,
            battery_cycles: 10,
            source_device: None,
        };
        assert_eq!(bay.has_device(), expected);
    }

    #[test]
    fn test_from_bays_zips_positionally() {
        let data = br#"{"bays":{
            "device_type":["EW-DX SK","NONE"],
            "bat_gauge":[80,0],
            "bat_health":[97,100],
            "bat_timetofull":[25,0],
            "bat_cycles":[12,3]
        }}"#;
        let response = SscResponse::parse(data).unwrap();
        let bays = ChargingBayStatus::from_bays(&response.bays.unwrap(), &charger());

        assert_eq!(bays.len(), 2);
        assert_eq!(bays[0].id, 0);
        assert_eq!(bays[0].battery_percentage, 80);
        assert_eq!(bays[0].time_to_full, 25);
        assert!(bays[0].has_device());
        assert!(!bays[1].has_device());
    }

    #[test]
    fn test_from_bays_defaults_missing_arrays() {
        let data = br#"{"bays":{"device_type":["EW-DX SK"],"bat_gauge":[64]}}"#;
        let response = SscResponse::parse(data).unwrap();
        let bays = ChargingBayStatus::from_bays(&response.bays.unwrap(), &charger());

        assert_eq!(bays.len(), 1);
        assert_eq!(bays[0].battery_health, 0);
        assert_eq!(bays[0].time_to_full, 0);
        assert_eq!(bays[0].battery_cycles, 0);
    }

    #[test]
    fn test_empty_mic_placeholder() {
        let mic = MicStatus::empty(2);
        assert_eq!(mic.id, 2);
        assert_eq!(mic.state, MicState::Disconnected);
        assert_eq!(mic.battery_percentage, 0);
        assert!(mic.source_device.is_none());
    }

    #[test]
    fn test_set_disconnected_retains_battery() {
        let mut mic = MicStatus::empty(1);
        mic.battery_percentage = 40;
        mic.signal_strength = 70;
        mic.battery_runtime = 120;
        mic.state = MicState::Active;

        mic.set_disconnected();
        assert_eq!(mic.state, MicState::Disconnected);
        assert_eq!(mic.battery_percentage, 40);
        assert_eq!(mic.signal_strength, 0);
        assert_eq!(mic.battery_runtime, 0);
    }
}
