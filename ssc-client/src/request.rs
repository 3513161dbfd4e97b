//! SSC request document builders
//!
//! An SSC request is a partial-tree JSON document whose `null` leaves name
//! the fields the device should report back. One document per datagram,
//! no framing, no newline.

/// Which receiver channel a request targets
///
/// Receivers expose two channels; channel paths on the wire are `rx1`/`rx2`
/// for the receiver side and `tx1`/`tx2` for the paired transmitter.
pub type Channel = u8;

fn rx_path(channel: Channel) -> &'static str {
    if channel == 1 {
        "rx1"
    } else {
        "rx2"
    }
}

fn tx_path(channel: Channel) -> &'static str {
    if channel == 1 {
        "tx1"
    } else {
        "tx2"
    }
}

/// Probe for the device display name
pub fn device_name() -> String {
    r#"{"device":{"name":null}}"#.to_string()
}

/// Probe for a receiver channel's display name
pub fn rx_name(channel: Channel) -> String {
    format!(r#"{{"{}":{{"name":null}}}}"#, rx_path(channel))
}

/// Probe for the paired transmitter's battery gauge (percent)
pub fn tx_battery_gauge(channel: Channel) -> String {
    format!(
        r#"{{"mates":{{"{}":{{"battery":{{"gauge":null}}}}}}}}"#,
        tx_path(channel)
    )
}

/// Probe for the paired transmitter's remaining battery runtime (minutes)
pub fn tx_battery_lifetime(channel: Channel) -> String {
    format!(
        r#"{{"mates":{{"{}":{{"battery":{{"lifetime":null}}}}}}}}"#,
        tx_path(channel)
    )
}

/// Probe for a receiver channel's signal quality (rsqi, percent)
pub fn rx_signal_quality(channel: Channel) -> String {
    format!(r#"{{"m":{{"{}":{{"rsqi":null}}}}}}"#, rx_path(channel))
}

/// Probe for the paired transmitter's active warnings
pub fn tx_warnings(channel: Channel) -> String {
    format!(r#"{{"mates":{{"{}":{{"warnings":null}}}}}}"#, tx_path(channel))
}

/// Combined probe for every bay attribute of a charger
///
/// Some firmware/transport combinations silently drop the large combined
/// response; callers fall back to [`bays_device_type`] + [`bays_battery_gauge`].
pub fn bays_combined() -> String {
    r#"{"bays":{"device_type":null,"bat_gauge":null,"bat_health":null,"bat_timetofull":null,"bat_cycles":null}}"#
        .to_string()
}

/// Probe for the per-bay occupant device types
pub fn bays_device_type() -> String {
    r#"{"bays":{"device_type":null}}"#.to_string()
}

/// Probe for the per-bay battery gauges
pub fn bays_battery_gauge() -> String {
    r#"{"bays":{"bat_gauge":null}}"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_paths() {
        assert_eq!(rx_name(1), r#"{"rx1":{"name":null}}"#);
        assert_eq!(rx_name(2), r#"{"rx2":{"name":null}}"#);
        assert_eq!(
            tx_battery_gauge(2),
            r#"{"mates":{"tx2":{"battery":{"gauge":null}}}}"#
        );
        assert_eq!(rx_signal_quality(1), r#"{"m":{"rx1":{"rsqi":null}}}"#);
        assert_eq!(tx_warnings(1), r#"{"mates":{"tx1":{"warnings":null}}}"#);
    }

    #[test]
    fn test_requests_are_single_line_json() {
        for request in [
            device_name(),
            rx_name(1),
            tx_battery_gauge(1),
            tx_battery_lifetime(2),
            rx_signal_quality(2),
            tx_warnings(2),
            bays_combined(),
            bays_device_type(),
            bays_battery_gauge(),
        ] {
            assert!(!request.contains('\n'));
            let parsed: serde_json::Value = serde_json::from_str(&request).unwrap();
            assert!(parsed.is_object());
        }
    }
}
