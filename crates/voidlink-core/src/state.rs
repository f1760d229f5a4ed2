//! Headset state model and its transition rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::battery::BatteryInfo;
use crate::protocol::{RawBatteryReport, RawFirmwareReport};

/// A firmware version pair. `0.0` means "not known yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl FirmwareVersion {
    pub const UNKNOWN: Self = Self { major: 0, minor: 0 };

    #[must_use]
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// The version, or `None` while it is the unknown sentinel.
    #[must_use]
    pub fn known(self) -> Option<Self> {
        (self != Self::UNKNOWN).then_some(self)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

/// Receiver and headset firmware versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firmware {
    pub receiver: FirmwareVersion,
    pub headset: FirmwareVersion,
}

/// Direction of a change in the receiver-to-headset link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEdge {
    Connected,
    Disconnected,
}

/// What changed when a status report was applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Set only when the connection flag flipped.
    pub edge: Option<ConnectionEdge>,
    /// Whether any field of the battery record differs from before.
    pub battery_changed: bool,
}

/// Everything currently known about one receiver and its headset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Receiver-to-headset link, as of the last status report
    pub connected: bool,
    /// Microphone boom raised
    pub mic_up: bool,
    pub battery: BatteryInfo,
    pub firmware: Firmware,
}

impl DeviceState {
    /// Apply a status report.
    ///
    /// Connection is level-triggered: every report sets `connected` from its
    /// connection code and an edge is reported only when the flag flips.
    pub fn apply_battery_report(&mut self, report: &RawBatteryReport) -> StatusUpdate {
        let connected = report.is_connected();
        let edge = match (self.connected, connected) {
            (false, true) => Some(ConnectionEdge::Connected),
            (true, false) => Some(ConnectionEdge::Disconnected),
            _ => None,
        };

        self.connected = connected;
        if connected {
            self.mic_up = report.mic_up;
        } else {
            self.mic_up = false;
            self.firmware.headset = FirmwareVersion::UNKNOWN;
        }

        let battery = BatteryInfo::from_report(report);
        let battery_changed = battery != self.battery;
        self.battery = battery;

        StatusUpdate { edge, battery_changed }
    }

    /// Apply a firmware report, returning whether either version changed.
    ///
    /// The headset version is only recorded while the headset is connected.
    pub fn apply_firmware_report(&mut self, report: &RawFirmwareReport) -> bool {
        let headset = if self.connected {
            FirmwareVersion::new(report.headset_major, report.headset_minor)
        } else {
            FirmwareVersion::UNKNOWN
        };
        let firmware = Firmware {
            receiver: FirmwareVersion::new(report.receiver_major, report.receiver_minor),
            headset,
        };

        let changed = firmware != self.firmware;
        self.firmware = firmware;
        changed
    }
}

/// Observable headset changes, in the order they were decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "data")]
pub enum HeadsetEvent {
    Connected,
    Disconnected,
    BatteryChanged(BatteryInfo),
    FirmwareChanged(Firmware),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::{BatteryStatus, CapacityLevel};

    fn status(connection_code: u8, battery_status_code: u8, capacity: u8, mic_up: bool) -> RawBatteryReport {
        RawBatteryReport {
            power_button_pressed: false,
            battery_capacity: capacity,
            mic_up,
            connection_code,
            battery_status_code,
        }
    }

    fn firmware(rx: (u8, u8), hs: (u8, u8)) -> RawFirmwareReport {
        RawFirmwareReport {
            receiver_major: rx.0,
            receiver_minor: rx.1,
            headset_major: hs.0,
            headset_minor: hs.1,
        }
    }

    fn assert_invariants(state: &DeviceState) {
        if !state.battery.present {
            assert_eq!(state.battery, BatteryInfo::unknown());
        }
        if !state.connected {
            assert_eq!(state.firmware.headset, FirmwareVersion::UNKNOWN);
            assert!(!state.mic_up);
        }
    }

    #[test]
    fn test_default_state_is_unknown() {
        let state = DeviceState::default();

        assert!(!state.connected);
        assert!(!state.mic_up);
        assert_eq!(state.battery, BatteryInfo::unknown());
        assert_eq!(state.firmware, Firmware::default());
        assert_invariants(&state);
    }

    #[test]
    fn test_connect_edge_and_battery() {
        let mut state = DeviceState::default();

        let update = state.apply_battery_report(&status(177, 1, 75, true));

        assert_eq!(update.edge, Some(ConnectionEdge::Connected));
        assert!(update.battery_changed);
        assert!(state.connected);
        assert!(state.mic_up);
        assert_eq!(state.battery.status, BatteryStatus::Discharging);
        assert_eq!(state.battery.capacity, 75);
        assert_invariants(&state);
    }

    #[test]
    fn test_repeated_report_is_level_triggered() {
        let mut state = DeviceState::default();
        state.apply_battery_report(&status(177, 1, 75, false));

        let update = state.apply_battery_report(&status(177, 1, 75, false));

        assert_eq!(update, StatusUpdate { edge: None, battery_changed: false });
    }

    #[test]
    fn test_disconnect_resets_headset_fields() {
        let mut state = DeviceState::default();
        state.apply_battery_report(&status(177, 5, 40, true));
        state.apply_firmware_report(&firmware((2, 11), (1, 7)));
        assert_eq!(state.firmware.headset, FirmwareVersion::new(1, 7));

        let update = state.apply_battery_report(&status(51, 5, 40, true));

        assert_eq!(update.edge, Some(ConnectionEdge::Disconnected));
        assert!(update.battery_changed);
        assert!(!state.connected);
        assert!(!state.mic_up);
        assert_eq!(state.firmware.headset, FirmwareVersion::UNKNOWN);
        assert_eq!(state.firmware.receiver, FirmwareVersion::new(2, 11));
        assert_eq!(state.battery, BatteryInfo::unknown());
        assert_invariants(&state);
    }

    #[test]
    fn test_disconnected_reports_keep_state_unknown() {
        let mut state = DeviceState::default();

        for code in [38, 49, 51, 52] {
            let update = state.apply_battery_report(&status(code, 3, 10, true));
            assert_eq!(update, StatusUpdate::default());
            assert_invariants(&state);
        }
    }

    #[test]
    fn test_battery_level_change_without_edge() {
        let mut state = DeviceState::default();
        state.apply_battery_report(&status(177, 1, 20, false));

        let update = state.apply_battery_report(&status(177, 2, 19, false));

        assert_eq!(update.edge, None);
        assert!(update.battery_changed);
        assert_eq!(state.battery.capacity_level, CapacityLevel::Low);
    }

    #[test]
    fn test_mic_toggle_is_not_a_battery_change() {
        let mut state = DeviceState::default();
        state.apply_battery_report(&status(177, 1, 50, false));

        let update = state.apply_battery_report(&status(177, 1, 50, true));

        assert!(!update.battery_changed);
        assert!(state.mic_up);
    }

    #[test]
    fn test_firmware_report_while_connected() {
        let mut state = DeviceState::default();
        state.apply_battery_report(&status(177, 1, 50, false));

        assert!(state.apply_firmware_report(&firmware((2, 11), (1, 7))));
        assert!(!state.apply_firmware_report(&firmware((2, 11), (1, 7))));
        assert_eq!(state.firmware.receiver.known(), Some(FirmwareVersion::new(2, 11)));
        assert_eq!(state.firmware.headset.known(), Some(FirmwareVersion::new(1, 7)));
    }

    #[test]
    fn test_firmware_report_while_disconnected_keeps_headset_unknown() {
        let mut state = DeviceState::default();

        assert!(state.apply_firmware_report(&firmware((2, 11), (1, 7))));

        assert_eq!(state.firmware.receiver, FirmwareVersion::new(2, 11));
        assert_eq!(state.firmware.headset.known(), None);
        assert_invariants(&state);
    }

    #[test]
    fn test_firmware_version_display() {
        assert_eq!(FirmwareVersion::new(2, 5).to_string(), "2.05");
        assert_eq!(FirmwareVersion::new(1, 17).to_string(), "1.17");
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(HeadsetEvent::Connected).unwrap();
        assert_eq!(json, serde_json::json!({"type": "connected"}));
    }
}
