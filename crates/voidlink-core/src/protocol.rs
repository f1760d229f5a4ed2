//! Corsair Void receiver report layouts.
//!
//! Inbound reports are decoded from their fixed layouts without any state.
//! Outbound commands are built from validated arguments. The two directions
//! are independent: nothing decoded here is ever re-encoded.
//!
//! | Report | Direction | Layout |
//! |--------|-----------|--------|
//! | Status (`0x64`) | in | `[id][power][capacity:7 mic:1][connection][battery status]` |
//! | Firmware (`0x66`) | in | `[id][rx major][rx minor][hs major][hs minor]` |
//! | Status query (`0xC9`) | out | `[0xC9][item id]` |
//! | Alert (`0xCA`) | out | `[0xCA][0x02][alert id]` |
//! | Sidetone (`0xFF`) | out, feature | 11-byte header, `level + 200`, zero padding to 64 |

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Report id of the periodic status (battery/connection) report.
pub const STATUS_REPORT_ID: u8 = 0x64;
/// Report id of the firmware version report.
pub const FIRMWARE_REPORT_ID: u8 = 0x66;
/// Report id used to ask the receiver to resend a report.
pub const STATUS_REQUEST_ID: u8 = 0xC9;
/// Report id used for notification (alert) commands.
pub const NOTIF_REQUEST_ID: u8 = 0xCA;
/// Report id of the wireless sidetone feature report.
pub const SIDETONE_REQUEST_ID: u8 = 0xFF;

/// `connection_code` value reported while the headset is linked.
pub const CONNECTION_NORMAL: u8 = 177;

/// Highest sidetone level accepted by wireless receivers.
pub const SIDETONE_MAX: u8 = 55;
/// Highest alert id understood by the headset.
pub const ALERT_MAX: u8 = 1;

pub const BATTERY_REPORT_LEN: usize = 5;
pub const FIRMWARE_REPORT_LEN: usize = 4;
pub const SIDETONE_REPORT_LEN: usize = 64;

const SIDETONE_HEADER: [u8; 11] =
    [0xFF, 0x0B, 0x00, 0xFF, 0x04, 0x0E, 0xFF, 0x05, 0x01, 0x04, 0x00];
const SIDETONE_OFFSET: u8 = 200;

/// Fields of a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBatteryReport {
    pub power_button_pressed: bool,
    /// Raw 7-bit capacity, not clamped.
    pub battery_capacity: u8,
    pub mic_up: bool,
    pub connection_code: u8,
    pub battery_status_code: u8,
}

impl RawBatteryReport {
    /// Whether the receiver reports a live link to the headset.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_code == CONNECTION_NORMAL
    }
}

/// Fields of a firmware report payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFirmwareReport {
    pub receiver_major: u8,
    pub receiver_minor: u8,
    pub headset_major: u8,
    pub headset_minor: u8,
}

/// An inbound report classified by its report id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundReport {
    Battery(RawBatteryReport),
    Firmware(RawFirmwareReport),
    /// A report id this driver does not interpret.
    Other(u8),
}

impl InboundReport {
    /// Classify and decode a raw report whose first byte is the report id.
    ///
    /// # Errors
    /// Returns [`Error::MalformedReport`] for an empty buffer or when a known
    /// report id carries the wrong number of bytes.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let Some((&id, payload)) = buf.split_first() else {
            return Err(Error::MalformedReport { expected: 1, actual: 0 });
        };

        match id {
            STATUS_REPORT_ID => decode_battery_report(buf).map(Self::Battery),
            FIRMWARE_REPORT_ID => decode_firmware_report(payload).map(Self::Firmware),
            other => Ok(Self::Other(other)),
        }
    }
}

/// Decode a 5-byte status report (report id included).
///
/// # Errors
/// Returns [`Error::MalformedReport`] if `buf` is not exactly 5 bytes.
pub fn decode_battery_report(buf: &[u8]) -> Result<RawBatteryReport> {
    let &[_, power, capacity_mic, connection, status] = buf else {
        return Err(Error::MalformedReport { expected: BATTERY_REPORT_LEN, actual: buf.len() });
    };

    Ok(RawBatteryReport {
        power_button_pressed: power & 0x80 != 0,
        battery_capacity: capacity_mic & 0x7F,
        mic_up: capacity_mic & 0x80 != 0,
        connection_code: connection,
        battery_status_code: status,
    })
}

/// Decode a 4-byte firmware report payload (report id stripped).
///
/// # Errors
/// Returns [`Error::MalformedReport`] if `buf` is not exactly 4 bytes.
pub fn decode_firmware_report(buf: &[u8]) -> Result<RawFirmwareReport> {
    let &[receiver_major, receiver_minor, headset_major, headset_minor] = buf else {
        return Err(Error::MalformedReport { expected: FIRMWARE_REPORT_LEN, actual: buf.len() });
    };

    Ok(RawFirmwareReport { receiver_major, receiver_minor, headset_major, headset_minor })
}

/// Build a request asking the receiver to resend report `item_id`.
#[must_use]
pub fn encode_status_query(item_id: u8) -> [u8; 2] {
    [STATUS_REQUEST_ID, item_id]
}

/// Build an alert command.
///
/// # Errors
/// Returns [`Error::InvalidArgument`] if `alert_id` is greater than 1.
pub fn encode_alert(alert_id: u8) -> Result<[u8; 3]> {
    if alert_id > ALERT_MAX {
        return Err(Error::InvalidArgument(format!(
            "alert id {alert_id} out of range (0-{ALERT_MAX})"
        )));
    }
    Ok([NOTIF_REQUEST_ID, 0x02, alert_id])
}

/// Build a wireless sidetone feature report.
///
/// # Errors
/// Returns [`Error::InvalidArgument`] if `level` is greater than 55.
pub fn encode_sidetone(level: u8) -> Result<[u8; SIDETONE_REPORT_LEN]> {
    if level > SIDETONE_MAX {
        return Err(Error::InvalidArgument(format!(
            "sidetone level {level} out of range (0-{SIDETONE_MAX})"
        )));
    }

    let mut buf = [0u8; SIDETONE_REPORT_LEN];
    buf[..SIDETONE_HEADER.len()].copy_from_slice(&SIDETONE_HEADER);
    buf[SIDETONE_HEADER.len()] = level + SIDETONE_OFFSET;
    Ok(buf)
}
