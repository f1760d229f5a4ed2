//! Battery status mapping.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::protocol::RawBatteryReport;

/// Charging state as exposed to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    #[default]
    Unknown,
    Discharging,
    Charging,
    Full,
}

/// Coarse battery bucket, independent of the numeric capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityLevel {
    #[default]
    Unknown,
    Critical,
    Low,
    Normal,
}

/// Everything known about the headset battery.
///
/// A record with `present == false` is always the all-unknown default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryInfo {
    pub status: BatteryStatus,
    pub present: bool,
    /// Percentage, 0-100
    pub capacity: u8,
    pub capacity_level: CapacityLevel,
}

impl BatteryInfo {
    /// The record used whenever battery data is unavailable.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Derive the battery record from a status report.
    ///
    /// Unrecognised status codes are logged and mapped to [`BatteryInfo::unknown`].
    #[must_use]
    pub fn from_report(report: &RawBatteryReport) -> Self {
        match Self::try_from_report(report) {
            Ok(info) => info,
            Err(e) => {
                warn!(
                    error = %e,
                    connection_code = report.connection_code,
                    "Treating battery data as unknown"
                );
                Self::unknown()
            }
        }
    }

    /// Derive the battery record, failing on an unrecognised status code.
    ///
    /// # Errors
    /// Returns [`Error::UnknownStatusCode`] when the headset is connected but
    /// reports a status code outside 0-5.
    pub fn try_from_report(report: &RawBatteryReport) -> Result<Self> {
        if !report.is_connected() || report.battery_status_code == 0 {
            return Ok(Self::unknown());
        }

        let (status, capacity_level) = match report.battery_status_code {
            1 => (BatteryStatus::Discharging, CapacityLevel::Normal),
            2 => (BatteryStatus::Discharging, CapacityLevel::Low),
            3 => (BatteryStatus::Discharging, CapacityLevel::Critical),
            4 => (BatteryStatus::Full, CapacityLevel::Normal),
            5 => (BatteryStatus::Charging, CapacityLevel::Normal),
            code => return Err(Error::UnknownStatusCode(code)),
        };

        Ok(Self {
            status,
            present: true,
            capacity: report.battery_capacity.min(100),
            capacity_level,
        })
    }
}
