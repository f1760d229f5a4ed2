//! JSON status snapshot for external readers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{debug, warn};
use voidlink_core::DeviceState;
use voidlink_core::protocol::SIDETONE_MAX;

/// Render the device state the way external readers consume it.
///
/// Unknown firmware versions are `null` rather than `0.00`.
#[must_use]
pub fn status_json(state: &DeviceState, battery_registered: bool) -> Value {
    json!({
        "connected": state.connected,
        "mic_up": state.mic_up,
        "battery": state.battery,
        "battery_registered": battery_registered,
        "firmware": {
            "receiver": state.firmware.receiver.known().map(|v| v.to_string()),
            "headset": state.firmware.headset.known().map(|v| v.to_string()),
        },
        "sidetone_max": SIDETONE_MAX,
    })
}

/// Rewrites the status file on every change, if one is configured.
pub struct StatusWriter {
    path: Option<PathBuf>,
}

impl StatusWriter {
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Publish a snapshot. Failures are logged, never fatal.
    pub async fn publish(&self, state: &DeviceState, battery_registered: bool) {
        let Some(path) = &self.path else {
            return;
        };

        if let Err(e) = write_atomic(path, &status_json(state, battery_registered)).await {
            warn!(?path, error = %e, "Failed to write status file");
        } else {
            debug!(?path, "Status file updated");
        }
    }

    /// Remove the status file when the receiver goes away.
    pub async fn clear(&self) {
        let Some(path) = &self.path else {
            return;
        };

        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(?path, "Status file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(?path, error = %e, "Failed to remove status file"),
        }
    }
}

async fn write_atomic(path: &Path, value: &Value) -> Result<()> {
    let content = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("tmp");

    tokio::fs::write(&tmp, content)
        .await
        .with_context(|| format!("Failed to write {tmp:?}"))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {path:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voidlink_core::{BatteryInfo, BatteryStatus, CapacityLevel, Firmware, FirmwareVersion};

    fn connected_state() -> DeviceState {
        DeviceState {
            connected: true,
            mic_up: true,
            battery: BatteryInfo {
                status: BatteryStatus::Charging,
                present: true,
                capacity: 42,
                capacity_level: CapacityLevel::Normal,
            },
            firmware: Firmware {
                receiver: FirmwareVersion::new(2, 11),
                headset: FirmwareVersion::UNKNOWN,
            },
        }
    }

    #[test]
    fn test_status_json_shape() {
        let value = status_json(&connected_state(), true);

        assert_eq!(value["connected"], true);
        assert_eq!(value["mic_up"], true);
        assert_eq!(value["battery"]["status"], "charging");
        assert_eq!(value["battery"]["capacity"], 42);
        assert_eq!(value["battery"]["capacity_level"], "normal");
        assert_eq!(value["battery_registered"], true);
        assert_eq!(value["firmware"]["receiver"], "2.11");
        assert_eq!(value["firmware"]["headset"], Value::Null);
        assert_eq!(value["sidetone_max"], 55);
    }

    #[tokio::test]
    async fn test_publish_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        let writer = StatusWriter::new(Some(path.clone()));

        writer.publish(&connected_state(), false).await;

        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, status_json(&connected_state(), false));
        assert!(!path.with_extension("tmp").exists());

        writer.clear().await;
        assert!(!path.exists());
        writer.clear().await;
    }

    #[tokio::test]
    async fn test_disabled_writer_is_noop() {
        let writer = StatusWriter::new(None);

        writer.publish(&DeviceState::default(), false).await;
        writer.clear().await;
    }
}
