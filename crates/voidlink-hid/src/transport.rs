//! Report transport.
//!
//! Outbound reports carry their report id in the first byte, the way hidapi
//! expects them. Inbound reports are read by the owner of a [`ReportReader`]
//! and handed to [`crate::Headset::handle_report`].

use hidapi::HidDevice;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::{HidError, HidResult};

/// Largest report the receiver sends.
pub const MAX_REPORT_LEN: usize = 64;

/// Synchronous sink for outbound reports.
#[cfg_attr(test, mockall::automock)]
pub trait ReportTransport: Send + Sync + 'static {
    /// Send an output report (status queries, alerts).
    ///
    /// # Errors
    /// Returns an error if the report could not be written in full.
    fn write_output(&self, data: &[u8]) -> HidResult<()>;

    /// Send a feature report (sidetone).
    ///
    /// # Errors
    /// Returns an error if the device rejected the report.
    fn write_feature(&self, data: &[u8]) -> HidResult<()>;
}

fn report_id(data: &[u8]) -> u8 {
    data.first().copied().unwrap_or_default()
}

/// hidapi-backed transport for outbound reports.
pub struct HidApiTransport {
    device: Mutex<HidDevice>,
}

impl HidApiTransport {
    #[must_use]
    pub fn new(device: HidDevice) -> Self {
        Self { device: Mutex::new(device) }
    }
}

impl ReportTransport for HidApiTransport {
    fn write_output(&self, data: &[u8]) -> HidResult<()> {
        let id = report_id(data);
        let written = self.device.lock().write(data).map_err(|e| HidError::transport(id, e))?;

        if written != data.len() {
            return Err(HidError::transport(
                id,
                format!("short write: {written} of {} bytes", data.len()),
            ));
        }

        trace!(report_id = id, len = data.len(), "Output report written");
        Ok(())
    }

    fn write_feature(&self, data: &[u8]) -> HidResult<()> {
        let id = report_id(data);
        self.device.lock().send_feature_report(data).map_err(|e| HidError::transport(id, e))?;

        trace!(report_id = id, len = data.len(), "Feature report written");
        Ok(())
    }
}

/// Blocking reader for inbound reports.
pub struct ReportReader {
    device: HidDevice,
    timeout_ms: i32,
}

impl ReportReader {
    #[must_use]
    pub fn new(device: HidDevice, timeout_ms: i32) -> Self {
        Self { device, timeout_ms }
    }

    /// Wait up to the configured timeout for the next report.
    ///
    /// Returns `Ok(None)` when the timeout elapsed without a report.
    ///
    /// # Errors
    /// Returns an error if the device is gone or the read failed.
    pub fn read(&self, buf: &mut [u8; MAX_REPORT_LEN]) -> HidResult<Option<usize>> {
        let len = self.device.read_timeout(buf, self.timeout_ms)?;
        Ok((len > 0).then_some(len))
    }
}
