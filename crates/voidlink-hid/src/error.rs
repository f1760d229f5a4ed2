//! HID error types.

use thiserror::Error;

/// HID error type.
#[derive(Debug, Error)]
pub enum HidError {
    #[error("Permission denied - check udev rules")]
    PermissionDenied,

    #[error("Headset not connected to receiver")]
    NotConnected,

    #[error("Transport failure on report {report_id:#04x}: {reason}")]
    TransportFailure { report_id: u8, reason: String },

    #[error("Headset has been unbound")]
    Unbound,

    #[error("USB error: {0}")]
    UsbError(#[from] rusb::Error),

    #[error("hidapi error: {0}")]
    HidApi(#[from] hidapi::HidError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] voidlink_core::Error),
}

impl HidError {
    /// Wrap a lower-level failure as a transport failure for `report_id`.
    pub fn transport(report_id: u8, reason: impl ToString) -> Self {
        Self::TransportFailure { report_id, reason: reason.to_string() }
    }
}

/// Result type for HID operations.
pub type HidResult<T> = Result<T, HidError>;
