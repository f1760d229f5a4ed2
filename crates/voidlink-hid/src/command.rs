//! User commands sent to the headset.

use tracing::{info, warn};
use voidlink_core::DeviceState;
use voidlink_core::protocol::{NOTIF_REQUEST_ID, SIDETONE_REQUEST_ID, encode_alert, encode_sidetone};

use crate::error::{HidError, HidResult};
use crate::transport::ReportTransport;

/// Play alert tone `alert_id` (0 or 1) on the headset.
///
/// # Errors
/// Returns [`HidError::Protocol`] for an out-of-range id,
/// [`HidError::NotConnected`] without a headset link, and
/// [`HidError::TransportFailure`] if the command could not be written.
pub fn send_alert<T: ReportTransport + ?Sized>(
    state: &DeviceState,
    transport: &T,
    alert_id: u8,
) -> HidResult<()> {
    let report = encode_alert(alert_id)?;
    ensure_connected(state)?;

    transport.write_output(&report).map_err(|e| surface(NOTIF_REQUEST_ID, e))?;
    info!(alert_id, "Alert sent");
    Ok(())
}

/// Set the sidetone level (0-55).
///
/// # Errors
/// Returns [`HidError::Protocol`] for an out-of-range level,
/// [`HidError::NotConnected`] without a headset link, and
/// [`HidError::TransportFailure`] if the command could not be written.
pub fn set_sidetone<T: ReportTransport + ?Sized>(
    state: &DeviceState,
    transport: &T,
    level: u8,
) -> HidResult<()> {
    let report = encode_sidetone(level)?;
    ensure_connected(state)?;

    transport.write_feature(&report).map_err(|e| surface(SIDETONE_REQUEST_ID, e))?;
    info!(level, "Sidetone set");
    Ok(())
}

fn ensure_connected(state: &DeviceState) -> HidResult<()> {
    if state.connected { Ok(()) } else { Err(HidError::NotConnected) }
}

fn surface(report_id: u8, error: HidError) -> HidError {
    warn!(report_id, error = %error, "Command write failed");
    match error {
        HidError::TransportFailure { .. } => error,
        other => HidError::transport(report_id, other),
    }
}
