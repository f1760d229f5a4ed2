//! Status and firmware refresh requests.
//!
//! Requests are fire-and-forget: the receiver answers later with an ordinary
//! inbound report matched only by its report id. The receiver drops one of
//! two different queries sent back to back, so a firmware query always
//! trails a battery query by [`FIRMWARE_QUERY_DELAY`].

use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, warn};
use voidlink_core::protocol::{FIRMWARE_REPORT_ID, STATUS_REPORT_ID, encode_status_query};

use crate::error::{HidError, HidResult};
use crate::scheduler::{WorkKind, WorkScheduler};
use crate::transport::ReportTransport;

/// Spacing between a battery query and the firmware query that follows it.
pub const FIRMWARE_QUERY_DELAY: Duration = Duration::from_millis(100);

/// A report the receiver can be asked to resend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Battery,
    Firmware,
}

impl Refresh {
    /// Report id to request.
    #[must_use]
    pub fn item_id(self) -> u8 {
        match self {
            Self::Battery => STATUS_REPORT_ID,
            Self::Firmware => FIRMWARE_REPORT_ID,
        }
    }

    #[must_use]
    pub fn kind(self) -> WorkKind {
        match self {
            Self::Battery => WorkKind::RefreshBattery,
            Self::Firmware => WorkKind::RefreshFirmware,
        }
    }
}

/// Queries issued when a receiver is bound.
pub const BIND_QUERIES: [(Refresh, Duration); 2] =
    [(Refresh::Battery, Duration::ZERO), (Refresh::Firmware, FIRMWARE_QUERY_DELAY)];

/// Queries issued when the headset reconnects. Battery data arrives
/// unprompted with the reconnection reports.
pub const RECONNECT_QUERIES: [(Refresh, Duration); 1] = [(Refresh::Firmware, FIRMWARE_QUERY_DELAY)];

/// Ask the receiver to resend report `item_id`.
///
/// No retry is attempted; a later report or reconnect refreshes the data.
///
/// # Errors
/// Returns [`HidError::TransportFailure`] if the query could not be written.
pub fn request_status<T: ReportTransport + ?Sized>(transport: &T, item_id: u8) -> HidResult<()> {
    transport.write_output(&encode_status_query(item_id)).map_err(|e| {
        warn!(item_id, error = %e, "Status request failed");
        match e {
            HidError::TransportFailure { .. } => e,
            other => HidError::transport(item_id, other),
        }
    })?;

    debug!(item_id, "Status requested");
    Ok(())
}

/// Queue `queries` on `scheduler`.
///
/// Jobs hold only a weak reference to the transport, so a query that fires
/// after its headset is gone does nothing.
pub fn schedule_queries<T: ReportTransport>(
    scheduler: &dyn WorkScheduler,
    transport: &Arc<T>,
    queries: &[(Refresh, Duration)],
) {
    for &(refresh, delay) in queries {
        let transport: Weak<T> = Arc::downgrade(transport);
        scheduler.schedule(
            refresh.kind(),
            delay,
            Box::new(move || {
                let Some(transport) = transport.upgrade() else {
                    debug!(?refresh, "Transport gone, skipping refresh");
                    return;
                };
                // Failures are logged by request_status; the data stays unknown.
                let _ = request_status(transport.as_ref(), refresh.item_id());
            }),
        );
    }
}
