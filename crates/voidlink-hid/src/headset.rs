//! A bound receiver and its headset.
//!
//! [`Headset`] owns the device state for one receiver. Inbound reports are
//! decoded on the caller's thread (the report delivery path) and update the
//! state immediately; anything slower is deferred to the [`WorkScheduler`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};
use voidlink_core::{
    BatteryInfo, ConnectionEdge, DeviceState, FirmwareVersion, InboundReport, RawBatteryReport,
    RawFirmwareReport,
};

use crate::battery::BatteryObject;
use crate::command;
use crate::error::{HidError, HidResult};
use crate::presentation::Presentation;
use crate::query::{BIND_QUERIES, RECONNECT_QUERIES, schedule_queries};
use crate::scheduler::{WorkKind, WorkScheduler};
use crate::transport::ReportTransport;

/// A bound receiver.
///
/// Dropping the headset unbinds it.
pub struct Headset<T: ReportTransport, P: Presentation> {
    shared: Arc<Shared<T, P>>,
}

struct Shared<T: ReportTransport, P: Presentation> {
    transport: Arc<T>,
    presentation: Arc<P>,
    scheduler: Arc<dyn WorkScheduler>,
    /// Written only under `decode`; readers take snapshots.
    state: ArcSwap<DeviceState>,
    battery: BatteryObject<P>,
    decode: Mutex<()>,
    unbound: AtomicBool,
}

impl<T: ReportTransport, P: Presentation> Headset<T, P> {
    /// Bind a receiver and queue the initial battery and firmware queries.
    pub fn bind(transport: Arc<T>, presentation: Arc<P>, scheduler: Arc<dyn WorkScheduler>) -> Self {
        let shared = Arc::new(Shared {
            transport,
            presentation,
            scheduler,
            state: ArcSwap::from_pointee(DeviceState::default()),
            battery: BatteryObject::new(),
            decode: Mutex::new(()),
            unbound: AtomicBool::new(false),
        });

        schedule_queries(shared.scheduler.as_ref(), &shared.transport, &BIND_QUERIES);
        info!("Receiver bound");

        Self { shared }
    }

    /// Decode and apply one inbound report (report id in the first byte).
    ///
    /// Malformed and unrecognised reports are logged and dropped.
    pub fn handle_report(&self, buf: &[u8]) {
        self.shared.handle_report(buf);
    }

    /// Snapshot of the current device state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DeviceState> {
        self.shared.state.load_full()
    }

    #[must_use]
    pub fn battery(&self) -> BatteryInfo {
        self.shared.state.load().battery
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.state.load().connected
    }

    #[must_use]
    pub fn mic_up(&self) -> bool {
        self.shared.state.load().mic_up
    }

    /// Receiver firmware, or `None` until the receiver has reported it.
    #[must_use]
    pub fn receiver_firmware(&self) -> Option<FirmwareVersion> {
        self.shared.state.load().firmware.receiver.known()
    }

    /// Headset firmware, or `None` while disconnected or not yet reported.
    #[must_use]
    pub fn headset_firmware(&self) -> Option<FirmwareVersion> {
        self.shared.state.load().firmware.headset.known()
    }

    /// Whether the battery object is currently registered.
    #[must_use]
    pub fn has_battery_object(&self) -> bool {
        self.shared.battery.is_registered()
    }

    /// Play alert tone 0 or 1.
    ///
    /// # Errors
    /// See [`command::send_alert`]; returns [`HidError::Unbound`] after unbind.
    pub fn send_alert(&self, alert_id: u8) -> HidResult<()> {
        self.ensure_bound()?;
        command::send_alert(&self.shared.state.load(), self.shared.transport.as_ref(), alert_id)
    }

    /// Set the sidetone level (0-55).
    ///
    /// # Errors
    /// See [`command::set_sidetone`]; returns [`HidError::Unbound`] after unbind.
    pub fn set_sidetone(&self, level: u8) -> HidResult<()> {
        self.ensure_bound()?;
        command::set_sidetone(&self.shared.state.load(), self.shared.transport.as_ref(), level)
    }

    /// Unbind the receiver.
    ///
    /// Cancels queued work and waits for running work before unregistering
    /// the battery object. Reports and commands are refused afterwards.
    /// Blocks the calling thread; do not call from inside deferred work.
    pub fn unbind(&self) {
        if self.shared.unbound.swap(true, Ordering::AcqRel) {
            return;
        }

        // Let an in-flight report finish before tearing anything down.
        drop(self.shared.decode.lock());

        self.shared.scheduler.cancel_all_sync();
        self.shared.battery.destroy(&self.shared.presentation);
        info!("Receiver unbound");
    }

    fn ensure_bound(&self) -> HidResult<()> {
        if self.shared.unbound.load(Ordering::Acquire) { Err(HidError::Unbound) } else { Ok(()) }
    }
}

impl<T: ReportTransport, P: Presentation> Drop for Headset<T, P> {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl<T: ReportTransport, P: Presentation> Shared<T, P> {
    fn handle_report(self: &Arc<Self>, buf: &[u8]) {
        let _decode = self.decode.lock();
        if self.unbound.load(Ordering::Acquire) {
            trace!("Ignoring report after unbind");
            return;
        }

        match InboundReport::parse(buf) {
            Ok(InboundReport::Battery(report)) => self.on_battery_report(&report),
            Ok(InboundReport::Firmware(report)) => self.on_firmware_report(&report),
            Ok(InboundReport::Other(report_id)) => {
                debug!(report_id, len = buf.len(), "Ignoring unhandled report");
            }
            Err(e) => warn!(error = %e, "Dropping malformed report"),
        }
    }

    fn on_battery_report(self: &Arc<Self>, report: &RawBatteryReport) {
        let previous = self.state.load_full();
        let mut next = DeviceState::clone(&previous);
        let update = next.apply_battery_report(report);
        let next = Arc::new(next);
        self.state.store(Arc::clone(&next));

        trace!(
            connection_code = report.connection_code,
            status_code = report.battery_status_code,
            capacity = report.battery_capacity,
            mic_up = report.mic_up,
            power_button = report.power_button_pressed,
            "Status report"
        );

        match update.edge {
            Some(ConnectionEdge::Connected) => {
                info!("Headset connected");
                self.schedule_battery_object(WorkKind::CreateBattery);
                schedule_queries(self.scheduler.as_ref(), &self.transport, &RECONNECT_QUERIES);
                self.presentation.presence_changed(true);
            }
            Some(ConnectionEdge::Disconnected) => {
                info!("Headset disconnected");
                self.schedule_battery_object(WorkKind::DestroyBattery);
                self.presentation.presence_changed(false);
            }
            None => {}
        }

        if next.firmware != previous.firmware {
            self.presentation.firmware_changed(&next.firmware);
        }

        if update.battery_changed {
            debug!(
                status = ?next.battery.status,
                capacity = next.battery.capacity,
                level = ?next.battery.capacity_level,
                "Battery changed"
            );
            self.presentation.battery_changed(&next.battery);
        }
    }

    fn on_firmware_report(&self, report: &RawFirmwareReport) {
        let mut next = DeviceState::clone(&self.state.load());
        if !next.apply_firmware_report(report) {
            return;
        }

        info!(
            receiver = %next.firmware.receiver,
            headset = %next.firmware.headset,
            "Firmware versions updated"
        );
        let firmware = next.firmware;
        self.state.store(Arc::new(next));
        self.presentation.firmware_changed(&firmware);
    }

    fn schedule_battery_object(self: &Arc<Self>, kind: WorkKind) {
        let shared = Arc::downgrade(self);
        self.scheduler.schedule(
            kind,
            Duration::ZERO,
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.sync_battery_object(kind);
                }
            }),
        );
    }

    /// Deferred create/destroy. Both converge on the link state read under
    /// the battery handle lock, so reordered or overlapping work cannot
    /// leave a stale registration behind.
    fn sync_battery_object(&self, kind: WorkKind) {
        if self.unbound.load(Ordering::Acquire) {
            return;
        }

        let changed = self.battery.sync(&self.presentation, || self.state.load().connected);
        if !changed {
            debug!(?kind, "Battery object already matches link state");
        }
    }
}
