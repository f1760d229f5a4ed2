//! In-memory collaborators for tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use parking_lot::Mutex;
use voidlink_core::{BatteryInfo, Firmware};

use crate::error::{HidError, HidResult};
use crate::presentation::Presentation;
use crate::scheduler::{Job, WorkKind, WorkScheduler};
use crate::transport::ReportTransport;

/// Scheduler that only runs work when told to.
#[derive(Default)]
pub struct ManualScheduler {
    inner: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    cancelled: bool,
    queue: Vec<(WorkKind, Duration, Job)>,
}

impl ManualScheduler {
    /// Kinds and delays of queued work, in submission order.
    pub fn queued(&self) -> Vec<(WorkKind, Duration)> {
        self.inner.lock().queue.iter().map(|(kind, delay, _)| (*kind, *delay)).collect()
    }

    /// Run queued work in delay order until the queue is empty.
    pub fn run_all(&self) -> usize {
        let mut count = 0;
        loop {
            let mut batch = std::mem::take(&mut self.inner.lock().queue);
            if batch.is_empty() {
                return count;
            }
            batch.sort_by_key(|(_, delay, _)| *delay);
            for (_, _, job) in batch {
                job();
                count += 1;
            }
        }
    }

    /// Remove the first queued job of `kind` so the test can run it on a
    /// thread of its choosing.
    pub fn take(&self, kind: WorkKind) -> Option<Job> {
        let mut inner = self.inner.lock();
        let index = inner.queue.iter().position(|(queued, _, _)| *queued == kind)?;
        Some(inner.queue.remove(index).2)
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }
}

impl WorkScheduler for ManualScheduler {
    fn schedule(&self, kind: WorkKind, delay: Duration, job: Job) -> bool {
        let mut inner = self.inner.lock();
        if inner.cancelled {
            return false;
        }
        if kind.coalesces() && inner.queue.iter().any(|(queued, _, _)| *queued == kind) {
            return false;
        }
        inner.queue.push((kind, delay, job));
        true
    }

    fn cancel_all_sync(&self) {
        let mut inner = self.inner.lock();
        inner.cancelled = true;
        inner.queue.clear();
    }
}

/// Transport that records successful writes.
#[derive(Default)]
pub struct RecordingTransport {
    outputs: Mutex<Vec<Vec<u8>>>,
    features: Mutex<Vec<Vec<u8>>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn outputs(&self) -> Vec<Vec<u8>> {
        self.outputs.lock().clone()
    }

    pub fn features(&self) -> Vec<Vec<u8>> {
        self.features.lock().clone()
    }

    fn record(&self, log: &Mutex<Vec<Vec<u8>>>, data: &[u8]) -> HidResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HidError::transport(data.first().copied().unwrap_or_default(), "unplugged"));
        }
        log.lock().push(data.to_vec());
        Ok(())
    }
}

impl ReportTransport for RecordingTransport {
    fn write_output(&self, data: &[u8]) -> HidResult<()> {
        self.record(&self.outputs, data)
    }

    fn write_feature(&self, data: &[u8]) -> HidResult<()> {
        self.record(&self.features, data)
    }
}

/// Presentation layer that records every callback.
#[derive(Default)]
pub struct RecordingPresentation {
    next_handle: AtomicU32,
    registered: AtomicU32,
    unregistered: AtomicU32,
    fail_registration: AtomicBool,
    pause: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    battery: Mutex<Vec<BatteryInfo>>,
    presence: Mutex<Vec<bool>>,
    firmware: Mutex<Vec<Firmware>>,
}

impl RecordingPresentation {
    pub fn fail_registration(&self, fail: bool) {
        self.fail_registration.store(fail, Ordering::SeqCst);
    }

    /// Make the next `register_battery` block until released.
    ///
    /// Returns a receiver signalled once registration has started and a
    /// sender that lets it finish.
    pub fn pause_registration(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.pause.lock() = Some((entered_tx, release_rx));
        (entered_rx, release_tx)
    }

    pub fn registered(&self) -> u32 {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn unregistered(&self) -> u32 {
        self.unregistered.load(Ordering::SeqCst)
    }

    pub fn battery_changes(&self) -> Vec<BatteryInfo> {
        self.battery.lock().clone()
    }

    pub fn presence_changes(&self) -> Vec<bool> {
        self.presence.lock().clone()
    }

    pub fn firmware_changes(&self) -> Vec<Firmware> {
        self.firmware.lock().clone()
    }
}

impl Presentation for RecordingPresentation {
    type Battery = u32;

    fn register_battery(&self) -> HidResult<u32> {
        let pause = self.pause.lock().take();
        if let Some((entered, release)) = pause {
            let _ = entered.send(());
            let _ = release.recv();
        }
        if self.fail_registration.load(Ordering::SeqCst) {
            return Err(HidError::PermissionDenied);
        }
        self.registered.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    fn unregister_battery(&self, _battery: u32) {
        self.unregistered.fetch_add(1, Ordering::SeqCst);
    }

    fn battery_changed(&self, battery: &BatteryInfo) {
        self.battery.lock().push(*battery);
    }

    fn presence_changed(&self, connected: bool) {
        self.presence.lock().push(connected);
    }

    fn firmware_changed(&self, firmware: &Firmware) {
        self.firmware.lock().push(*firmware);
    }
}
