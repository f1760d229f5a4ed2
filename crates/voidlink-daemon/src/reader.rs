//! Report reader thread.
//!
//! hidapi reads block, so inbound reports are pulled on a dedicated thread
//! and handed straight to the headset's decode path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use voidlink_hid::transport::MAX_REPORT_LEN;
use voidlink_hid::{Headset, HidResult, Presentation, ReportReader, ReportTransport};

use crate::presentation::SessionEvent;

/// Source of inbound reports.
pub trait ReportSource: Send + 'static {
    /// Wait briefly for a report. `Ok(None)` means nothing arrived in time.
    fn next_report(&mut self, buf: &mut [u8; MAX_REPORT_LEN]) -> HidResult<Option<usize>>;
}

impl ReportSource for ReportReader {
    fn next_report(&mut self, buf: &mut [u8; MAX_REPORT_LEN]) -> HidResult<Option<usize>> {
        self.read(buf)
    }
}

/// Handle to a running reader thread.
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Stop the thread and wait for it. Blocks for up to one read timeout.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("Report reader thread panicked");
        }
    }
}

/// Spawn the reader thread for a bound headset.
///
/// When the source fails the thread exits and reports
/// [`SessionEvent::ReceiverLost`].
pub fn spawn<S, T, P>(
    mut source: S,
    headset: Arc<Headset<T, P>>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Result<ReaderHandle>
where
    S: ReportSource,
    T: ReportTransport,
    P: Presentation,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let thread = std::thread::Builder::new()
        .name("voidlink-reports".to_string())
        .spawn(move || {
            info!("Report reader started");
            let mut buf = [0u8; MAX_REPORT_LEN];
            while !stop_flag.load(Ordering::Acquire) {
                match source.next_report(&mut buf) {
                    Ok(Some(len)) => headset.handle_report(&buf[..len]),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "Report read failed");
                        let _ = events.send(SessionEvent::ReceiverLost { reason: e.to_string() });
                        break;
                    }
                }
            }
            debug!("Report reader exiting");
        })
        .context("Failed to spawn report reader thread")?;

    Ok(ReaderHandle { stop, thread: Some(thread) })
}
