//! Battery object lifecycle.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::presentation::Presentation;

/// The registered battery object, if any.
///
/// Creation and destruction run as independent deferred work and can race
/// each other or an unbind, so both are no-ops when the handle is already in
/// the requested state.
pub struct BatteryObject<P: Presentation> {
    handle: Mutex<Option<P::Battery>>,
}

impl<P: Presentation> Default for BatteryObject<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Presentation> BatteryObject<P> {
    #[must_use]
    pub fn new() -> Self {
        Self { handle: Mutex::new(None) }
    }

    /// Unregister the battery object if one exists.
    ///
    /// Returns `true` if an object was unregistered.
    pub fn destroy(&self, presentation: &P) -> bool {
        let Some(battery) = self.handle.lock().take() else {
            debug!("No battery object to unregister");
            return false;
        };

        presentation.unregister_battery(battery);
        info!("Battery object unregistered");
        true
    }

    /// Register or unregister so the object exists exactly when `want`
    /// says it should.
    ///
    /// `want` is evaluated while the handle is locked, so concurrent calls
    /// are applied one at a time and the last one sees the newest state.
    /// Returns `true` if the registration changed.
    pub fn sync(&self, presentation: &P, want: impl FnOnce() -> bool) -> bool {
        let mut handle = self.handle.lock();
        let want = want();
        match (want, handle.take()) {
            (true, None) => Self::register(&mut *handle, presentation),
            (false, Some(battery)) => {
                presentation.unregister_battery(battery);
                info!("Battery object unregistered");
                true
            }
            (_, current) => {
                *handle = current;
                debug!(registered = want, "Battery object already in place");
                false
            }
        }
    }

    fn register(handle: &mut Option<P::Battery>, presentation: &P) -> bool {
        match presentation.register_battery() {
            Ok(battery) => {
                *handle = Some(battery);
                info!("Battery object registered");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to register battery object");
                false
            }
        }
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.handle.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPresentation;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_destroy_is_idempotent() {
        let presentation = RecordingPresentation::default();
        let battery = BatteryObject::new();

        assert!(!battery.destroy(&presentation));
        battery.sync(&presentation, || true);
        assert!(battery.destroy(&presentation));
        assert!(!battery.destroy(&presentation));

        assert!(!battery.is_registered());
        assert_eq!(presentation.unregistered(), 1);
    }

    #[test]
    fn test_failed_registration_leaves_no_handle() {
        let presentation = RecordingPresentation::default();
        presentation.fail_registration(true);
        let battery = BatteryObject::new();

        assert!(!battery.sync(&presentation, || true));
        assert!(!battery.is_registered());

        presentation.fail_registration(false);
        assert!(battery.sync(&presentation, || true));
    }

    #[test]
    fn test_sync_follows_wanted_state() {
        let presentation = RecordingPresentation::default();
        let battery = BatteryObject::new();

        assert!(battery.sync(&presentation, || true));
        assert!(!battery.sync(&presentation, || true));
        assert!(battery.is_registered());

        assert!(battery.sync(&presentation, || false));
        assert!(!battery.sync(&presentation, || false));
        assert!(!battery.is_registered());

        assert_eq!(presentation.registered(), 1);
        assert_eq!(presentation.unregistered(), 1);
    }

    #[test]
    fn test_sync_holds_off_other_callers_while_deciding() {
        let presentation = Arc::new(RecordingPresentation::default());
        let battery = Arc::new(BatteryObject::<RecordingPresentation>::new());
        let connected = Arc::new(AtomicBool::new(true));
        let (checked_tx, checked_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel::<()>();

        // A create that has read "connected" but not yet acted on it.
        let creating = {
            let (presentation, battery, connected) =
                (Arc::clone(&presentation), Arc::clone(&battery), Arc::clone(&connected));
            std::thread::spawn(move || {
                battery.sync(presentation.as_ref(), || {
                    let want = connected.load(Ordering::SeqCst);
                    checked_tx.send(()).unwrap();
                    resume_rx.recv().unwrap();
                    want
                })
            })
        };
        checked_rx.recv().unwrap();

        // The link drops and a destroy starts in the meantime.
        connected.store(false, Ordering::SeqCst);
        let destroy_done = Arc::new(AtomicBool::new(false));
        let destroying = {
            let (presentation, battery, connected, done) = (
                Arc::clone(&presentation),
                Arc::clone(&battery),
                Arc::clone(&connected),
                Arc::clone(&destroy_done),
            );
            std::thread::spawn(move || {
                battery.sync(presentation.as_ref(), || connected.load(Ordering::SeqCst));
                done.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!destroy_done.load(Ordering::SeqCst));

        resume_tx.send(()).unwrap();
        assert!(creating.join().unwrap());
        destroying.join().unwrap();

        assert!(!battery.is_registered());
        assert_eq!(presentation.registered(), 1);
        assert_eq!(presentation.unregistered(), 1);
    }
}
