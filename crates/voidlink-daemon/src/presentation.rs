//! Presentation layer that forwards headset changes to the daemon loop.

use tokio::sync::mpsc;
use tracing::{debug, info};
use voidlink_core::{BatteryInfo, Firmware, HeadsetEvent};
use voidlink_hid::{HidResult, Presentation};

/// Events processed by the daemon's session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Headset(HeadsetEvent),
    BatteryRegistered { name: String },
    BatteryUnregistered { name: String },
    /// The report reader stopped because the receiver went away.
    ReceiverLost { reason: String },
}

/// A battery object announced to the daemon.
#[derive(Debug)]
pub struct BatteryRegistration {
    name: String,
}

/// [`Presentation`] that turns callbacks into [`SessionEvent`]s.
pub struct DaemonPresentation {
    battery_name: String,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl DaemonPresentation {
    #[must_use]
    pub fn new(serial: &str, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { battery_name: format!("voidlink-battery-{serial}"), events }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Session loop gone, dropping event");
        }
    }
}

impl Presentation for DaemonPresentation {
    type Battery = BatteryRegistration;

    fn register_battery(&self) -> HidResult<BatteryRegistration> {
        let name = self.battery_name.clone();
        info!(name = %name, "Registering battery");
        self.emit(SessionEvent::BatteryRegistered { name: name.clone() });
        Ok(BatteryRegistration { name })
    }

    fn unregister_battery(&self, battery: BatteryRegistration) {
        info!(name = %battery.name, "Unregistering battery");
        self.emit(SessionEvent::BatteryUnregistered { name: battery.name });
    }

    fn battery_changed(&self, battery: &BatteryInfo) {
        self.emit(SessionEvent::Headset(HeadsetEvent::BatteryChanged(*battery)));
    }

    fn presence_changed(&self, connected: bool) {
        let event = if connected { HeadsetEvent::Connected } else { HeadsetEvent::Disconnected };
        self.emit(SessionEvent::Headset(event));
    }

    fn firmware_changed(&self, firmware: &Firmware) {
        self.emit(SessionEvent::Headset(HeadsetEvent::FirmwareChanged(*firmware)));
    }
}
