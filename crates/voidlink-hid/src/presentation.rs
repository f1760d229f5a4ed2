//! Presentation layer contract.
//!
//! The headset pushes changes into an implementation of [`Presentation`] and
//! owns the battery object it registers there. Read access goes through the
//! accessors on [`crate::Headset`].

use voidlink_core::{BatteryInfo, Firmware};

use crate::error::HidResult;

/// Consumer of decoded headset state.
///
/// Callbacks may arrive from the report delivery path or from worker
/// threads, so implementations must not block for long.
pub trait Presentation: Send + Sync + 'static {
    /// Handle of a registered battery object.
    type Battery: Send + 'static;

    /// Register the externally visible battery object.
    ///
    /// # Errors
    /// Returns an error if registration failed; the headset retries on the
    /// next connect.
    fn register_battery(&self) -> HidResult<Self::Battery>;

    /// Unregister a battery object previously returned by `register_battery`.
    fn unregister_battery(&self, battery: Self::Battery);

    /// The battery record differs from the last one published.
    fn battery_changed(&self, battery: &BatteryInfo);

    /// The receiver-to-headset link came up or went down.
    fn presence_changed(&self, connected: bool);

    /// Receiver or headset firmware versions changed.
    fn firmware_changed(&self, firmware: &Firmware) {
        let _ = firmware;
    }
}
