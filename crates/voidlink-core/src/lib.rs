//! Voidlink Core - Report codec and headset state for Corsair Void receivers.
//!
//! This crate is free of I/O: it decodes inbound reports, builds outbound
//! commands, and defines the device-state model and its transition rules.
//! Scheduling, transport, and battery object lifecycle live in `voidlink-hid`.

pub mod battery;
pub mod error;
pub mod protocol;
pub mod state;

pub use battery::{BatteryInfo, BatteryStatus, CapacityLevel};
pub use error::{Error, Result};
pub use protocol::{InboundReport, RawBatteryReport, RawFirmwareReport};
pub use state::{ConnectionEdge, DeviceState, Firmware, FirmwareVersion, HeadsetEvent, StatusUpdate};
