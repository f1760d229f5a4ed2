//! Voidlink HID - Corsair Void receiver driver.
//!
//! This crate binds a wireless receiver, feeds its inbound reports through
//! the `voidlink-core` decoder, and keeps the resulting headset state current.
//! It owns the stateful parts of the driver: the connection state machine,
//! deferred refresh queries, the battery object lifecycle, and user commands.
//!
//! Transport (hidapi) and scheduling (tokio) sit behind the
//! [`ReportTransport`] and [`WorkScheduler`] traits.

pub mod battery;
pub mod command;
pub mod device;
pub mod error;
pub mod headset;
pub mod presentation;
pub mod query;
pub mod scheduler;
#[cfg(test)]
mod testing;
pub mod transport;

pub use device::Receiver;
pub use error::{HidError, HidResult};
pub use headset::Headset;
pub use presentation::Presentation;
pub use scheduler::{TokioScheduler, WorkKind, WorkScheduler};
pub use transport::{HidApiTransport, ReportReader, ReportTransport};
