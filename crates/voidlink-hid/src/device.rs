//! Receiver detection and opening.

use hidapi::HidApi;
use tracing::{debug, info};

use crate::error::{HidError, HidResult};
use crate::transport::{HidApiTransport, ReportReader};

/// Corsair USB Vendor ID
pub const CORSAIR_VID: u16 = 0x1b1c;
/// Void Pro wireless receiver USB Product ID
pub const VOID_PRO_WIRELESS_PID: u16 = 0x0a14;

/// A wireless receiver found on the USB bus.
#[derive(Debug, Clone)]
pub struct Receiver {
    vendor_id: u16,
    product_id: u16,
    bus: u8,
    address: u8,
    serial: String,
}

impl Receiver {
    /// Look for a receiver with the given ids.
    ///
    /// # Errors
    /// Returns an error if the USB bus could not be enumerated.
    pub fn detect(vendor_id: u16, product_id: u16) -> HidResult<Option<Self>> {
        let devices = rusb::devices()?;

        for device in devices.iter() {
            let Ok(desc) = device.device_descriptor() else {
                continue;
            };

            if desc.vendor_id() == vendor_id && desc.product_id() == product_id {
                let serial = Self::get_usb_serial(&device).unwrap_or_else(|| "unknown".to_string());

                info!(
                    serial = %serial,
                    bus = device.bus_number(),
                    address = device.address(),
                    "Receiver detected via USB"
                );

                return Ok(Some(Self {
                    vendor_id,
                    product_id,
                    bus: device.bus_number(),
                    address: device.address(),
                    serial,
                }));
            }
        }

        debug!(vendor_id, product_id, "No receiver found");
        Ok(None)
    }

    /// Get the serial number from a USB device.
    fn get_usb_serial<T: rusb::UsbContext>(device: &rusb::Device<T>) -> Option<String> {
        let desc = device.device_descriptor().ok()?;
        let handle = device.open().ok()?;

        if desc.serial_number_string_index().is_some() {
            handle.read_serial_number_string_ascii(&desc).ok()
        } else {
            None
        }
    }

    /// Open the receiver's HID interface as a writer and a reader.
    ///
    /// The two handles are independent so a blocking read never holds up
    /// an outbound command.
    ///
    /// # Errors
    /// Returns an error if hidapi cannot open the device.
    pub fn open(&self, read_timeout_ms: i32) -> HidResult<(HidApiTransport, ReportReader)> {
        let api = HidApi::new()?;
        let writer = api.open(self.vendor_id, self.product_id).map_err(map_open_error)?;
        let reader = api.open(self.vendor_id, self.product_id).map_err(map_open_error)?;

        debug!(serial = %self.serial, "Receiver opened");
        Ok((HidApiTransport::new(writer), ReportReader::new(reader, read_timeout_ms)))
    }

    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    #[must_use]
    pub fn bus(&self) -> u8 {
        self.bus
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }
}

fn map_open_error(error: hidapi::HidError) -> HidError {
    match &error {
        hidapi::HidError::HidApiError { message } if message.contains("Permission denied") => {
            HidError::PermissionDenied
        }
        _ => HidError::HidApi(error),
    }
}
