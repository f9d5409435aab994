//! The transport boundary between the driver core and the HID plumbing.
//!
//! Everything above this module speaks in terms of [`HidBackend`] and
//! [`HidHandle`] trait objects, so the production `hidapi` implementation in
//! [`crate::interface`] and the mocks used by tests are interchangeable.

use std::fmt;
use std::sync::Arc;

use crate::Error;

/// Identity of an attached HID device, as reported by enumeration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Platform-specific device path, used to open the device.
    pub path: String,
    pub serial: String,
    pub manufacturer: String,
    pub product: String,
}

impl DeviceInfo {
    /// The `vvvv:pppp` USB identity string.
    pub fn usb_id(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.manufacturer, self.product, self.usb_id())
    }
}

/// Enumerates and opens HID devices.
pub trait HidBackend: Send + Sync {
    /// Lists attached devices matching `vendor_id`. A `product_id` of zero
    /// matches any product of that vendor.
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<DeviceInfo>, Error>;

    /// Opens the device at `info.path`.
    fn open(&self, info: &DeviceInfo) -> Result<Arc<dyn HidHandle>, Error>;
}

/// An open HID device.
///
/// Implementations must be safe to share between the session owner and the
/// reader thread: `read` blocks on one thread while `write` and the feature
/// report calls run on another.
pub trait HidHandle: Send + Sync {
    /// Blocks until an input report arrives, the handle is closed, or the
    /// transport fails. Returns the number of bytes read.
    fn read(&self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Writes one output report.
    fn write(&self, buf: &[u8]) -> Result<usize, Error>;

    /// Reads a feature report; `buf[0]` carries the report ID on entry.
    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Sends a feature report.
    fn send_feature_report(&self, buf: &[u8]) -> Result<(), Error>;

    /// Closes the handle. Pending and future reads fail with
    /// [`Error::Closed`]. Idempotent.
    fn close(&self);
}
