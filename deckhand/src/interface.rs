//! The production transport over [`hidapi`](https://docs.rs/hidapi), an
//! abstraction over the [libusb/hidapi](https://github.com/libusb/hidapi) C
//! library providing cross-platform access to HID devices.

use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use hidapi::{HidApi, HidDevice};

use crate::Error;
use crate::hid::{DeviceInfo, HidBackend, HidHandle};

/// How often a blocked read wakes up to check whether the handle was
/// closed. Kept short: the device mutex is held for the duration of one
/// poll, so this bounds how long a write can wait behind the reader.
const READ_POLL_MS: i32 = 50;

fn transport(err: hidapi::HidError) -> Error {
    Error::transport(err)
}

/// [`HidBackend`] over a shared `hidapi` context.
pub struct HidApiBackend {
    api: Mutex<HidApi>,
}

impl HidApiBackend {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            api: Mutex::new(HidApi::new().map_err(transport)?),
        })
    }

    /// Boxes the backend for use with [`crate::Registry`].
    pub fn shared() -> Result<Arc<dyn HidBackend>, Error> {
        Ok(Arc::new(Self::new()?))
    }
}

impl HidBackend for HidApiBackend {
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<DeviceInfo>, Error> {
        let mut api = self.api.lock().unwrap();
        api.refresh_devices().map_err(transport)?;
        Ok(api
            .device_list()
            .filter(|device| {
                device.vendor_id() == vendor_id
                    && (product_id == 0 || device.product_id() == product_id)
            })
            .map(|device| DeviceInfo {
                vendor_id: device.vendor_id(),
                product_id: device.product_id(),
                path: device.path().to_string_lossy().into_owned(),
                serial: device.serial_number().unwrap_or_default().to_owned(),
                manufacturer: device.manufacturer_string().unwrap_or_default().to_owned(),
                product: device.product_string().unwrap_or_default().to_owned(),
            })
            .collect())
    }

    fn open(&self, info: &DeviceInfo) -> Result<Arc<dyn HidHandle>, Error> {
        let api = self.api.lock().unwrap();
        let path = CString::new(info.path.as_bytes()).map_err(Error::transport)?;
        let device = api.open_path(&path).map_err(transport)?;
        Ok(Arc::new(HidApiHandle {
            device: Mutex::new(device),
            closed: AtomicBool::new(false),
        }))
    }
}

struct HidApiHandle {
    device: Mutex<HidDevice>,
    closed: AtomicBool,
}

impl HidHandle for HidApiHandle {
    fn read(&self, buf: &mut [u8]) -> Result<usize, Error> {
        // hidapi has no interruptible blocking read, so poll with a timeout
        // and watch the closed flag between polls. The device lock is
        // released between polls to let writes through.
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(Error::Closed);
            }
            let n = {
                let device = self.device.lock().unwrap();
                device.read_timeout(buf, READ_POLL_MS).map_err(transport)?
            };
            if n > 0 {
                return Ok(n);
            }
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize, Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        self.device.lock().unwrap().write(buf).map_err(transport)
    }

    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        self.device
            .lock()
            .unwrap()
            .get_feature_report(buf)
            .map_err(transport)
    }

    fn send_feature_report(&self, buf: &[u8]) -> Result<(), Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        self.device
            .lock()
            .unwrap()
            .send_feature_report(buf)
            .map_err(transport)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
