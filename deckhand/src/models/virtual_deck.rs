//! A software-only deck for development and tests without hardware.
//!
//! The virtual deck sits behind a loopback transport: writes and feature
//! reports are accepted and dropped, reads block until the handle closes.
//! It registers through a probe, so it only shows up in registries that
//! opt in via [`register`].

use std::sync::{Arc, Condvar, Mutex};

use crate::device::Deck;
use crate::hid::{DeviceInfo, HidHandle};
use crate::model::{KeyOrder, Model, PageMeta, PixelFormat, ReportRouting, Transform};
use crate::registry::Registry;
use crate::Error;

pub static VIRTUAL: Model = Model {
    name: "Virtual Deck",
    vendor_id: 0,
    product_id: 0,
    keys: 15,
    key_layout: (5, 3),
    key_pixels: 72,
    margin: 0,
    key_order: KeyOrder::LeftToRight,
    displays: 0,
    display_size: (0, 0),
    encoders: 0,
    routing: ReportRouting::Keys,
    key_data_offset: 1,
    feature_report_len: 17,
    firmware_offset: 0,
    cmd_firmware: &[],
    cmd_reset: &[],
    cmd_brightness: &[0x00],
    key_format: PixelFormat::Bgr24,
    key_transform: Transform::None,
    image_page_len: 1024,
    image_page_header_len: 16,
    key_page_header: key_header,
    display_page_len: 0,
    display_page_header_len: 0,
    display_page_header: None,
};

fn key_header(buf: &mut Vec<u8>, key: u8, meta: PageMeta) {
    buf.extend_from_slice(&[0x02, 0x01, meta.index as u8, 0x00, meta.last as u8, key]);
    buf.resize(VIRTUAL.image_page_header_len, 0);
}

/// Builds a fresh, unopened virtual deck.
pub fn deck() -> Deck {
    let info = DeviceInfo {
        manufacturer: "deckhand".into(),
        product: "Virtual Deck".into(),
        serial: "virtual-0".into(),
        ..Default::default()
    };
    Deck::with_handle(&VIRTUAL, info, Arc::new(LoopbackHandle::default()))
}

/// Adds the virtual deck to a registry. The probe always matches, so only
/// register it in registries that want a guaranteed device.
pub fn register(registry: &mut Registry) {
    registry.register_probe(|| true, deck);
}

#[derive(Default)]
struct LoopbackHandle {
    closed: Mutex<bool>,
    wake: Condvar,
}

impl HidHandle for LoopbackHandle {
    fn read(&self, _buf: &mut [u8]) -> Result<usize, Error> {
        let mut closed = self.closed.lock().unwrap();
        while !*closed {
            closed = self.wake.wait(closed).unwrap();
        }
        Err(Error::Closed)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, Error> {
        Ok(buf.len())
    }

    fn get_feature_report(&self, _buf: &mut [u8]) -> Result<usize, Error> {
        Ok(0)
    }

    fn send_feature_report(&self, _buf: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    fn close(&self) {
        *self.closed.lock().unwrap() = true;
        self.wake.notify_all();
    }
}
