//! Infinitton iDisplay descriptor table.
//!
//! Protocol-wise this is gen1 Stream Deck lineage: BGR bitmaps, 16-byte
//! one-based page headers, two large pages per key. The hardware shipped
//! under two product IDs; both map to the same descriptor.

use crate::model::{KeyOrder, Model, PageMeta, PixelFormat, ReportRouting, Transform};
use crate::registry::Registry;

pub const VENDOR_ID: u16 = 0xffff;
pub const PRODUCT_IDS: [u16; 2] = [0x1f40, 0x1f41];

const HEADER_LEN: usize = 16;

const BRIGHTNESS: &[u8] = &[0x00, 0x11];

fn key_header(buf: &mut Vec<u8>, key: u8, meta: PageMeta) {
    buf.extend_from_slice(&[
        0x02,
        0x01,
        (meta.index + 1) as u8,
        0x00,
        meta.last as u8,
        key + 1,
    ]);
    buf.resize(HEADER_LEN, 0);
}

pub static IDISPLAY: Model = Model {
    name: "Infinitton iDisplay",
    vendor_id: VENDOR_ID,
    product_id: PRODUCT_IDS[0],
    keys: 15,
    key_layout: (3, 5),
    key_pixels: 72,
    margin: 16,
    key_order: KeyOrder::LeftToRight,
    displays: 0,
    display_size: (0, 0),
    encoders: 0,
    routing: ReportRouting::Keys,
    key_data_offset: 1,
    feature_report_len: 17,
    firmware_offset: 0,
    // No firmware or reset commands are known for this hardware.
    cmd_firmware: &[],
    cmd_reset: &[],
    cmd_brightness: BRIGHTNESS,
    key_format: PixelFormat::Bgr24,
    key_transform: Transform::None,
    image_page_len: 7819,
    image_page_header_len: HEADER_LEN,
    key_page_header: key_header,
    display_page_len: 0,
    display_page_header_len: 0,
    display_page_header: None,
};

pub fn register(registry: &mut Registry) {
    for product_id in PRODUCT_IDS {
        registry.register_usb(VENDOR_ID, product_id, &IDISPLAY);
    }
}
