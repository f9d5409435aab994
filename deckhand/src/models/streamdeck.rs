//! Elgato Stream Deck descriptor tables.
//!
//! Two protocol generations cover the whole family. Gen1 hardware (the
//! original, Mini and Mini MK.2) takes 24-bit BGR bitmaps in reports with a
//! 16-byte header and enumerates keys mirrored. Gen2 hardware (V2, MK.2, XL
//! and XL V2) takes JPEG in reports with an 8-byte little-endian header. The
//! Plus is gen2 plus four encoders and a touch strip driven as four
//! rectangle-addressed displays.

use crate::model::{
    Area, KeyOrder, Model, PageMeta, PixelFormat, ReportRouting, Transform,
};
use crate::registry::Registry;

pub const VENDOR_ID: u16 = 0x0fd9;

const GEN1_HEADER_LEN: usize = 16;
const GEN2_HEADER_LEN: usize = 8;
const PLUS_DISPLAY_HEADER_LEN: usize = 16;

const GEN1_RESET: &[u8] = &[0x0b, 0x63];
const GEN1_BRIGHTNESS: &[u8] = &[0x05, 0x55, 0xaa, 0xd1, 0x01];
const GEN1_FIRMWARE: &[u8] = &[0x04];

const GEN2_RESET: &[u8] = &[0x03, 0x02];
const GEN2_BRIGHTNESS: &[u8] = &[0x03, 0x08];
const GEN2_FIRMWARE: &[u8] = &[0x05];

/// Gen1 pages are one-based and address keys as `key + 1`.
fn gen1_key_header(buf: &mut Vec<u8>, key: u8, meta: PageMeta) {
    buf.extend_from_slice(&[
        0x02,
        0x01,
        (meta.index + 1) as u8,
        0x00,
        meta.last as u8,
        key + 1,
    ]);
    buf.resize(GEN1_HEADER_LEN, 0);
}

fn gen2_key_header(buf: &mut Vec<u8>, key: u8, meta: PageMeta) {
    let len = (meta.len as u16).to_le_bytes();
    let page = (meta.index as u16).to_le_bytes();
    buf.extend_from_slice(&[
        0x02,
        0x07,
        key,
        meta.last as u8,
        len[0],
        len[1],
        page[0],
        page[1],
    ]);
}

fn plus_display_header(buf: &mut Vec<u8>, area: Area, meta: PageMeta) {
    buf.extend_from_slice(&[0x02, 0x0c]);
    buf.extend_from_slice(&area.x.to_le_bytes());
    buf.extend_from_slice(&area.y.to_le_bytes());
    buf.extend_from_slice(&area.w.to_le_bytes());
    buf.extend_from_slice(&area.h.to_le_bytes());
    buf.push(meta.last as u8);
    buf.extend_from_slice(&(meta.index as u16).to_le_bytes());
    buf.extend_from_slice(&(meta.len as u16).to_le_bytes());
    buf.push(0x00);
}

/// Shared gen1 protocol plumbing; per-model geometry is filled in by the
/// statics below.
const fn gen1(name: &'static str, product_id: u16) -> Model {
    Model {
        name,
        vendor_id: VENDOR_ID,
        product_id,
        keys: 0,
        key_layout: (0, 0),
        key_pixels: 0,
        margin: 0,
        key_order: KeyOrder::RightToLeft,
        displays: 0,
        display_size: (0, 0),
        encoders: 0,
        routing: ReportRouting::Keys,
        key_data_offset: 1,
        feature_report_len: 17,
        firmware_offset: 5,
        cmd_firmware: GEN1_FIRMWARE,
        cmd_reset: GEN1_RESET,
        cmd_brightness: GEN1_BRIGHTNESS,
        key_format: PixelFormat::Bgr24,
        key_transform: Transform::Rotate180,
        image_page_len: 1024,
        image_page_header_len: GEN1_HEADER_LEN,
        key_page_header: gen1_key_header,
        display_page_len: 0,
        display_page_header_len: 0,
        display_page_header: None,
    }
}

const fn gen2(name: &'static str, product_id: u16) -> Model {
    Model {
        name,
        vendor_id: VENDOR_ID,
        product_id,
        keys: 0,
        key_layout: (0, 0),
        key_pixels: 0,
        margin: 0,
        key_order: KeyOrder::LeftToRight,
        displays: 0,
        display_size: (0, 0),
        encoders: 0,
        routing: ReportRouting::Keys,
        key_data_offset: 4,
        feature_report_len: 32,
        firmware_offset: 6,
        cmd_firmware: GEN2_FIRMWARE,
        cmd_reset: GEN2_RESET,
        cmd_brightness: GEN2_BRIGHTNESS,
        key_format: PixelFormat::Jpeg,
        key_transform: Transform::Rotate180,
        image_page_len: 1024,
        image_page_header_len: GEN2_HEADER_LEN,
        key_page_header: gen2_key_header,
        display_page_len: 0,
        display_page_header_len: 0,
        display_page_header: None,
    }
}

pub static ORIGINAL: Model = Model {
    keys: 15,
    key_layout: (5, 3),
    key_pixels: 72,
    margin: 24,
    image_page_len: 8191,
    ..gen1("Stream Deck", 0x0060)
};

pub static MINI: Model = Model {
    keys: 6,
    key_layout: (3, 2),
    key_pixels: 80,
    margin: 24,
    ..gen1("Stream Deck Mini", 0x0063)
};

pub static MINI_MK2: Model = Model {
    keys: 6,
    key_layout: (3, 2),
    key_pixels: 80,
    margin: 24,
    ..gen1("Stream Deck Mini MK.2", 0x0090)
};

pub static V2: Model = Model {
    keys: 15,
    key_layout: (5, 3),
    key_pixels: 72,
    margin: 24,
    ..gen2("Stream Deck V2", 0x006d)
};

pub static MK2: Model = Model {
    keys: 15,
    key_layout: (5, 3),
    key_pixels: 72,
    margin: 24,
    ..gen2("Stream Deck MK.2", 0x0080)
};

pub static XL: Model = Model {
    keys: 32,
    key_layout: (8, 4),
    key_pixels: 96,
    margin: 32,
    ..gen2("Stream Deck XL", 0x006c)
};

pub static XL_V2: Model = Model {
    keys: 32,
    key_layout: (8, 4),
    key_pixels: 96,
    margin: 32,
    ..gen2("Stream Deck XL V2", 0x008f)
};

pub static PLUS: Model = Model {
    keys: 8,
    key_layout: (4, 2),
    key_pixels: 120,
    margin: 24,
    displays: 4,
    display_size: (200, 100),
    encoders: 4,
    routing: ReportRouting::Multiplexed,
    key_transform: Transform::None,
    display_page_len: 1024,
    display_page_header_len: PLUS_DISPLAY_HEADER_LEN,
    display_page_header: Some(plus_display_header),
    ..gen2("Stream Deck +", 0x0084)
};

pub fn register(registry: &mut Registry) {
    for model in [
        &ORIGINAL, &MINI, &MINI_MK2, &V2, &MK2, &XL, &XL_V2, &PLUS,
    ] {
        registry.register_usb(model.vendor_id, model.product_id, model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gen1_header_is_one_based() {
        let mut buf = Vec::new();
        gen1_key_header(&mut buf, 4, PageMeta { index: 2, len: 100, last: false });
        assert_eq!(buf.len(), GEN1_HEADER_LEN);
        assert_eq!(&buf[..6], &[0x02, 0x01, 3, 0x00, 0, 5]);
    }

    #[test]
    fn gen2_header_is_little_endian() {
        let mut buf = Vec::new();
        gen2_key_header(&mut buf, 9, PageMeta { index: 0x0102, len: 0x0304, last: true });
        assert_eq!(buf, vec![0x02, 0x07, 9, 1, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn plus_display_header_addresses_the_rectangle() {
        let mut buf = Vec::new();
        let area = Area { x: 600, y: 0, w: 200, h: 100 };
        plus_display_header(&mut buf, area, PageMeta { index: 1, len: 512, last: true });
        assert_eq!(buf.len(), PLUS_DISPLAY_HEADER_LEN);
        assert_eq!(&buf[..2], &[0x02, 0x0c]);
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]), 600);
        assert_eq!(u16::from_le_bytes([buf[8], buf[9]]), 100);
        assert_eq!(buf[10], 1);
        assert_eq!(u16::from_le_bytes([buf[11], buf[12]]), 1);
        assert_eq!(u16::from_le_bytes([buf[13], buf[14]]), 512);
    }

    #[test]
    fn family_identities_are_distinct() {
        let models = [
            &ORIGINAL, &MINI, &MINI_MK2, &V2, &MK2, &XL, &XL_V2, &PLUS,
        ];
        for (i, a) in models.iter().enumerate() {
            for b in &models[i + 1..] {
                assert_ne!(a.product_id, b.product_id, "{} vs {}", a.name, b.name);
            }
        }
    }
}
