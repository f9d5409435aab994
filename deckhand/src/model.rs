//! Immutable per-hardware-model descriptors.
//!
//! A [`Model`] bundles everything the driver core needs to know about one
//! piece of hardware: geometry, report layout, feature-report commands and
//! the image wire format. Descriptors live as `static`s in [`crate::models`];
//! the core never special-cases a model by name.

use crate::error::{Error, TransferTarget};

/// Physical-to-logical ordering of the key grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOrder {
    /// Logical indices follow the report order.
    LeftToRight,
    /// The report enumerates keys mirrored; logical index is
    /// `keys - 1 - physical`.
    RightToLeft,
}

/// How input reports are routed to the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportRouting {
    /// Every report carries the key bitmap at a fixed offset.
    Keys,
    /// Reports carry a discriminator byte selecting keys, touch or encoder
    /// payloads.
    Multiplexed,
}

/// Wire pixel format for key and display images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 24-bit BGR bitmap with a generated 54-byte file header.
    Bgr24,
    /// Baseline JPEG at quality 100.
    Jpeg,
}

/// Pixel transform applied before encoding, matching the panel mounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transform {
    #[default]
    None,
    FlipHorizontal,
    FlipVertical,
    Rotate180,
}

/// Position of one page within a paginated image transfer.
#[derive(Clone, Copy, Debug)]
pub struct PageMeta {
    /// Zero-based page index.
    pub index: usize,
    /// Payload bytes in this page.
    pub len: usize,
    /// Set on exactly the final page.
    pub last: bool,
}

/// A rectangle on a touch display, in display pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Area {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

/// Builds the page header for a key image page into `buf`.
pub type KeyPageHeaderFn = fn(buf: &mut Vec<u8>, key: u8, meta: PageMeta);

/// Builds the page header for a display image page into `buf`.
pub type AreaPageHeaderFn = fn(buf: &mut Vec<u8>, area: Area, meta: PageMeta);

/// Describes one hardware model.
pub struct Model {
    pub name: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,

    /// Number of keys with displays.
    pub keys: u8,
    /// Key grid as (columns, rows).
    pub key_layout: (u8, u8),
    /// Edge length of the square key display, in pixels.
    pub key_pixels: u32,
    /// Gap between adjacent key displays, in pixels.
    pub margin: u32,
    pub key_order: KeyOrder,

    /// Number of touch displays (zero for most models).
    pub displays: u8,
    /// Size of one touch display as (width, height).
    pub display_size: (u32, u32),
    /// Number of rotary encoders.
    pub encoders: u8,

    pub routing: ReportRouting,
    /// Absolute offset of the key-state bytes in a raw input report.
    pub key_data_offset: usize,

    /// Length of feature reports, including the report ID.
    pub feature_report_len: usize,
    /// Offset of the firmware version string in the firmware feature report.
    pub firmware_offset: usize,
    /// Command prefixes for feature reports. An empty slice marks the
    /// operation as unsupported on this model.
    pub cmd_firmware: &'static [u8],
    pub cmd_reset: &'static [u8],
    pub cmd_brightness: &'static [u8],

    pub key_format: PixelFormat,
    pub key_transform: Transform,
    /// Total length of one image output report, header included.
    pub image_page_len: usize,
    pub image_page_header_len: usize,
    pub key_page_header: KeyPageHeaderFn,

    /// Page geometry for touch display transfers; zero on models without
    /// touch displays.
    pub display_page_len: usize,
    pub display_page_header_len: usize,
    /// Present on models with touch displays.
    pub display_page_header: Option<AreaPageHeaderFn>,
}

impl Model {
    /// Maps a physical key position in the report to the logical index.
    /// Bijective over `[0, keys)`.
    pub fn translate_key(&self, physical: u8) -> u8 {
        match self.key_order {
            KeyOrder::LeftToRight => physical,
            KeyOrder::RightToLeft => self.keys - 1 - physical,
        }
    }

    /// Grid position (column, row) of a logical key index.
    pub fn key_position(&self, index: u8) -> (u8, u8) {
        let (columns, _) = self.key_layout;
        (index % columns, index / columns)
    }

    /// Logical key index at a grid position, if it exists.
    pub fn key_at(&self, column: u8, row: u8) -> Option<u8> {
        let (columns, rows) = self.key_layout;
        if column >= columns || row >= rows {
            return None;
        }
        Some(row * columns + column)
    }

    /// The rectangle covered by a touch display, or [`Error::NotFound`] if
    /// the display index does not exist.
    pub(crate) fn display_area(&self, display: u8) -> Result<Area, Error> {
        if display >= self.displays {
            return Err(Error::NotFound);
        }
        let (w, h) = self.display_size;
        Ok(Area {
            x: display as u16 * w as u16,
            y: 0,
            w: w as u16,
            h: h as u16,
        })
    }

    /// The builder for display page headers; absent on models without touch
    /// displays.
    pub(crate) fn display_header(&self, display: u8) -> Result<AreaPageHeaderFn, Error> {
        self.display_page_header.ok_or(Error::Transfer {
            target: TransferTarget::Display(display),
            source: Box::new(Error::NotFound),
        })
    }

    /// Read buffer size for the reader thread: large enough for the key
    /// bitmap and, on multiplexed models, touch coordinates.
    pub(crate) fn input_report_len(&self) -> usize {
        let mut len = self.key_data_offset + self.keys as usize;
        if self.encoders > 0 || self.displays > 0 {
            len = len.max(self.key_data_offset + 14);
        }
        len.max(32)
    }
}

/// Converts a brightness value to the percentage byte sent to the device.
/// Values are clamped to `[0.0, 1.0]` and rounded up.
pub(crate) fn brightness_percent(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 100.0).ceil() as u8
}
