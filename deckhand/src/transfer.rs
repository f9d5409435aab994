//! The image transfer engine: resample, transform, encode and page images
//! out to key and touch displays.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use tracing::trace;

use crate::Error;
use crate::error::TransferTarget;
use crate::hid::HidHandle;
use crate::model::{Area, Model, PageMeta, PixelFormat, Transform};

/// Quality used for JPEG wire images. The panels are small; bandwidth is
/// cheaper than artifacts.
const JPEG_QUALITY: u8 = 100;

const BMP_HEADER_LEN: usize = 54;
/// 96 dpi, in pixels per metre.
const BMP_PPM: u32 = 3780;

/// Produces the wire payload for a key image on `model`.
pub(crate) fn key_payload(
    model: &Model,
    img: &DynamicImage,
    filter: FilterType,
) -> Result<Vec<u8>, Error> {
    let edge = model.key_pixels;
    let rgb = fit(img, edge, edge, filter);
    let rgb = apply_transform(rgb, model.key_transform);
    match model.key_format {
        PixelFormat::Bgr24 => Ok(encode_bgr24(&rgb)),
        PixelFormat::Jpeg => encode_jpeg(&rgb),
    }
}

/// Produces the wire payload for a touch display image on `model`.
/// Display panels take JPEG as-is, without the key transform.
pub(crate) fn display_payload(
    model: &Model,
    img: &DynamicImage,
    filter: FilterType,
) -> Result<Vec<u8>, Error> {
    let (w, h) = model.display_size;
    encode_jpeg(&fit(img, w, h, filter))
}

fn fit(img: &DynamicImage, w: u32, h: u32, filter: FilterType) -> RgbImage {
    let rgb = img.to_rgb8();
    if rgb.width() == w && rgb.height() == h {
        return rgb;
    }
    imageops::resize(&rgb, w, h, filter)
}

fn apply_transform(img: RgbImage, transform: Transform) -> RgbImage {
    match transform {
        Transform::None => img,
        Transform::FlipHorizontal => imageops::flip_horizontal(&img),
        Transform::FlipVertical => imageops::flip_vertical(&img),
        Transform::Rotate180 => imageops::rotate180(&img),
    }
}

/// Encodes a 24-bit BGR bitmap with a generated file header. Rows are
/// emitted top to bottom, matching what the gen1 panels expect.
fn encode_bgr24(img: &RgbImage) -> Vec<u8> {
    let (w, h) = (img.width(), img.height());
    let data_len = 3 * w as usize * h as usize;
    let mut out = Vec::with_capacity(BMP_HEADER_LEN + data_len);
    out.extend_from_slice(&bmp_header(w, h));
    for pixel in img.pixels() {
        let [r, g, b] = pixel.0;
        out.extend_from_slice(&[b, g, r]);
    }
    out
}

fn bmp_header(w: u32, h: u32) -> [u8; BMP_HEADER_LEN] {
    let data_len = 3 * w * h;
    let mut header = [0u8; BMP_HEADER_LEN];
    header[0] = b'B';
    header[1] = b'M';
    header[2..6].copy_from_slice(&(BMP_HEADER_LEN as u32 + data_len).to_le_bytes());
    header[10..14].copy_from_slice(&(BMP_HEADER_LEN as u32).to_le_bytes());
    header[14..18].copy_from_slice(&40u32.to_le_bytes());
    header[18..22].copy_from_slice(&w.to_le_bytes());
    header[22..26].copy_from_slice(&h.to_le_bytes());
    header[26..28].copy_from_slice(&1u16.to_le_bytes());
    header[28..30].copy_from_slice(&24u16.to_le_bytes());
    header[34..38].copy_from_slice(&data_len.to_le_bytes());
    header[38..42].copy_from_slice(&BMP_PPM.to_le_bytes());
    header[42..46].copy_from_slice(&BMP_PPM.to_le_bytes());
    header
}

fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder.encode_image(img)?;
    Ok(out)
}

/// One page of a paginated payload.
pub(crate) struct Page<'a> {
    pub(crate) index: usize,
    pub(crate) payload: &'a [u8],
    pub(crate) last: bool,
}

impl Page<'_> {
    pub(crate) fn meta(&self) -> PageMeta {
        PageMeta {
            index: self.index,
            len: self.payload.len(),
            last: self.last,
        }
    }
}

/// Splits a payload into pages of at most `page_len` bytes. Always yields at
/// least one page, and marks exactly the final one terminal.
pub(crate) struct Pages<'a> {
    data: &'a [u8],
    page_len: usize,
    next: usize,
    done: bool,
}

impl<'a> Pages<'a> {
    pub(crate) fn new(data: &'a [u8], page_len: usize) -> Self {
        Self { data, page_len, next: 0, done: false }
    }
}

impl<'a> Iterator for Pages<'a> {
    type Item = Page<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let start = self.next * self.page_len;
        let end = (start + self.page_len).min(self.data.len());
        let last = end == self.data.len();
        self.done = last;
        let page = Page {
            index: self.next,
            payload: &self.data[start..end],
            last,
        };
        self.next += 1;
        Some(page)
    }
}

/// Writes a key image payload as full-size, zero-padded output reports.
/// The caller must hold the session write lock.
pub(crate) fn write_key_pages(
    handle: &dyn HidHandle,
    model: &Model,
    key: u8,
    payload: &[u8],
) -> Result<(), Error> {
    let target = TransferTarget::Key(key);
    let layout = (model.image_page_len, model.image_page_header_len);
    write_pages(handle, layout, target, payload, |buf, meta| {
        (model.key_page_header)(buf, key, meta)
    })
}

/// Writes a display image payload covering `area`. The caller must hold the
/// session write lock.
pub(crate) fn write_display_pages(
    handle: &dyn HidHandle,
    model: &Model,
    display: u8,
    area: Area,
    payload: &[u8],
) -> Result<(), Error> {
    let build = model.display_header(display)?;
    let target = TransferTarget::Display(display);
    let layout = (model.display_page_len, model.display_page_header_len);
    write_pages(handle, layout, target, payload, |buf, meta| {
        build(buf, area, meta)
    })
}

fn write_pages(
    handle: &dyn HidHandle,
    (page_len, header_len): (usize, usize),
    target: TransferTarget,
    payload: &[u8],
    mut build_header: impl FnMut(&mut Vec<u8>, PageMeta),
) -> Result<(), Error> {
    let mut report = Vec::with_capacity(page_len);
    for page in Pages::new(payload, page_len - header_len) {
        report.clear();
        build_header(&mut report, page.meta());
        debug_assert_eq!(report.len(), header_len);
        report.extend_from_slice(page.payload);
        report.resize(page_len, 0);
        trace!(%target, page = page.index, last = page.last, "writing image page");
        handle
            .write(&report)
            .map_err(|err| Error::Transfer { target, source: Box::new(err) })?;
    }
    Ok(())
}
