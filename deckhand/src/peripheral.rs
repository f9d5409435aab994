//! Typed handles for the peripherals on a deck: keys, touch displays and
//! rotary encoders.
//!
//! Handles are cheap, index-carrying borrows of the session; they are
//! resolved through [`Deck::key`](crate::Deck::key) and friends and go away
//! with the borrow. Events refer to peripherals by index only.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::Error;
use crate::device::Deck;

/// One key with a display.
#[derive(Clone, Copy)]
pub struct Key<'d> {
    deck: &'d Deck,
    index: u8,
}

impl<'d> Key<'d> {
    pub(crate) fn new(deck: &'d Deck, index: u8) -> Self {
        Self { deck, index }
    }

    /// Logical key index.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Grid position as (column, row).
    pub fn position(&self) -> (u8, u8) {
        self.deck.model().key_position(self.index)
    }

    /// Display size in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.deck.key_size()
    }

    /// Shows an image on the key, resampling with a bilinear filter if the
    /// size does not match.
    pub fn update(&self, img: &DynamicImage) -> Result<(), Error> {
        self.update_with_filter(img, Deck::default_key_filter())
    }

    /// Shows an image on the key, resampling with `filter`.
    pub fn update_with_filter(&self, img: &DynamicImage, filter: FilterType) -> Result<(), Error> {
        self.deck.update_key(self.index, img, filter)
    }
}

/// One touch display.
#[derive(Clone, Copy)]
pub struct Display<'d> {
    deck: &'d Deck,
    index: u8,
}

impl<'d> Display<'d> {
    pub(crate) fn new(deck: &'d Deck, index: u8) -> Self {
        Self { deck, index }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// Display size in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.deck.display_size()
    }

    /// Shows an image on the display, resampling with a Catmull-Rom filter
    /// if the size does not match.
    pub fn update(&self, img: &DynamicImage) -> Result<(), Error> {
        self.update_with_filter(img, Deck::default_display_filter())
    }

    pub fn update_with_filter(&self, img: &DynamicImage, filter: FilterType) -> Result<(), Error> {
        self.deck.update_display(self.index, img, filter)
    }
}

/// One rotary encoder.
#[derive(Clone, Copy)]
pub struct Encoder<'d> {
    deck: &'d Deck,
    index: u8,
}

impl<'d> Encoder<'d> {
    pub(crate) fn new(deck: &'d Deck, index: u8) -> Self {
        Self { deck, index }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// The touch display sitting above this encoder, where the hardware
    /// pairs them one to one.
    pub fn display(&self) -> Option<Display<'d>> {
        if self.deck.displays() == self.deck.encoders() {
            self.deck.display(self.index)
        } else {
            None
        }
    }
}
