use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use deckhand::{
    Deck, EventKind, Registry, TouchKind, interface::HidApiBackend, models::virtual_deck,
};
use image::{DynamicImage, Rgb, RgbImage};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

use super::Cli;

/// Open the first compatible device, paint its keys and print every event.
#[derive(Args)]
pub struct TestCommand {
    /// Brightness percentage to apply on start
    #[arg(short, long, default_value_t = 80)]
    pub brightness: u8,

    /// Paint this image on every key instead of the color wheel
    #[arg(short, long)]
    pub image: Option<std::path::PathBuf>,

    /// Use the software-only virtual deck instead of real hardware
    #[arg(long)]
    pub r#virtual: bool,
}

impl TestCommand {
    pub fn execute(&self, root: &Cli) -> Result<()> {
        let mut registry = Registry::with_builtin_drivers();
        if self.r#virtual {
            virtual_deck::register(&mut registry);
        }
        let backend = HidApiBackend::shared()?;
        let deck = registry
            .open_first(&backend)
            .context("no compatible device could be opened")?;

        let mut stdout = anstream::stdout();
        if !root.json {
            writeln!(
                stdout,
                "{}: {} ({} keys)",
                deck.serial_number().bright_black(),
                deck.name(),
                deck.keys().blue()
            )
            .unwrap();
            let firmware = deck.firmware_version()?;
            if !firmware.is_empty() {
                writeln!(stdout, "firmware {}", firmware.bright_black()).unwrap();
            }
        }

        deck.set_brightness(f64::from(self.brightness) / 100.0)?;
        self.paint(&deck)?;

        let events = deck.events()?;
        for event in events.iter() {
            if root.json {
                writeln!(stdout, "{}", json!(EventRecord::from(&event.kind))).unwrap();
            } else {
                writeln!(stdout, "{event}").unwrap();
            }
            match event.kind {
                // Light up pressed keys, restore them on release.
                EventKind::KeyPress { key } => {
                    if let Some(key) = deck.key(key) {
                        let (w, h) = key.size();
                        key.update(&solid(w, h, Rgb([255, 255, 255])))?;
                    }
                }
                EventKind::KeyRelease { key, .. } => {
                    if let Some(handle) = deck.key(key) {
                        let (w, h) = handle.size();
                        handle.update(&key_color(&deck, key, w, h))?;
                    }
                }
                EventKind::Error(_) => break,
                _ => {}
            }
            stdout.flush().unwrap();
        }

        deck.close()?;
        Ok(())
    }

    fn paint(&self, deck: &Deck) -> Result<()> {
        if let Some(path) = &self.image {
            let img = image::open(path)
                .with_context(|| format!("could not load {}", path.display()))?;
            for index in 0..deck.keys() {
                if let Some(key) = deck.key(index) {
                    key.update(&img)?;
                }
            }
            for index in 0..deck.displays() {
                if let Some(display) = deck.display(index) {
                    display.update(&img)?;
                }
            }
            return Ok(());
        }

        let (w, h) = deck.key_size();
        for index in 0..deck.keys() {
            if let Some(key) = deck.key(index) {
                key.update(&key_color(deck, index, w, h))?;
            }
        }
        for index in 0..deck.displays() {
            if let Some(display) = deck.display(index) {
                let (w, h) = display.size();
                display.update(&solid(w, h, Rgb([32, 32, 32])))?;
            }
        }
        Ok(())
    }
}

fn solid(w: u32, h: u32, color: Rgb<u8>) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, color))
}

/// A color wheel across the key grid, so every key is distinguishable.
fn key_color(deck: &Deck, index: u8, w: u32, h: u32) -> DynamicImage {
    let hue = f64::from(index) / f64::from(deck.keys().max(1)) * 360.0;
    solid(w, h, hue_to_rgb(hue))
}

fn hue_to_rgb(hue: f64) -> Rgb<u8> {
    let section = (hue / 60.0) % 6.0;
    let ramp = (255.0 * section.fract()) as u8;
    match section as u8 {
        0 => Rgb([255, ramp, 0]),
        1 => Rgb([255 - ramp, 255, 0]),
        2 => Rgb([0, 255, ramp]),
        3 => Rgb([0, 255 - ramp, 255]),
        4 => Rgb([ramp, 0, 255]),
        _ => Rgb([255, 0, 255 - ramp]),
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize)]
struct EventRecord {
    kind: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    encoder: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    delta: Option<i8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    held_ms: Option<u128>,

    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    to_x: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    to_y: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<&EventKind> for EventRecord {
    fn from(kind: &EventKind) -> Self {
        let mut record = EventRecord::default();
        match kind {
            EventKind::KeyPress { key } => {
                record.kind = "key_press";
                record.key = Some(*key);
            }
            EventKind::KeyRelease { key, held } => {
                record.kind = "key_release";
                record.key = Some(*key);
                record.held_ms = Some(held.as_millis());
            }
            EventKind::EncoderPress { encoder } => {
                record.kind = "encoder_press";
                record.encoder = Some(*encoder);
            }
            EventKind::EncoderRelease { encoder, held } => {
                record.kind = "encoder_release";
                record.encoder = Some(*encoder);
                record.held_ms = Some(held.as_millis());
            }
            EventKind::EncoderChange { encoder, delta, .. } => {
                record.kind = "encoder_change";
                record.encoder = Some(*encoder);
                record.delta = Some(*delta);
            }
            EventKind::Touch { display, at, kind } => {
                record.kind = match kind {
                    TouchKind::Short => "touch",
                    TouchKind::Long => "touch_long",
                };
                record.display = Some(*display);
                record.x = Some(at.x);
                record.y = Some(at.y);
            }
            EventKind::TouchEnd { display, at } => {
                record.kind = "touch_end";
                record.display = Some(*display);
                record.x = Some(at.x);
                record.y = Some(at.y);
            }
            EventKind::Swipe { display, from, to } => {
                record.kind = "swipe";
                record.display = Some(*display);
                record.x = Some(from.x);
                record.y = Some(from.y);
                record.to_x = Some(to.x);
                record.to_y = Some(to.y);
            }
            EventKind::Error(err) => {
                record.kind = "error";
                record.error = Some(err.to_string());
            }
        }
        record
    }
}
