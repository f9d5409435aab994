//! A driver library for USB button-deck peripherals: grids of keys with
//! small displays, optionally paired with rotary encoders and a touch
//! strip. The Elgato Stream Deck family and the Infinitton iDisplay are
//! supported out of the box.
//!
//! The crate splits into a hardware-independent core and per-model
//! descriptor tables:
//!
//! - [`hid`] defines the transport boundary ([`hid::HidBackend`] and
//!   [`hid::HidHandle`]); [`interface`] implements it over
//!   [`hidapi`](https://docs.rs/hidapi).
//! - [`model::Model`] describes one piece of hardware: geometry, report
//!   layout and image wire format. The driver core never special-cases a
//!   model; adding hardware means adding a table to [`models`].
//! - [`Registry`] maps USB identities to models and drives discovery.
//! - [`Deck`] is a device session: open it, push images at keys and
//!   displays, and consume decoded input through its [`EventStream`].
//!
//! # Quickstart
//!
//! ```no_run
//! use deckhand::{Registry, interface::HidApiBackend};
//!
//! # fn main() -> Result<(), deckhand::Error> {
//! let registry = Registry::with_builtin_drivers();
//! let backend = HidApiBackend::shared()?;
//! let deck = registry.open_first(&backend)?;
//!
//! println!("found a {} with {} keys", deck.name(), deck.keys());
//! deck.set_brightness(0.8)?;
//!
//! for event in deck.events()?.iter() {
//!     println!("{event}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Sessions are single-claim: one `Deck` owns its transport until
//! [`Deck::close`], which also ends the event stream. Image updates from
//! multiple threads are safe; pages of one image are never interleaved
//! with another.

mod decode;
mod device;
mod error;
pub mod event;
pub mod hid;
pub mod interface;
pub mod model;
pub mod models;
pub mod peripheral;
pub mod registry;
mod transfer;

pub use device::Deck;
pub use error::{Error, TransferTarget};
pub use event::{Event, EventKind, EventStream, Point, TouchKind};
pub use hid::DeviceInfo;
pub use peripheral::{Display, Encoder, Key};
pub use registry::Registry;
