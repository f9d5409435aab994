//! Descriptor tables and registration hooks for the supported hardware.

pub mod infinitton;
pub mod streamdeck;
pub mod virtual_deck;

use crate::registry::Registry;

/// Registers every built-in USB hardware driver. The virtual deck is not
/// included; opt in with [`virtual_deck::register`].
pub fn register_all(registry: &mut Registry) {
    streamdeck::register(registry);
    infinitton::register(registry);
}
