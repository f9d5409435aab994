//! The driver registry: maps USB identities (and arbitrary probes) to
//! device constructors, and drives discovery.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::Error;
use crate::device::Deck;
use crate::hid::HidBackend;
use crate::model::Model;

type ProbeFn = Box<dyn Fn() -> bool + Send + Sync>;
type ConstructFn = Box<dyn Fn() -> Deck + Send + Sync>;

/// Registered drivers. Registration happens once at bootstrap; discovery
/// may run any number of times afterwards.
#[derive(Default)]
pub struct Registry {
    usb: HashMap<(u16, u16), &'static Model>,
    probes: Vec<(ProbeFn, ConstructFn)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in hardware driver registered.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        crate::models::register_all(&mut registry);
        registry
    }

    /// Registers a USB driver for `(vendor_id, product_id)`.
    ///
    /// # Panics
    ///
    /// Panics if a driver for that identity is already registered. Two
    /// drivers claiming the same USB identity is a programming error, not
    /// a runtime condition.
    pub fn register_usb(&mut self, vendor_id: u16, product_id: u16, model: &'static Model) {
        if let Some(existing) = self.usb.insert((vendor_id, product_id), model) {
            panic!(
                "driver for {vendor_id:04x}:{product_id:04x} already registered as {}",
                existing.name
            );
        }
    }

    /// Registers a non-USB driver behind a detection probe. `detect` runs on
    /// every discovery; when it reports true, `construct` builds the device.
    pub fn register_probe(
        &mut self,
        detect: impl Fn() -> bool + Send + Sync + 'static,
        construct: impl Fn() -> Deck + Send + Sync + 'static,
    ) {
        self.probes.push((Box::new(detect), Box::new(construct)));
    }

    /// Enumerates attached devices and builds an unopened [`Deck`] for every
    /// supported one, USB matches first, probe matches after.
    pub fn discover(&self, backend: &Arc<dyn HidBackend>) -> Vec<Deck> {
        let mut vendors: Vec<u16> = self.usb.keys().map(|&(vendor, _)| vendor).collect();
        vendors.sort_unstable();
        vendors.dedup();

        let mut found = Vec::new();
        for vendor in vendors {
            let infos = match backend.enumerate(vendor, 0) {
                Ok(infos) => infos,
                Err(err) => {
                    warn!(vendor, error = %err, "enumeration failed");
                    continue;
                }
            };
            for info in infos {
                if let Some(model) = self.usb.get(&(info.vendor_id, info.product_id)) {
                    debug!(model = model.name, device = %info, "discovered");
                    found.push(Deck::usb(model, Arc::clone(backend), info));
                }
            }
        }
        for (detect, construct) in &self.probes {
            if detect() {
                found.push(construct());
            }
        }
        found
    }

    /// Opens the first discovered device. If opening it fails, that error
    /// is returned as-is; no fallback to later matches.
    pub fn open_first(&self, backend: &Arc<dyn HidBackend>) -> Result<Deck, Error> {
        let mut found = self.discover(backend);
        if found.is_empty() {
            return Err(Error::NotFound);
        }
        let deck = found.remove(0);
        deck.open()?;
        Ok(deck)
    }
}
