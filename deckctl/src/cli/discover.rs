use std::io::{BufWriter, Write};

use anyhow::Result;
use clap::Args;
use deckhand::{Registry, interface::HidApiBackend};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

use super::Cli;

/// List compatible devices attached to this machine.
#[derive(Args)]
pub struct DiscoverCommand {
    /// Include the software-only virtual deck
    #[arg(long)]
    pub r#virtual: bool,
}

impl DiscoverCommand {
    pub fn execute(&self, root: &Cli) -> Result<()> {
        let mut stdout = BufWriter::new(anstream::stdout());

        let mut registry = Registry::with_builtin_drivers();
        if self.r#virtual {
            deckhand::models::virtual_deck::register(&mut registry);
        }
        let backend = HidApiBackend::shared()?;

        let decks: Vec<DiscoveredDeck> = registry
            .discover(&backend)
            .iter()
            .map(|deck| {
                let info = deck.info();
                let (columns, rows) = deck.key_layout();
                DiscoveredDeck {
                    model: deck.name(),
                    manufacturer: info.manufacturer.clone(),
                    product: info.product.clone(),
                    serial: info.serial.clone(),
                    usb_id: info.usb_id(),
                    keys: deck.keys(),
                    columns,
                    rows,
                    encoders: deck.encoders(),
                    displays: deck.displays(),
                }
            })
            .collect();

        if root.json {
            writeln!(stdout, "{}", json!(decks)).unwrap();
            return Ok(());
        }

        if decks.is_empty() {
            writeln!(stdout, "{}", "No compatible devices were found.".bright_black()).unwrap();
            return Ok(());
        }

        for (i, deck) in decks.into_iter().enumerate() {
            if i != 0 {
                writeln!(stdout).unwrap();
            }

            writeln!(
                stdout,
                "{}: {} ({})",
                deck.serial.bright_black(),
                deck.model,
                deck.usb_id.bright_black()
            )
            .unwrap();
            writeln!(
                stdout,
                " ├─ {} {} keys ({}x{})",
                "●".green(),
                deck.keys.blue(),
                deck.columns,
                deck.rows
            )
            .unwrap();
            if deck.encoders > 0 {
                writeln!(stdout, " ├─ {} encoders", deck.encoders.blue()).unwrap();
            }
            if deck.displays > 0 {
                writeln!(stdout, " ├─ {} touch displays", deck.displays.blue()).unwrap();
            }
            writeln!(
                stdout,
                " ╰─ {} {}",
                deck.manufacturer.bright_black(),
                deck.product.bright_black()
            )
            .unwrap();
        }

        stdout.flush().unwrap();

        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize)]
struct DiscoveredDeck {
    model: &'static str,
    manufacturer: String,
    product: String,
    serial: String,
    usb_id: String,
    keys: u8,
    columns: u8,
    rows: u8,
    encoders: u8,
    displays: u8,
}
