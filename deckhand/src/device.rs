//! Device sessions: lifecycle, feature commands and the reader thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{debug, trace};

use crate::Error;
use crate::decode::Decoder;
use crate::event::{Event, EventKind, EventStream};
use crate::hid::{DeviceInfo, HidBackend, HidHandle};
use crate::model::{self, Model};
use crate::peripheral::{Display, Encoder, Key};
use crate::transfer;

/// Events queued between the reader thread and the consumer. The reader
/// stalls (and re-checks for shutdown) once this fills up.
const EVENT_QUEUE_DEPTH: usize = 16;

/// How long a stalled reader waits before re-checking for shutdown.
const SEND_RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Default resampling filters for key and display images.
const KEY_FILTER: FilterType = FilterType::Triangle;
const DISPLAY_FILTER: FilterType = FilterType::CatmullRom;

/// One deck peripheral and its session state.
///
/// A `Deck` starts idle. [`open`](Deck::open) claims the transport and
/// starts the reader thread; [`close`](Deck::close) tears both down and is
/// terminal. All methods take `&self`; the session state sits behind a
/// mutex so a `Deck` can be shared across threads.
pub struct Deck {
    model: &'static Model,
    info: DeviceInfo,
    source: Source,
    state: Mutex<Lifecycle>,
}

enum Source {
    /// Opened lazily through the backend.
    Usb(Arc<dyn HidBackend>),
    /// An already-open handle, used by probe-registered drivers and tests.
    Handle(Arc<dyn HidHandle>),
}

enum Lifecycle {
    Idle,
    Open(Session),
    Closed,
}

struct Session {
    shared: Arc<Shared>,
    events: flume::Receiver<Event>,
    reader: Option<JoinHandle<()>>,
}

/// State shared with the reader thread and the transfer engine.
struct Shared {
    handle: Arc<dyn HidHandle>,
    /// Serializes output and feature reports so paged image transfers are
    /// never interleaved.
    write_lock: Mutex<()>,
    shutdown: AtomicBool,
}

impl Deck {
    pub(crate) fn usb(model: &'static Model, backend: Arc<dyn HidBackend>, info: DeviceInfo) -> Self {
        Self {
            model,
            info,
            source: Source::Usb(backend),
            state: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Builds a deck over an already-open transport handle. This is how
    /// probe-registered, non-USB drivers construct their devices.
    pub fn with_handle(
        model: &'static Model,
        info: DeviceInfo,
        handle: Arc<dyn HidHandle>,
    ) -> Self {
        Self {
            model,
            info,
            source: Source::Handle(handle),
            state: Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn model(&self) -> &'static Model {
        self.model
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Model name, e.g. `"Stream Deck XL"`.
    pub fn name(&self) -> &'static str {
        self.model.name
    }

    pub fn manufacturer(&self) -> &str {
        &self.info.manufacturer
    }

    pub fn product(&self) -> &str {
        &self.info.product
    }

    pub fn serial_number(&self) -> &str {
        &self.info.serial
    }

    /// Claims the transport and starts the reader thread. Opening an
    /// already-open deck is a no-op; opening a closed one fails.
    pub fn open(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        match &*state {
            Lifecycle::Open(_) => Ok(()),
            Lifecycle::Closed => Err(Error::Closed),
            Lifecycle::Idle => {
                let handle = match &self.source {
                    Source::Usb(backend) => backend.open(&self.info)?,
                    Source::Handle(handle) => Arc::clone(handle),
                };
                let shared = Arc::new(Shared {
                    handle,
                    write_lock: Mutex::new(()),
                    shutdown: AtomicBool::new(false),
                });
                let (tx, rx) = flume::bounded(EVENT_QUEUE_DEPTH);
                let model = self.model;
                let reader = thread::spawn({
                    let shared = Arc::clone(&shared);
                    move || read_loop(model, shared, tx)
                });
                debug!(model = model.name, serial = %self.info.serial, "session opened");
                *state = Lifecycle::Open(Session {
                    shared,
                    events: rx,
                    reader: Some(reader),
                });
                Ok(())
            }
        }
    }

    /// Closes the session: waits for an in-flight write, unblocks the
    /// reader and joins it. Idempotent, and terminal either way.
    pub fn close(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let previous = std::mem::replace(&mut *state, Lifecycle::Closed);
        drop(state);
        if let Lifecycle::Open(mut session) = previous {
            session.shared.shutdown.store(true, Ordering::Release);
            // Let a paged transfer finish its current page run before the
            // transport goes away.
            drop(session.shared.write_lock.lock().unwrap());
            session.shared.handle.close();
            if let Some(reader) = session.reader.take() {
                let _ = reader.join();
            }
            debug!(model = self.model.name, "session closed");
        }
        Ok(())
    }

    fn shared(&self) -> Result<Arc<Shared>, Error> {
        match &*self.state.lock().unwrap() {
            Lifecycle::Open(session) => Ok(Arc::clone(&session.shared)),
            _ => Err(Error::Closed),
        }
    }

    /// The session's event stream. Each call returns a stream over the same
    /// underlying queue; events are not duplicated across streams.
    pub fn events(&self) -> Result<EventStream, Error> {
        match &*self.state.lock().unwrap() {
            Lifecycle::Open(session) => Ok(EventStream::new(session.events.clone())),
            _ => Err(Error::Closed),
        }
    }

    /// Resets the device to its boot logo. A no-op on models without a
    /// reset command.
    pub fn reset(&self) -> Result<(), Error> {
        if self.model.cmd_reset.is_empty() {
            return Ok(());
        }
        self.send_feature(self.model.cmd_reset, &[])
    }

    /// Sets the global display brightness. `value` is clamped to
    /// `[0.0, 1.0]`.
    pub fn set_brightness(&self, value: f64) -> Result<(), Error> {
        let percent = model::brightness_percent(value);
        self.send_feature(self.model.cmd_brightness, &[percent])
    }

    /// Queries the firmware version string. Returns an empty string on
    /// models that do not expose one.
    pub fn firmware_version(&self) -> Result<String, Error> {
        if self.model.cmd_firmware.is_empty() {
            return Ok(String::new());
        }
        let shared = self.shared()?;
        let mut report = vec![0u8; self.model.feature_report_len];
        report[..self.model.cmd_firmware.len()].copy_from_slice(self.model.cmd_firmware);
        let n = {
            let _write = shared.write_lock.lock().unwrap();
            shared.handle.get_feature_report(&mut report)?
        };
        let data = &report[..n];
        let version = data
            .get(self.model.firmware_offset..)
            .unwrap_or_default()
            .split(|&b| b == 0)
            .next()
            .unwrap_or_default();
        Ok(String::from_utf8_lossy(version).into_owned())
    }

    fn send_feature(&self, cmd: &[u8], args: &[u8]) -> Result<(), Error> {
        let shared = self.shared()?;
        let mut report = vec![0u8; self.model.feature_report_len];
        report[..cmd.len()].copy_from_slice(cmd);
        report[cmd.len()..cmd.len() + args.len()].copy_from_slice(args);
        let _write = shared.write_lock.lock().unwrap();
        shared.handle.send_feature_report(&report)
    }

    /// Number of keys with displays.
    pub fn keys(&self) -> u8 {
        self.model.keys
    }

    /// Key grid as (columns, rows).
    pub fn key_layout(&self) -> (u8, u8) {
        self.model.key_layout
    }

    /// Size of one key display in pixels.
    pub fn key_size(&self) -> (u32, u32) {
        (self.model.key_pixels, self.model.key_pixels)
    }

    /// Gap between adjacent key displays, in pixels.
    pub fn margin(&self) -> u32 {
        self.model.margin
    }

    /// The key at `index`, if it exists.
    pub fn key(&self, index: u8) -> Option<Key<'_>> {
        (index < self.model.keys).then_some(Key::new(self, index))
    }

    /// The key at grid position (column, row), if it exists.
    pub fn key_at(&self, column: u8, row: u8) -> Option<Key<'_>> {
        self.model.key_at(column, row).map(|index| Key::new(self, index))
    }

    pub fn displays(&self) -> u8 {
        self.model.displays
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.model.display_size
    }

    /// The touch display at `index`, if it exists.
    pub fn display(&self, index: u8) -> Option<Display<'_>> {
        (index < self.model.displays).then_some(Display::new(self, index))
    }

    pub fn encoders(&self) -> u8 {
        self.model.encoders
    }

    /// The rotary encoder at `index`, if it exists.
    pub fn encoder(&self, index: u8) -> Option<Encoder<'_>> {
        (index < self.model.encoders).then_some(Encoder::new(self, index))
    }

    /// Paints every key and touch display black.
    pub fn clear(&self) -> Result<(), Error> {
        let (w, h) = self.key_size();
        let black = DynamicImage::new_rgb8(w, h);
        for index in 0..self.model.keys {
            self.update_key(index, &black, KEY_FILTER)?;
        }
        if self.model.displays > 0 {
            let (w, h) = self.model.display_size;
            let black = DynamicImage::new_rgb8(w, h);
            for index in 0..self.model.displays {
                self.update_display(index, &black, DISPLAY_FILTER)?;
            }
        }
        Ok(())
    }

    pub(crate) fn update_key(
        &self,
        index: u8,
        img: &DynamicImage,
        filter: FilterType,
    ) -> Result<(), Error> {
        let shared = self.shared()?;
        let payload = transfer::key_payload(self.model, img, filter)?;
        trace!(key = index, len = payload.len(), "sending key image");
        let _write = shared.write_lock.lock().unwrap();
        transfer::write_key_pages(shared.handle.as_ref(), self.model, index, &payload)
    }

    pub(crate) fn update_display(
        &self,
        index: u8,
        img: &DynamicImage,
        filter: FilterType,
    ) -> Result<(), Error> {
        let shared = self.shared()?;
        let area = self.model.display_area(index)?;
        let payload = transfer::display_payload(self.model, img, filter)?;
        trace!(display = index, len = payload.len(), "sending display image");
        let _write = shared.write_lock.lock().unwrap();
        transfer::write_display_pages(shared.handle.as_ref(), self.model, index, area, &payload)
    }

    pub(crate) fn default_key_filter() -> FilterType {
        KEY_FILTER
    }

    pub(crate) fn default_display_filter() -> FilterType {
        DISPLAY_FILTER
    }
}

impl Drop for Deck {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn read_loop(model: &'static Model, shared: Arc<Shared>, tx: flume::Sender<Event>) {
    let mut decoder = Decoder::new(model);
    let mut buf = vec![0u8; model.input_report_len()];
    let mut pending = Vec::new();
    loop {
        let n = match shared.handle.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => n,
            Err(err) => {
                if !shared.shutdown.load(Ordering::Acquire) && !err.is_closed() {
                    debug!(model = model.name, error = %err, "read failed, ending stream");
                    // Best effort: a full queue drops the terminal event
                    // rather than blocking teardown.
                    let _ = tx.try_send(Event::new(EventKind::Error(err)));
                }
                return;
            }
        };
        decoder.decode(model, &buf[..n], Instant::now(), &mut pending);
        for event in pending.drain(..) {
            if !deliver(&tx, &shared, event) {
                return;
            }
        }
    }
}

/// Pushes one event, waiting for queue space but giving up on shutdown or
/// when the consumer went away.
fn deliver(tx: &flume::Sender<Event>, shared: &Shared, event: Event) -> bool {
    let mut event = event;
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return false;
        }
        match tx.send_timeout(event, SEND_RETRY_INTERVAL) {
            Ok(()) => return true,
            Err(flume::SendTimeoutError::Timeout(back)) => event = back,
            Err(flume::SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}
