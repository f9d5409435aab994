//! User-interaction events and the per-session event stream.

use std::fmt;
use std::time::{Duration, Instant};

use crate::Error;

/// A point on a touch display, in display pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Distinguishes short taps from long presses on a touch display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchKind {
    Short,
    Long,
}

/// A decoded device event with the time it was decoded at.
#[derive(Debug)]
pub struct Event {
    pub at: Instant,
    pub kind: EventKind,
}

impl Event {
    pub(crate) fn new(kind: EventKind) -> Self {
        Self { at: Instant::now(), kind }
    }

    pub(crate) fn at(at: Instant, kind: EventKind) -> Self {
        Self { at, kind }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// What happened on the device. Every variant carries peripheral indices
/// rather than peripheral handles; resolve indices through the session when
/// the peripheral itself is needed.
#[derive(Debug)]
pub enum EventKind {
    KeyPress {
        key: u8,
    },
    KeyRelease {
        key: u8,
        /// Time the key spent pressed.
        held: Duration,
    },
    EncoderPress {
        encoder: u8,
    },
    EncoderRelease {
        encoder: u8,
        held: Duration,
    },
    EncoderChange {
        encoder: u8,
        /// Signed rotation since the previous report.
        delta: i8,
        /// Resolution of `delta` in bits.
        bits: u8,
    },
    Touch {
        display: u8,
        at: Point,
        kind: TouchKind,
    },
    TouchEnd {
        display: u8,
        at: Point,
    },
    Swipe {
        display: u8,
        from: Point,
        to: Point,
    },
    /// Terminal: the transport failed and the stream is about to close.
    Error(Error),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyPress { key } => write!(f, "key {key} pressed"),
            Self::KeyRelease { key, held } => {
                write!(f, "key {key} released after {held:?}")
            }
            Self::EncoderPress { encoder } => write!(f, "encoder {encoder} pressed"),
            Self::EncoderRelease { encoder, held } => {
                write!(f, "encoder {encoder} released after {held:?}")
            }
            Self::EncoderChange { encoder, delta, .. } => {
                write!(f, "encoder {encoder} turned by {delta}")
            }
            Self::Touch { display, at, kind } => match kind {
                TouchKind::Short => write!(f, "display {display} touched at {at}"),
                TouchKind::Long => write!(f, "display {display} long-pressed at {at}"),
            },
            Self::TouchEnd { display, at } => {
                write!(f, "display {display} touch ended at {at}")
            }
            Self::Swipe { display, from, to } => {
                write!(f, "display {display} swiped from {from} to {to}")
            }
            Self::Error(err) => write!(f, "device error: {err}"),
        }
    }
}

/// A FIFO stream of events from one open session.
///
/// The stream ends when the session is closed or after a terminal
/// [`EventKind::Error`] event.
pub struct EventStream {
    rx: flume::Receiver<Event>,
}

impl EventStream {
    pub(crate) fn new(rx: flume::Receiver<Event>) -> Self {
        Self { rx }
    }

    /// Blocks until the next event, or `None` once the stream has ended.
    pub fn recv(&self) -> Option<Event> {
        self.rx.recv().ok()
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// A blocking iterator over the remaining events.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.rx.iter()
    }
}

impl IntoIterator for EventStream {
    type Item = Event;
    type IntoIter = flume::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.rx.into_iter()
    }
}
