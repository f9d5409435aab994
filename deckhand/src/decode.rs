//! Turns raw input reports into typed events.
//!
//! The decoder is edge-triggered: it keeps the last known key and encoder
//! switch states and only emits events on changes, so duplicate reports are
//! free. Time is passed in by the caller, which keeps the state machine
//! deterministic under test.

use std::time::Instant;

use tracing::trace;

use crate::event::{Event, EventKind, Point, TouchKind};
use crate::model::{Model, ReportRouting};

/// Resolution of encoder rotation deltas, in bits.
const ENCODER_DELTA_BITS: u8 = 8;

/// Multiplexed report discriminators (second report byte).
const REPORT_KEYS: u8 = 0x00;
const REPORT_TOUCH: u8 = 0x02;
const REPORT_ENCODER: u8 = 0x03;

/// Touch sub-types.
const TOUCH_SHORT: u8 = 0x01;
const TOUCH_LONG: u8 = 0x02;
const TOUCH_SWIPE: u8 = 0x03;

/// Encoder sub-types.
const ENCODER_SWITCH: u8 = 0x00;
const ENCODER_ROTATE: u8 = 0x01;

pub(crate) struct Decoder {
    key_down: Vec<bool>,
    key_since: Vec<Option<Instant>>,
    encoder_down: Vec<bool>,
    encoder_since: Vec<Option<Instant>>,
}

impl Decoder {
    pub(crate) fn new(model: &Model) -> Self {
        Self {
            key_down: vec![false; model.keys as usize],
            key_since: vec![None; model.keys as usize],
            encoder_down: vec![false; model.encoders as usize],
            encoder_since: vec![None; model.encoders as usize],
        }
    }

    /// Decodes one raw report, appending any resulting events to `out`.
    pub(crate) fn decode(
        &mut self,
        model: &Model,
        report: &[u8],
        now: Instant,
        out: &mut Vec<Event>,
    ) {
        match model.routing {
            ReportRouting::Keys => self.decode_keys(model, report, now, out),
            ReportRouting::Multiplexed => {
                let Some(&kind) = report.get(1) else { return };
                match kind {
                    REPORT_KEYS => self.decode_keys(model, report, now, out),
                    REPORT_TOUCH => self.decode_touch(model, report, now, out),
                    REPORT_ENCODER => self.decode_encoder(model, report, now, out),
                    other => trace!(discriminator = other, "ignoring unknown report"),
                }
            }
        }
    }

    fn decode_keys(&mut self, model: &Model, report: &[u8], now: Instant, out: &mut Vec<Event>) {
        for physical in 0..model.keys {
            let Some(&state) = report.get(model.key_data_offset + physical as usize) else {
                break;
            };
            let key = model.translate_key(physical);
            let slot = key as usize;
            let down = state != 0;
            if down == self.key_down[slot] {
                continue;
            }
            self.key_down[slot] = down;
            if down {
                self.key_since[slot] = Some(now);
                out.push(Event::at(now, EventKind::KeyPress { key }));
            } else {
                let held = self
                    .key_since[slot]
                    .take()
                    .map(|since| now.duration_since(since))
                    .unwrap_or_default();
                out.push(Event::at(now, EventKind::KeyRelease { key, held }));
            }
        }
    }

    fn decode_encoder(&mut self, model: &Model, report: &[u8], now: Instant, out: &mut Vec<Event>) {
        let offset = model.key_data_offset;
        let Some(&kind) = report.get(offset) else { return };
        match kind {
            ENCODER_SWITCH => {
                for index in 0..model.encoders {
                    let Some(&state) = report.get(offset + 1 + index as usize) else {
                        break;
                    };
                    let slot = index as usize;
                    let down = state != 0;
                    if down == self.encoder_down[slot] {
                        continue;
                    }
                    self.encoder_down[slot] = down;
                    if down {
                        self.encoder_since[slot] = Some(now);
                        out.push(Event::at(now, EventKind::EncoderPress { encoder: index }));
                    } else {
                        let held = self
                            .encoder_since[slot]
                            .take()
                            .map(|since| now.duration_since(since))
                            .unwrap_or_default();
                        out.push(Event::at(
                            now,
                            EventKind::EncoderRelease { encoder: index, held },
                        ));
                    }
                }
            }
            ENCODER_ROTATE => {
                for index in 0..model.encoders {
                    let Some(&raw) = report.get(offset + 1 + index as usize) else {
                        break;
                    };
                    let delta = raw as i8;
                    if delta == 0 {
                        continue;
                    }
                    out.push(Event::at(
                        now,
                        EventKind::EncoderChange {
                            encoder: index,
                            delta,
                            bits: ENCODER_DELTA_BITS,
                        },
                    ));
                }
            }
            other => trace!(sub = other, "ignoring unknown encoder report"),
        }
    }

    fn decode_touch(&mut self, model: &Model, report: &[u8], now: Instant, out: &mut Vec<Event>) {
        let offset = model.key_data_offset;
        let Some(&kind) = report.get(offset) else { return };
        let Some(at) = point_at(report, offset + 2) else { return };
        let (width, _) = model.display_size;
        if width == 0 {
            return;
        }
        let display = (at.x / width as u16) as u8;
        if display >= model.displays {
            trace!(x = at.x, "ignoring touch outside the display strip");
            return;
        }
        match kind {
            TOUCH_SHORT => out.push(Event::at(
                now,
                EventKind::Touch { display, at, kind: TouchKind::Short },
            )),
            TOUCH_LONG => out.push(Event::at(
                now,
                EventKind::Touch { display, at, kind: TouchKind::Long },
            )),
            TOUCH_SWIPE => {
                let Some(to) = point_at(report, offset + 6) else { return };
                out.push(Event::at(now, EventKind::Swipe { display, from: at, to }));
            }
            other => trace!(sub = other, "ignoring unknown touch report"),
        }
    }
}

fn point_at(report: &[u8], offset: usize) -> Option<Point> {
    let x = u16::from_le_bytes([*report.get(offset)?, *report.get(offset + 1)?]);
    let y = u16::from_le_bytes([*report.get(offset + 2)?, *report.get(offset + 3)?]);
    Some(Point { x, y })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::streamdeck;

    /// A key report for the given model with the listed physical keys down.
    fn key_report(model: &Model, down: &[u8]) -> Vec<u8> {
        let mut report = vec![0u8; model.input_report_len()];
        report[0] = 0x01;
        for &physical in down {
            report[model.key_data_offset + physical as usize] = 0x01;
        }
        report
    }

    fn drain(decoder: &mut Decoder, model: &Model, report: &[u8], now: Instant) -> Vec<Event> {
        let mut out = Vec::new();
        decoder.decode(model, report, now, &mut out);
        out
    }

    #[test]
    fn press_then_release_with_held_duration() {
        let model = &streamdeck::V2;
        let mut decoder = Decoder::new(model);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(150);

        let events = drain(&mut decoder, model, &key_report(model, &[3]), t0);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].kind, EventKind::KeyPress { key: 3 }));

        let events = drain(&mut decoder, model, &key_report(model, &[]), t1);
        assert_eq!(events.len(), 1);
        match events[0].kind {
            EventKind::KeyRelease { key, held } => {
                assert_eq!(key, 3);
                assert_eq!(held, Duration::from_millis(150));
            }
            ref other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn duplicate_reports_emit_nothing() {
        let model = &streamdeck::V2;
        let mut decoder = Decoder::new(model);
        let now = Instant::now();

        let report = key_report(model, &[0, 5]);
        assert_eq!(drain(&mut decoder, model, &report, now).len(), 2);
        assert!(drain(&mut decoder, model, &report, now).is_empty());
    }

    #[test]
    fn mirrored_models_report_logical_indices() {
        let model = &streamdeck::MINI;
        let mut decoder = Decoder::new(model);
        let now = Instant::now();

        let events = drain(&mut decoder, model, &key_report(model, &[0]), now);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].kind,
            EventKind::KeyPress { key } if key == model.keys - 1
        ));
    }

    #[test]
    fn truncated_report_is_partial_not_fatal() {
        let model = &streamdeck::V2;
        let mut decoder = Decoder::new(model);
        let now = Instant::now();

        let mut report = key_report(model, &[1]);
        report.truncate(model.key_data_offset + 4);
        let events = drain(&mut decoder, model, &report, now);
        assert_eq!(events.len(), 1);
    }

    fn encoder_report(model: &Model, sub: u8, values: &[u8]) -> Vec<u8> {
        let mut report = vec![0u8; model.input_report_len()];
        report[0] = 0x01;
        report[1] = REPORT_ENCODER;
        report[model.key_data_offset] = sub;
        for (i, &value) in values.iter().enumerate() {
            report[model.key_data_offset + 1 + i] = value;
        }
        report
    }

    #[test]
    fn encoder_press_and_release() {
        let model = &streamdeck::PLUS;
        let mut decoder = Decoder::new(model);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(40);

        let events = drain(
            &mut decoder,
            model,
            &encoder_report(model, ENCODER_SWITCH, &[0, 1, 0, 0]),
            t0,
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].kind, EventKind::EncoderPress { encoder: 1 }));

        let events = drain(
            &mut decoder,
            model,
            &encoder_report(model, ENCODER_SWITCH, &[0, 0, 0, 0]),
            t1,
        );
        assert_eq!(events.len(), 1);
        match events[0].kind {
            EventKind::EncoderRelease { encoder, held } => {
                assert_eq!(encoder, 1);
                assert_eq!(held, Duration::from_millis(40));
            }
            ref other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn encoder_rotation_is_signed_and_skips_zero() {
        let model = &streamdeck::PLUS;
        let mut decoder = Decoder::new(model);
        let now = Instant::now();

        let events = drain(
            &mut decoder,
            model,
            &encoder_report(model, ENCODER_ROTATE, &[0xff, 0, 2, 0]),
            now,
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0].kind,
            EventKind::EncoderChange { encoder: 0, delta: -1, bits: 8 }
        ));
        assert!(matches!(
            events[1].kind,
            EventKind::EncoderChange { encoder: 2, delta: 2, bits: 8 }
        ));
    }

    fn touch_report(model: &Model, sub: u8, from: (u16, u16), to: (u16, u16)) -> Vec<u8> {
        let mut report = vec![0u8; model.input_report_len()];
        report[0] = 0x01;
        report[1] = REPORT_TOUCH;
        let offset = model.key_data_offset;
        report[offset] = sub;
        report[offset + 2..offset + 4].copy_from_slice(&from.0.to_le_bytes());
        report[offset + 4..offset + 6].copy_from_slice(&from.1.to_le_bytes());
        report[offset + 6..offset + 8].copy_from_slice(&to.0.to_le_bytes());
        report[offset + 8..offset + 10].copy_from_slice(&to.1.to_le_bytes());
        report
    }

    #[test]
    fn touch_maps_x_to_display_index() {
        let model = &streamdeck::PLUS;
        let mut decoder = Decoder::new(model);
        let now = Instant::now();

        let events = drain(
            &mut decoder,
            model,
            &touch_report(model, TOUCH_SHORT, (450, 30), (0, 0)),
            now,
        );
        assert_eq!(events.len(), 1);
        match events[0].kind {
            EventKind::Touch { display, at, kind } => {
                assert_eq!(display, 2);
                assert_eq!(at, Point { x: 450, y: 30 });
                assert_eq!(kind, TouchKind::Short);
            }
            ref other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn long_press_and_swipe() {
        let model = &streamdeck::PLUS;
        let mut decoder = Decoder::new(model);
        let now = Instant::now();

        let events = drain(
            &mut decoder,
            model,
            &touch_report(model, TOUCH_LONG, (10, 10), (0, 0)),
            now,
        );
        assert!(matches!(
            events[0].kind,
            EventKind::Touch { display: 0, kind: TouchKind::Long, .. }
        ));

        let events = drain(
            &mut decoder,
            model,
            &touch_report(model, TOUCH_SWIPE, (100, 50), (700, 50)),
            now,
        );
        assert_eq!(events.len(), 1);
        match events[0].kind {
            EventKind::Swipe { display, from, to } => {
                assert_eq!(display, 0);
                assert_eq!(from, Point { x: 100, y: 50 });
                assert_eq!(to, Point { x: 700, y: 50 });
            }
            ref other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_discriminators_are_ignored() {
        let model = &streamdeck::PLUS;
        let mut decoder = Decoder::new(model);
        let now = Instant::now();

        let mut report = vec![0u8; model.input_report_len()];
        report[0] = 0x01;
        report[1] = 0x7f;
        assert!(drain(&mut decoder, model, &report, now).is_empty());

        let report = touch_report(model, 0x09, (10, 10), (0, 0));
        assert!(drain(&mut decoder, model, &report, now).is_empty());
    }
}
