//! Standard MIDI File writer - assembles a document into a format 0 file.

use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

use super::document::MidiDocument;
use super::event::{write_vlq, TrackEvent, TrackEventKind, VLQ_MAX};
use super::{HEADER_MAGIC, TICKS_PER_QUARTER, TRACK_MAGIC};
use crate::error::MidiError;

/// SMF format 0: a single multi-channel track.
const FORMAT_SINGLE_TRACK: u16 = 0;

/// Number of MIDI keys.
const KEY_COUNT: usize = 128;

impl MidiDocument {
    /// Write the complete MIDI file to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), MidiError> {
        self.validate_tempo()?;
        let body = self.track_body()?;

        // Header chunk
        writer.write_all(HEADER_MAGIC)?;
        writer.write_u32::<BigEndian>(6)?;
        writer.write_u16::<BigEndian>(FORMAT_SINGLE_TRACK)?;
        writer.write_u16::<BigEndian>(1)?;
        writer.write_u16::<BigEndian>(TICKS_PER_QUARTER)?;

        // Track chunk
        writer.write_all(TRACK_MAGIC)?;
        writer.write_u32::<BigEndian>(body.len() as u32)?;
        writer.write_all(&body)?;

        Ok(())
    }

    /// Write the document to a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MidiError> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(buffer)
    }

    /// Convert a time in seconds to an absolute tick.
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        let beats = self.timing.to_beats(seconds, self.tempo_bpm);
        // NaN and negative positions saturate to tick 0
        (beats * TICKS_PER_QUARTER as f64).round().max(0.0) as u64
    }

    /// Absolute-time events in file order, including end-of-track.
    pub fn track_events(&self) -> Vec<TrackEvent> {
        let micros_per_quarter = self.micros_per_quarter();
        let mut events = vec![
            TrackEvent::new(0, TrackEventKind::TrackName(self.track_name.clone())),
            TrackEvent::new(0, TrackEventKind::Tempo { micros_per_quarter }),
        ];

        for span in self.note_spans() {
            events.push(TrackEvent::new(
                span.on,
                TrackEventKind::NoteOn {
                    key: span.key,
                    velocity: span.velocity,
                },
            ));
            events.push(TrackEvent::new(
                span.off,
                TrackEventKind::NoteOff { key: span.key },
            ));
        }

        events.sort_by_key(|e| (e.tick, e.kind.rank()));

        let last_tick = events.last().map(|e| e.tick).unwrap_or(0);
        events.push(TrackEvent::new(last_tick, TrackEventKind::EndOfTrack));
        events
    }

    /// The tempo must fit the 24-bit microseconds-per-quarter field.
    fn validate_tempo(&self) -> Result<(), MidiError> {
        if !(4..=60_000_000).contains(&self.tempo_bpm) {
            return Err(MidiError::InvalidTempo(self.tempo_bpm));
        }
        Ok(())
    }

    fn track_body(&self) -> Result<Vec<u8>, MidiError> {
        let mut body = Vec::new();
        let mut previous_tick = 0u64;
        for event in self.track_events() {
            let delta = event.tick - previous_tick;
            if delta > VLQ_MAX as u64 {
                return Err(MidiError::DeltaOverflow(delta));
            }
            write_vlq(&mut body, delta as u32)?;
            event.kind.write(&mut body)?;
            previous_tick = event.tick;
        }
        Ok(body)
    }

    /// Resolve notes to tick spans.
    ///
    /// A note still sounding when the next note of the same key starts is
    /// cut at that start, so every note-on pairs with exactly one later
    /// note-off. Spans that end up empty are dropped.
    fn note_spans(&self) -> Vec<NoteSpan> {
        let mut spans: Vec<NoteSpan> = self
            .notes
            .iter()
            .map(|note| {
                let on = self.seconds_to_ticks(note.start);
                let off = self.seconds_to_ticks(note.start + note.duration).max(on);
                NoteSpan {
                    key: note.pitch.min(127),
                    velocity: note.velocity,
                    on,
                    off,
                }
            })
            .collect();
        spans.sort_by_key(|s| s.on);

        let mut sounding: [Option<usize>; KEY_COUNT] = [None; KEY_COUNT];
        for idx in 0..spans.len() {
            let key = spans[idx].key as usize;
            if let Some(prev) = sounding[key] {
                if spans[prev].off > spans[idx].on {
                    spans[prev].off = spans[idx].on;
                }
            }
            sounding[key] = Some(idx);
        }

        spans.retain(|s| s.off > s.on);
        spans
    }
}

#[derive(Debug, Clone, Copy)]
struct NoteSpan {
    key: u8,
    velocity: u8,
    on: u64,
    off: u64,
}
