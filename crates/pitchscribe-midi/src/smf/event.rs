//! Track events and their wire encoding.

use byteorder::WriteBytesExt;
use std::io::{self, Write};

/// Largest value a variable-length quantity can hold (four bytes).
pub const VLQ_MAX: u32 = 0x0FFF_FFFF;

/// Note channel (channel 1 on the wire).
pub const CHANNEL: u8 = 0;

const STATUS_NOTE_OFF: u8 = 0x80;
const STATUS_NOTE_ON: u8 = 0x90;
const META: u8 = 0xFF;
const META_TRACK_NAME: u8 = 0x03;
const META_TEMPO: u8 = 0x51;
const META_END_OF_TRACK: u8 = 0x2F;

/// Event payload within a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEventKind {
    TrackName(String),
    Tempo { micros_per_quarter: u32 },
    NoteOff { key: u8 },
    NoteOn { key: u8, velocity: u8 },
    EndOfTrack,
}

impl TrackEventKind {
    /// Ordering among events sharing a tick: metadata, then releases, then
    /// attacks, with end-of-track last.
    pub fn rank(&self) -> u8 {
        match self {
            TrackEventKind::TrackName(_) | TrackEventKind::Tempo { .. } => 0,
            TrackEventKind::NoteOff { .. } => 1,
            TrackEventKind::NoteOn { .. } => 2,
            TrackEventKind::EndOfTrack => 3,
        }
    }

    /// Write the event body (without delta time).
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            TrackEventKind::TrackName(name) => {
                writer.write_u8(META)?;
                writer.write_u8(META_TRACK_NAME)?;
                write_vlq(writer, name.len() as u32)?;
                writer.write_all(name.as_bytes())
            }
            TrackEventKind::Tempo { micros_per_quarter } => {
                writer.write_u8(META)?;
                writer.write_u8(META_TEMPO)?;
                writer.write_u8(3)?;
                // 24-bit big-endian
                let tempo = micros_per_quarter & 0x00FF_FFFF;
                writer.write_all(&tempo.to_be_bytes()[1..])
            }
            TrackEventKind::NoteOff { key } => {
                writer.write_u8(STATUS_NOTE_OFF | CHANNEL)?;
                writer.write_u8(key & 0x7F)?;
                writer.write_u8(0)
            }
            TrackEventKind::NoteOn { key, velocity } => {
                writer.write_u8(STATUS_NOTE_ON | CHANNEL)?;
                writer.write_u8(key & 0x7F)?;
                writer.write_u8((*velocity).min(127))
            }
            TrackEventKind::EndOfTrack => {
                writer.write_u8(META)?;
                writer.write_u8(META_END_OF_TRACK)?;
                writer.write_u8(0)
            }
        }
    }
}

/// An event positioned at an absolute tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    pub tick: u64,
    pub kind: TrackEventKind,
}

impl TrackEvent {
    pub fn new(tick: u64, kind: TrackEventKind) -> Self {
        Self { tick, kind }
    }
}

/// Write a MIDI variable-length quantity (7 bits per byte, big-endian,
/// continuation bit set on all but the last byte).
///
/// Values above [`VLQ_MAX`] are rejected.
pub fn write_vlq<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    if value > VLQ_MAX {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("value {} exceeds variable-length quantity range", value),
        ));
    }

    let mut buf = [0u8; 4];
    let mut idx = buf.len() - 1;
    let mut rest = value;
    buf[idx] = (rest & 0x7F) as u8;
    rest >>= 7;
    while rest > 0 {
        idx -= 1;
        buf[idx] = ((rest & 0x7F) as u8) | 0x80;
        rest >>= 7;
    }

    writer.write_all(&buf[idx..])
}
