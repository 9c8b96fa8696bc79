//! Standard MIDI File (SMF) encoding.
//!
//! Documents are written as format 0 files: one `MThd` header chunk followed
//! by a single `MTrk` chunk holding the track name, the tempo, the notes and
//! an end-of-track marker.

mod document;
mod event;
mod writer;

pub use document::{MidiDocument, NoteEvent, TimingMode, DEFAULT_TEMPO_BPM, DEFAULT_TRACK_NAME};
pub use event::{write_vlq, TrackEvent, TrackEventKind, VLQ_MAX};

/// Header chunk identifier.
pub const HEADER_MAGIC: &[u8; 4] = b"MThd";

/// Track chunk identifier.
pub const TRACK_MAGIC: &[u8; 4] = b"MTrk";

/// Time division in ticks per quarter note.
pub const TICKS_PER_QUARTER: u16 = 960;
