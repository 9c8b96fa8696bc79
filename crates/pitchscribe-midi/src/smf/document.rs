//! In-memory MIDI document: one named track at a fixed tempo.

use serde::Serialize;

/// Default tempo in beats per minute.
pub const DEFAULT_TEMPO_BPM: u32 = 120;

/// Default track name.
pub const DEFAULT_TRACK_NAME: &str = "Voice Track";

/// How note times (in seconds) become beat positions in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// Seconds are written unchanged as beat positions. At 120 BPM the file
    /// plays back at twice the length of the recording.
    #[default]
    SecondsAsBeats,
    /// Seconds are scaled by `bpm / 60` so playback matches the recording.
    WallClock,
}

impl TimingMode {
    /// Convert a time value in seconds to beats at `tempo_bpm`.
    pub fn to_beats(self, seconds: f64, tempo_bpm: u32) -> f64 {
        match self {
            TimingMode::SecondsAsBeats => seconds,
            TimingMode::WallClock => seconds * tempo_bpm as f64 / 60.0,
        }
    }
}

/// A note to be written to the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteEvent {
    /// MIDI note number (0-127).
    pub pitch: u8,
    /// Start position in seconds.
    pub start: f64,
    /// Length in seconds.
    pub duration: f64,
    /// Note-on velocity (0-127).
    pub velocity: u8,
}

/// Single-track MIDI document.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiDocument {
    /// Track name written as a meta event at tick 0.
    pub track_name: String,
    /// Tempo written as a meta event at tick 0.
    pub tempo_bpm: u32,
    /// Interpretation of note times.
    pub timing: TimingMode,
    /// Notes in the order they were produced.
    pub notes: Vec<NoteEvent>,
}

impl Default for MidiDocument {
    fn default() -> Self {
        Self::new(DEFAULT_TRACK_NAME, DEFAULT_TEMPO_BPM)
    }
}

impl MidiDocument {
    /// Create an empty document.
    pub fn new(track_name: &str, tempo_bpm: u32) -> Self {
        Self {
            track_name: track_name.to_string(),
            tempo_bpm,
            timing: TimingMode::default(),
            notes: Vec::new(),
        }
    }

    /// Set the timing mode.
    pub fn with_timing(mut self, timing: TimingMode) -> Self {
        self.timing = timing;
        self
    }

    /// Append a note.
    pub fn add_note(&mut self, note: NoteEvent) {
        self.notes.push(note);
    }

    /// Tempo as microseconds per quarter note.
    pub fn micros_per_quarter(&self) -> u32 {
        60_000_000 / self.tempo_bpm.max(1)
    }
}
