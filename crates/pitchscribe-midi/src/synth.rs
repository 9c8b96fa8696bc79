//! Note synthesis: pitch track to note events to MIDI bytes.
//!
//! Every frame whose confidence exceeds the threshold and whose frequency is
//! positive becomes one independent note. Frames are never merged, so a
//! sustained pitch produces a run of overlapping notes at the same key.

use pitchscribe_track::PitchTrack;
use serde::Serialize;
use tracing::debug;

use crate::error::MidiError;
use crate::note::{freq_to_midi, freq_to_midi_exact};
use crate::smf::{MidiDocument, NoteEvent, TimingMode, DEFAULT_TEMPO_BPM, DEFAULT_TRACK_NAME};

/// Minimum confidence (exclusive) for a frame to produce a note.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Fixed note length.
pub const DEFAULT_NOTE_DURATION: f64 = 0.25;

/// Fixed note-on velocity.
pub const DEFAULT_VELOCITY: u8 = 100;

/// Synthesis parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    pub confidence_threshold: f64,
    pub note_duration: f64,
    pub velocity: u8,
    pub tempo_bpm: u32,
    pub track_name: String,
    pub timing: TimingMode,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            note_duration: DEFAULT_NOTE_DURATION,
            velocity: DEFAULT_VELOCITY,
            tempo_bpm: DEFAULT_TEMPO_BPM,
            track_name: DEFAULT_TRACK_NAME.to_string(),
            timing: TimingMode::default(),
        }
    }
}

/// Per-frame outcome counts for one synthesis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SynthesisReport {
    /// Frames examined.
    pub frames: usize,
    /// Notes emitted.
    pub notes: usize,
    /// Frames at or below the confidence threshold.
    pub skipped_low_confidence: usize,
    /// Confident frames without a pitch.
    pub skipped_unvoiced: usize,
    /// Confident, voiced frames whose note falls outside 0-127.
    pub skipped_out_of_range: usize,
}

/// Notes produced from a pitch track.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub notes: Vec<NoteEvent>,
    pub report: SynthesisReport,
}

/// Encoded MIDI file along with the notes it contains.
#[derive(Debug, Clone)]
pub struct RenderedMidi {
    pub bytes: Vec<u8>,
    pub notes: Vec<NoteEvent>,
    pub report: SynthesisReport,
}

/// Converts pitch tracks into MIDI.
///
/// Holds no per-call state; one instance can serve any number of tracks.
#[derive(Debug, Clone, Default)]
pub struct NoteSynthesizer {
    options: SynthesisOptions,
}

impl NoteSynthesizer {
    pub fn new(options: SynthesisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    /// Select note events from a track, in frame order.
    pub fn notes(&self, track: &PitchTrack) -> Synthesis {
        let mut report = SynthesisReport {
            frames: track.len(),
            ..Default::default()
        };
        let mut notes = Vec::new();

        for (index, frame) in track.frames().enumerate() {
            if frame.confidence.is_nan() || frame.confidence <= self.options.confidence_threshold {
                report.skipped_low_confidence += 1;
                continue;
            }
            if !frame.is_voiced() {
                report.skipped_unvoiced += 1;
                continue;
            }
            let Some(pitch) = freq_to_midi(frame.frequency) else {
                debug!(
                    index,
                    frequency = frame.frequency,
                    note = freq_to_midi_exact(frame.frequency),
                    "skipping frame outside MIDI note range"
                );
                report.skipped_out_of_range += 1;
                continue;
            };

            notes.push(NoteEvent {
                pitch,
                start: frame.time,
                duration: self.options.note_duration,
                velocity: self.options.velocity,
            });
        }

        report.notes = notes.len();
        Synthesis { notes, report }
    }

    /// Build the MIDI document for a track.
    pub fn document(&self, track: &PitchTrack) -> (MidiDocument, SynthesisReport) {
        let Synthesis { notes, report } = self.notes(track);
        let mut doc = MidiDocument::new(&self.options.track_name, self.options.tempo_bpm)
            .with_timing(self.options.timing);
        doc.notes = notes;
        (doc, report)
    }

    /// Build and encode the MIDI file for a track.
    pub fn render(&self, track: &PitchTrack) -> Result<RenderedMidi, MidiError> {
        let (doc, report) = self.document(track);
        let bytes = doc.to_bytes()?;
        Ok(RenderedMidi {
            bytes,
            notes: doc.notes,
            report,
        })
    }
}

/// Convert parallel frequency, confidence and time sequences to MIDI bytes
/// with the default options.
pub fn convert_to_midi(
    frequencies: &[f64],
    confidence: &[f64],
    times: &[f64],
) -> Result<Vec<u8>, MidiError> {
    let track = PitchTrack::from_slices(times, frequencies, confidence)?;
    Ok(NoteSynthesizer::default().render(&track)?.bytes)
}
