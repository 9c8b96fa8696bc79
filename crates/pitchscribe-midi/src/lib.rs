//! pitchscribe MIDI backend - pitch track to Standard MIDI File conversion
//!
//! This crate turns a pitch track (parallel time / frequency / confidence
//! sequences) into a single-track MIDI file. The conversion is deterministic
//! and stateless: given the same track and options the output bytes are
//! identical.
//!
//! # Example
//!
//! ```
//! use pitchscribe_midi::convert_to_midi;
//!
//! let bytes = convert_to_midi(&[440.0, 0.0, 880.0], &[0.9, 0.9, 0.4], &[0.0, 0.25, 0.5])?;
//! assert_eq!(&bytes[..4], b"MThd");
//! # Ok::<(), pitchscribe_midi::MidiError>(())
//! ```
//!
//! # Module Structure
//!
//! - [`note`]: Frequency / MIDI note conversion
//! - [`synth`]: Frame selection and note assembly
//! - [`smf`]: Standard MIDI File writer

pub mod error;
pub mod note;
pub mod smf;
pub mod synth;

pub use error::MidiError;
pub use note::{freq_to_midi, midi_to_freq};
pub use smf::{MidiDocument, NoteEvent, TimingMode};
pub use synth::{
    convert_to_midi, NoteSynthesizer, RenderedMidi, Synthesis, SynthesisOptions, SynthesisReport,
};
