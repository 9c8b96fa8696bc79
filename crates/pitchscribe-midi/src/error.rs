//! Error type for MIDI synthesis and encoding.

use pitchscribe_track::TrackError;
use thiserror::Error;

/// Error type for MIDI rendering.
#[derive(Debug, Error)]
pub enum MidiError {
    /// Input sequences differ in length.
    #[error("Invalid pitch track: {0}")]
    LengthMismatch(#[from] TrackError),

    /// Tempo cannot be written as a 24-bit microseconds-per-quarter value.
    #[error("Tempo out of range: {0} BPM")]
    InvalidTempo(u32),

    /// Gap between two events exceeds the variable-length quantity range.
    #[error("Delta time of {0} ticks exceeds the MIDI limit")]
    DeltaOverflow(u64),

    /// IO error during writing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
