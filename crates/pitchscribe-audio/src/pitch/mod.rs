//! Monophonic pitch tracking.
//!
//! [`PitchModel`] is the seam between the request pipeline and whatever
//! estimates fundamental frequency. A model is built once, shared behind an
//! `Arc`, and called concurrently: implementations must be `Send + Sync` and
//! keep `predict` free of interior mutation.
//!
//! [`YinTracker`] is the built-in model: a YIN difference function computed
//! with FFT cross-correlation, a handful of candidate periods per frame, and
//! Viterbi decoding over the candidates so the track favours smooth pitch
//! movement over frame-by-frame octave jumps.

mod viterbi;
mod yin;


use pitchscribe_track::PitchTrack;
use thiserror::Error;

pub use viterbi::{decode_argmax, decode_viterbi, Candidate, FrameCandidates, TransitionCosts};
pub use yin::{Decoding, YinConfig, YinTracker, DEFAULT_HOP_LENGTH};

/// Error type for pitch tracking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PitchError {
    /// Input was not at the rate the model runs at.
    #[error("Sample rate mismatch: model expects {expected} Hz, got {actual} Hz")]
    SampleRate { expected: u32, actual: u32 },

    /// Input contains NaN or infinite samples.
    #[error("Non-finite sample at index {0}")]
    NonFiniteSample(usize),

    /// Model parameters are inconsistent.
    #[error("Invalid pitch model configuration: {0}")]
    InvalidConfig(String),
}

/// Estimates fundamental frequency over time.
pub trait PitchModel: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Sample rate the model expects.
    fn sample_rate(&self) -> u32;

    /// Seconds between consecutive frames.
    fn hop_seconds(&self) -> f64;

    /// Run the model over mono samples.
    ///
    /// Returns equal-length time, frequency and confidence sequences; frames
    /// without a pitch carry frequency `0.0`.
    fn predict(&self, samples: &[f32], sample_rate: u32) -> Result<PitchTrack, PitchError>;
}
