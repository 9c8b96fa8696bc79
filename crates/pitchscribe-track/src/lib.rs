//! Pitch-track types shared by the pitch tracker and the note synthesizer.
//!
//! A pitch tracker produces three parallel sequences of equal length: frame
//! timestamps in seconds, fundamental frequency estimates in Hz (`0.0` marks
//! an unvoiced frame), and a confidence score in `[0, 1]`. [`PitchTrack`]
//! keeps those sequences together and guarantees they stay the same length.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frequency value reported for frames without a detectable pitch.
pub const UNVOICED: f64 = 0.0;

/// Error type for pitch-track construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// The parallel sequences do not have the same length.
    #[error(
        "pitch track sequences differ in length: {times} times, {frequencies} frequencies, {confidence} confidence values"
    )]
    LengthMismatch {
        times: usize,
        frequencies: usize,
        confidence: usize,
    },
}

/// A single pitch estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchFrame {
    /// Frame position in seconds.
    pub time: f64,
    /// Estimated fundamental frequency in Hz, `0.0` when unvoiced.
    pub frequency: f64,
    /// Confidence that the frame holds a genuine pitch, in `[0, 1]`.
    pub confidence: f64,
}

impl PitchFrame {
    /// Returns true if the frame carries a pitch estimate.
    pub fn is_voiced(&self) -> bool {
        self.frequency > UNVOICED
    }
}

/// Ordered pitch estimates stored as three parallel sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PitchTrack {
    times: Vec<f64>,
    frequencies: Vec<f64>,
    confidence: Vec<f64>,
}

impl PitchTrack {
    /// Builds a track from parallel sequences, rejecting mismatched lengths.
    pub fn new(
        times: Vec<f64>,
        frequencies: Vec<f64>,
        confidence: Vec<f64>,
    ) -> Result<Self, TrackError> {
        if times.len() != frequencies.len() || times.len() != confidence.len() {
            return Err(TrackError::LengthMismatch {
                times: times.len(),
                frequencies: frequencies.len(),
                confidence: confidence.len(),
            });
        }

        Ok(Self {
            times,
            frequencies,
            confidence,
        })
    }

    /// Builds a track from parallel slices.
    pub fn from_slices(
        times: &[f64],
        frequencies: &[f64],
        confidence: &[f64],
    ) -> Result<Self, TrackError> {
        Self::new(times.to_vec(), frequencies.to_vec(), confidence.to_vec())
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn confidence(&self) -> &[f64] {
        &self.confidence
    }

    /// Returns the frame at `index`, if any.
    pub fn frame(&self, index: usize) -> Option<PitchFrame> {
        Some(PitchFrame {
            time: *self.times.get(index)?,
            frequency: self.frequencies[index],
            confidence: self.confidence[index],
        })
    }

    /// Iterates frames in index order.
    pub fn frames(&self) -> impl Iterator<Item = PitchFrame> + '_ {
        self.times
            .iter()
            .zip(&self.frequencies)
            .zip(&self.confidence)
            .map(|((&time, &frequency), &confidence)| PitchFrame {
                time,
                frequency,
                confidence,
            })
    }

    /// Splits the track back into `(times, frequencies, confidence)`.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (self.times, self.frequencies, self.confidence)
    }
}

impl FromIterator<PitchFrame> for PitchTrack {
    fn from_iter<I: IntoIterator<Item = PitchFrame>>(iter: I) -> Self {
        let mut track = PitchTrack::default();
        for frame in iter {
            track.times.push(frame.time);
            track.frequencies.push(frame.frequency);
            track.confidence.push(frame.confidence);
        }
        track
    }
}
