//! Response bodies for the HTTP service.

use pitchscribe_midi::NoteEvent;
use serde::Serialize;

/// Successful analysis of one upload.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    /// Estimated fundamental frequency per frame in Hz (0 when unvoiced).
    pub frequencies: Vec<f64>,
    /// Voicing confidence per frame in [0, 1].
    pub confidence: Vec<f64>,
    /// Frame times in seconds.
    pub times: Vec<f64>,
    /// Standard MIDI File, base64 encoded (standard alphabet, padded).
    pub midi: String,
    /// Notes written to the MIDI file.
    pub notes: Vec<NoteEvent>,
    /// BLAKE3 hex digest of the uploaded bytes.
    pub input_hash: String,
}

/// Health check body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Failure body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable error code (see [`super::error_codes`]).
    pub code: String,
}
