//! Failure kinds of the analysis endpoint and their HTTP mapping.

use std::time::Duration;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pitchscribe_audio::{DecodeError, PitchError};
use pitchscribe_midi::MidiError;
use thiserror::Error;
use tracing::warn;

use super::types::ErrorBody;

/// Error codes returned in the `code` field of failure responses.
///
/// These codes are stable and can be used for programmatic error handling.
pub mod error_codes {
    /// Request body is not valid multipart form data
    pub const INVALID_MULTIPART: &str = "API_001";
    /// No `file` field in the form
    pub const MISSING_FILE: &str = "API_002";
    /// The `file` field is empty
    pub const EMPTY_UPLOAD: &str = "API_003";
    /// Audio container or encoding not supported
    pub const UNSUPPORTED_FORMAT: &str = "API_004";
    /// Audio could not be decoded
    pub const CORRUPT_AUDIO: &str = "API_005";
    /// Pitch model failed
    pub const PITCH_MODEL: &str = "API_006";
    /// MIDI serialization failed
    pub const MIDI_ENCODE: &str = "API_007";
    /// Temporary file could not be written or read
    pub const TEMP_FILE: &str = "API_008";
    /// Analysis exceeded the request timeout
    pub const TIMEOUT: &str = "API_009";
    /// Analysis worker panicked or was cancelled
    pub const WORKER: &str = "API_010";
    /// Request body exceeds the upload limit
    pub const UPLOAD_TOO_LARGE: &str = "API_011";
}

/// Why an analysis request failed.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Invalid multipart request: {0}")]
    InvalidMultipart(String),

    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    #[error("Missing form field 'file'")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyUpload,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Pitch tracking failed: {0}")]
    Pitch(#[from] PitchError),

    #[error("MIDI encoding failed: {0}")]
    Midi(#[from] MidiError),

    #[error("Temporary file error: {0}")]
    TempFile(std::io::Error),

    #[error("Analysis timed out after {} s", .0.as_secs())]
    Timeout(Duration),

    #[error("Analysis worker failed: {0}")]
    Worker(String),
}

impl AnalyzeError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzeError::InvalidMultipart(_) => error_codes::INVALID_MULTIPART,
            AnalyzeError::UploadTooLarge(_) => error_codes::UPLOAD_TOO_LARGE,
            AnalyzeError::MissingFile => error_codes::MISSING_FILE,
            AnalyzeError::EmptyUpload => error_codes::EMPTY_UPLOAD,
            AnalyzeError::Decode(DecodeError::UnsupportedFormat(_))
            | AnalyzeError::Decode(DecodeError::UnsupportedEncoding(_)) => {
                error_codes::UNSUPPORTED_FORMAT
            }
            AnalyzeError::Decode(DecodeError::Corrupt(_)) => error_codes::CORRUPT_AUDIO,
            AnalyzeError::Decode(DecodeError::Io(_)) | AnalyzeError::TempFile(_) => {
                error_codes::TEMP_FILE
            }
            AnalyzeError::Pitch(_) => error_codes::PITCH_MODEL,
            AnalyzeError::Midi(_) => error_codes::MIDI_ENCODE,
            AnalyzeError::Timeout(_) => error_codes::TIMEOUT,
            AnalyzeError::Worker(_) => error_codes::WORKER,
        }
    }

    /// HTTP status for this failure.
    pub fn status(&self) -> StatusCode {
        match self.code() {
            error_codes::INVALID_MULTIPART
            | error_codes::MISSING_FILE
            | error_codes::EMPTY_UPLOAD => StatusCode::BAD_REQUEST,
            error_codes::UPLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            error_codes::UNSUPPORTED_FORMAT => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            error_codes::CORRUPT_AUDIO => StatusCode::UNPROCESSABLE_ENTITY,
            error_codes::TIMEOUT => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for AnalyzeError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AnalyzeError::UploadTooLarge(err.body_text())
        } else {
            AnalyzeError::InvalidMultipart(err.body_text())
        }
    }
}

impl From<MultipartRejection> for AnalyzeError {
    fn from(rejection: MultipartRejection) -> Self {
        AnalyzeError::InvalidMultipart(rejection.body_text())
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        if status.is_server_error() {
            warn!(code, status = status.as_u16(), error = %self, "analysis failed");
        } else {
            warn!(code, status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
