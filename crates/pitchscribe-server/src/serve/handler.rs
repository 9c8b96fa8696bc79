//! Request handlers.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use base64::Engine;
use pitchscribe_audio::{load_audio, PitchModel};
use pitchscribe_midi::{NoteSynthesizer, RenderedMidi};
use pitchscribe_track::PitchTrack;
use tracing::{debug, info};

use super::error::AnalyzeError;
use super::types::{AnalyzeResponse, HealthResponse};
use super::AppState;

/// Multipart field carrying the audio.
pub const FILE_FIELD: &str = "file";

/// `GET /`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ready" })
}

/// `POST /analyze-audio`
pub async fn analyze_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, AnalyzeError> {
    let upload = read_upload(multipart?).await?;
    let input_hash = blake3::hash(&upload.data).to_hex().to_string();
    info!(
        input_hash = %input_hash,
        bytes = upload.data.len(),
        filename = upload.filename.as_deref().unwrap_or(""),
        "analyzing upload"
    );

    let suffix = temp_suffix(upload.filename.as_deref());
    let model = Arc::clone(&state.model);
    let synthesizer = Arc::clone(&state.synthesizer);
    let slots = Arc::clone(&state.analysis_slots);
    // Waiting for a slot counts against the request timeout. The permit is
    // released when the blocking job ends, even if the request gave up on it.
    let work = async move {
        let permit = slots
            .acquire_owned()
            .await
            .map_err(|e| AnalyzeError::Worker(e.to_string()))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            analyze_upload(&upload.data, &suffix, model.as_ref(), &synthesizer)
        })
        .await
        .map_err(|e| AnalyzeError::Worker(e.to_string()))?
    };

    let analysis = tokio::time::timeout(state.request_timeout, work)
        .await
        .map_err(|_| AnalyzeError::Timeout(state.request_timeout))??;

    let report = analysis.rendered.report;
    info!(
        input_hash = %input_hash,
        frames = report.frames,
        notes = report.notes,
        skipped_low_confidence = report.skipped_low_confidence,
        skipped_unvoiced = report.skipped_unvoiced,
        skipped_out_of_range = report.skipped_out_of_range,
        "analysis complete"
    );

    let (times, frequencies, confidence) = analysis.track.into_parts();
    Ok(Json(AnalyzeResponse {
        frequencies,
        confidence,
        times,
        midi: base64::engine::general_purpose::STANDARD.encode(&analysis.rendered.bytes),
        notes: analysis.rendered.notes,
        input_hash,
    }))
}

struct Upload {
    filename: Option<String>,
    data: Vec<u8>,
}

/// Take the first `file` field; other fields are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AnalyzeError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            debug!(field = field.name().unwrap_or(""), "ignoring form field");
            continue;
        }
        let filename = field.file_name().map(str::to_owned);
        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(AnalyzeError::EmptyUpload);
        }
        return Ok(Upload {
            filename,
            data: data.to_vec(),
        });
    }
    Err(AnalyzeError::MissingFile)
}

/// Keep the uploaded extension so the scratch file is recognisable on disk.
fn temp_suffix(filename: Option<&str>) -> String {
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| ".wav".to_string())
}

struct Analysis {
    track: PitchTrack,
    rendered: RenderedMidi,
}

/// Decode, track and render one upload. The scratch file is removed when
/// this returns, on success and on every error path.
fn analyze_upload(
    data: &[u8],
    suffix: &str,
    model: &dyn PitchModel,
    synthesizer: &NoteSynthesizer,
) -> Result<Analysis, AnalyzeError> {
    let mut scratch = tempfile::Builder::new()
        .prefix("pitchscribe-")
        .suffix(suffix)
        .tempfile()
        .map_err(AnalyzeError::TempFile)?;
    scratch.write_all(data).map_err(AnalyzeError::TempFile)?;
    scratch.flush().map_err(AnalyzeError::TempFile)?;

    let audio = load_audio(scratch.path())?.resampled(model.sample_rate());
    debug!(
        model = model.name(),
        seconds = audio.duration(),
        "running pitch model"
    );
    let track = model.predict(&audio.samples, audio.sample_rate)?;
    let rendered = synthesizer.render(&track)?;

    Ok(Analysis { track, rendered })
}
