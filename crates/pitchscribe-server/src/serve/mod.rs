//! HTTP service for pitch transcription.
//!
//! ## Endpoints
//!
//! - `GET /`: health check, returns `{"status": "ready"}`
//! - `POST /analyze-audio`: multipart form with the recording in a `file`
//!   field. Returns the pitch track and a base64-encoded MIDI file:
//!   ```json
//!   {"frequencies": [...], "confidence": [...], "times": [...],
//!    "midi": "TVRoZA...", "notes": [...], "input_hash": "..."}
//!   ```
//!
//! Failures return `{"error": "...", "code": "API_0XX"}` with a 4xx or 5xx
//! status (see [`error_codes`]).

mod error;
mod handler;
mod types;

#[cfg(test)]
mod tests;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use pitchscribe_audio::{PitchModel, YinConfig, YinTracker};
use pitchscribe_midi::NoteSynthesizer;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;

pub use error::{error_codes, AnalyzeError};
pub use handler::{analyze_audio, health, FILE_FIELD};
pub use types::{AnalyzeResponse, ErrorBody, HealthResponse};

/// Shared per-process state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn PitchModel>,
    pub synthesizer: Arc<NoteSynthesizer>,
    pub request_timeout: Duration,
    /// Permits for analyses running on the blocking pool.
    pub analysis_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: &ServerConfig, model: Arc<dyn PitchModel>) -> Self {
        Self {
            model,
            synthesizer: Arc::new(NoteSynthesizer::new(config.synthesis_options())),
            request_timeout: config.request_timeout,
            analysis_slots: Arc::new(Semaphore::new(config.max_concurrent_analyses)),
        }
    }
}

/// Build the application router.
pub fn router(config: &ServerConfig, model: Arc<dyn PitchModel>) -> Router {
    Router::new()
        .route("/", get(handler::health))
        .route("/analyze-audio", post(handler::analyze_audio))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(config, model))
}

/// Credentialed CORS for an explicit origin list. Headers and methods are
/// mirrored from the preflight since wildcards are invalid with credentials.
fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_credentials(true)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
}

/// Run the HTTP server until Ctrl+C.
///
/// # Returns
/// Exit code: 0 on clean shutdown
pub fn run(config: ServerConfig) -> Result<ExitCode> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(async move { run_server(config).await })
}

async fn run_server(config: ServerConfig) -> Result<ExitCode> {
    let tracker = YinTracker::new(YinConfig::default()).context("Failed to build pitch model")?;
    let model: Arc<dyn PitchModel> = Arc::new(tracker);
    let model_name = model.name().to_string();

    let app = router(&config, model);
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", config.host, config.port))?;
    let addr = listener.local_addr().context("Failed to read bound address")?;

    info!(
        %addr,
        model = %model_name,
        timing = ?config.timing,
        max_upload_bytes = config.max_upload_bytes,
        max_concurrent_analyses = config.max_concurrent_analyses,
        "pitchscribe listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shutdown complete");
    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(e) => {
            warn!(error = %e, "Ctrl+C handler unavailable, running until killed");
            std::future::pending::<()>().await
        }
    }
}
