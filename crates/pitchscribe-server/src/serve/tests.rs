//! Router tests for the HTTP service.

use std::f64::consts::PI;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_REQUEST_METHOD, CONTENT_TYPE, ORIGIN,
};
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use http_body_util::BodyExt;
use pitchscribe_audio::{PitchError, PitchModel, YinConfig, YinTracker};
use pitchscribe_track::PitchTrack;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

use super::*;

const BOUNDARY: &str = "pitchscribe-test-boundary";

fn sine_wav(freq: f64, sample_rate: u32, seconds: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        let len = (seconds * sample_rate as f64) as usize;
        for i in 0..len {
            let s = 0.5 * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin();
            writer.write_sample((s * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

fn form(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn app_with(config: ServerConfig, model: Arc<dyn PitchModel>) -> Router {
    router(&config, model)
}

fn app() -> Router {
    let tracker = YinTracker::new(YinConfig::default()).unwrap();
    app_with(ServerConfig::default(), Arc::new(tracker))
}

async fn post_form(app: Router, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze-audio")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn assert_error(status: StatusCode, body: &Value, expected_status: StatusCode, code: &str) {
    assert_eq!(status, expected_status, "body: {}", body);
    assert_eq!(body["code"], code);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

fn floats(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

/// Sleeps past the request timeout.
struct SlowModel(Duration);

/// Always fails inference.
struct FailingModel;

/// Panics inside the worker.
struct PanickingModel;

impl PitchModel for SlowModel {
    fn name(&self) -> &str {
        "slow"
    }
    fn sample_rate(&self) -> u32 {
        16000
    }
    fn hop_seconds(&self) -> f64 {
        0.01
    }
    fn predict(&self, _samples: &[f32], _rate: u32) -> Result<PitchTrack, PitchError> {
        std::thread::sleep(self.0);
        Ok(PitchTrack::default())
    }
}

impl PitchModel for FailingModel {
    fn name(&self) -> &str {
        "failing"
    }
    fn sample_rate(&self) -> u32 {
        16000
    }
    fn hop_seconds(&self) -> f64 {
        0.01
    }
    fn predict(&self, _samples: &[f32], _rate: u32) -> Result<PitchTrack, PitchError> {
        Err(PitchError::InvalidConfig("weights missing".to_string()))
    }
}

impl PitchModel for PanickingModel {
    fn name(&self) -> &str {
        "panicking"
    }
    fn sample_rate(&self) -> u32 {
        16000
    }
    fn hop_seconds(&self) -> f64 {
        0.01
    }
    fn predict(&self, _samples: &[f32], _rate: u32) -> Result<PitchTrack, PitchError> {
        panic!("model crashed")
    }
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"status": "ready"}));
}

#[tokio::test]
async fn test_analyze_sine_upload() {
    let wav = sine_wav(440.0, 16000, 0.5);
    let (status, body) = post_form(app(), form("file", "a4.wav", &wav)).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    let frequencies = floats(&body["frequencies"]);
    let confidence = floats(&body["confidence"]);
    let times = floats(&body["times"]);
    assert_eq!(frequencies.len(), 51);
    assert_eq!(confidence.len(), 51);
    assert_eq!(times.len(), 51);
    assert_eq!(times[1], 0.01);

    let confident = frequencies
        .iter()
        .zip(&confidence)
        .filter(|&(&f, &c)| f > 0.0 && c > 0.5)
        .count();
    let notes = body["notes"].as_array().unwrap();
    assert_eq!(notes.len(), confident);
    assert!(notes.len() > 40, "{} notes", notes.len());
    for note in notes {
        let pitch = note["pitch"].as_u64().unwrap();
        assert!((68..=70).contains(&pitch), "pitch {}", pitch);
        assert_eq!(note["duration"], 0.25);
        assert_eq!(note["velocity"], 100);
    }

    let midi = base64::engine::general_purpose::STANDARD
        .decode(body["midi"].as_str().unwrap())
        .unwrap();
    assert_eq!(&midi[..4], b"MThd");
    assert_eq!(&midi[14..18], b"MTrk");

    assert_eq!(
        body["input_hash"],
        blake3::hash(&wav).to_hex().to_string()
    );
}

#[tokio::test]
async fn test_empty_recording_gives_empty_midi() {
    let wav = sine_wav(440.0, 44100, 0.0);
    let (status, body) = post_form(app(), form("file", "empty.wav", &wav)).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert!(floats(&body["frequencies"]).is_empty());
    assert!(body["notes"].as_array().unwrap().is_empty());

    let midi = base64::engine::general_purpose::STANDARD
        .decode(body["midi"].as_str().unwrap())
        .unwrap();
    assert_eq!(&midi[..4], b"MThd");
}

#[tokio::test]
async fn test_extra_fields_are_ignored() {
    let wav = sine_wav(440.0, 16000, 0.2);
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"comment\"\r\n\r\nhello\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&form("file", "a4.wav", &wav));

    let (status, json) = post_form(app(), body).await;
    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(floats(&json["times"]).len(), 21);
}

#[tokio::test]
async fn test_missing_file_field() {
    let wav = sine_wav(440.0, 16000, 0.1);
    let (status, body) = post_form(app(), form("audio", "a4.wav", &wav)).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, error_codes::MISSING_FILE);
}

#[tokio::test]
async fn test_empty_upload() {
    let (status, body) = post_form(app(), form("file", "a4.wav", &[])).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, error_codes::EMPTY_UPLOAD);
}

#[tokio::test]
async fn test_not_multipart() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze-audio")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_error(
        status,
        &body,
        StatusCode::BAD_REQUEST,
        error_codes::INVALID_MULTIPART,
    );
}

#[tokio::test]
async fn test_unsupported_format() {
    let (status, body) = post_form(app(), form("file", "notes.txt", b"hello world")).await;
    assert_error(
        status,
        &body,
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        error_codes::UNSUPPORTED_FORMAT,
    );

    let (status, body) = post_form(app(), form("file", "clip.avi", b"RIFF\x24\0\0\0AVI LIST")).await;
    assert_error(
        status,
        &body,
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        error_codes::UNSUPPORTED_FORMAT,
    );
}

#[tokio::test]
async fn test_corrupt_wav() {
    let wav = sine_wav(440.0, 16000, 0.1);
    let truncated = &wav[..20];
    let (status, body) = post_form(app(), form("file", "cut.wav", truncated)).await;
    assert_error(
        status,
        &body,
        StatusCode::UNPROCESSABLE_ENTITY,
        error_codes::CORRUPT_AUDIO,
    );

    let (status, body) = post_form(app(), form("file", "cut.wav", &wav[..30])).await;
    assert_error(
        status,
        &body,
        StatusCode::UNPROCESSABLE_ENTITY,
        error_codes::CORRUPT_AUDIO,
    );
}

#[tokio::test]
async fn test_corrupt_ogg() {
    let mut ogg = b"OggS".to_vec();
    ogg.extend_from_slice(&[0u8; 60]);
    let (status, body) = post_form(app(), form("file", "take.ogg", &ogg)).await;
    assert_error(
        status,
        &body,
        StatusCode::UNPROCESSABLE_ENTITY,
        error_codes::CORRUPT_AUDIO,
    );
}

#[tokio::test]
async fn test_cut_off_recording_is_analyzed() {
    let mut wav = sine_wav(440.0, 16000, 0.5);
    let data_size = wav.windows(4).position(|w| w == b"data").unwrap() + 4;
    wav[data_size..data_size + 4].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
    wav.truncate(wav.len() - 3200);

    let (status, body) = post_form(app(), form("file", "live.wav", &wav)).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(floats(&body["times"]).len(), 41);
}

#[tokio::test]
async fn test_upload_over_limit() {
    let config = ServerConfig {
        max_upload_bytes: 1024,
        ..Default::default()
    };
    let tracker = YinTracker::new(YinConfig::default()).unwrap();
    let app = app_with(config, Arc::new(tracker));

    let wav = sine_wav(440.0, 16000, 0.5);
    let (status, body) = post_form(app, form("file", "a4.wav", &wav)).await;
    assert_error(
        status,
        &body,
        StatusCode::PAYLOAD_TOO_LARGE,
        error_codes::UPLOAD_TOO_LARGE,
    );
}

#[tokio::test]
async fn test_model_failure() {
    let app = app_with(ServerConfig::default(), Arc::new(FailingModel));
    let wav = sine_wav(440.0, 16000, 0.1);
    let (status, body) = post_form(app, form("file", "a4.wav", &wav)).await;
    assert_error(
        status,
        &body,
        StatusCode::INTERNAL_SERVER_ERROR,
        error_codes::PITCH_MODEL,
    );
    assert!(body["error"].as_str().unwrap().contains("weights missing"));
}

#[tokio::test]
async fn test_model_panic() {
    let app = app_with(ServerConfig::default(), Arc::new(PanickingModel));
    let wav = sine_wav(440.0, 16000, 0.1);
    let (status, body) = post_form(app, form("file", "a4.wav", &wav)).await;
    assert_error(
        status,
        &body,
        StatusCode::INTERNAL_SERVER_ERROR,
        error_codes::WORKER,
    );
}

#[tokio::test]
async fn test_timeout() {
    let config = ServerConfig {
        request_timeout: Duration::from_millis(20),
        ..Default::default()
    };
    let app = app_with(config, Arc::new(SlowModel(Duration::from_millis(500))));
    let wav = sine_wav(440.0, 16000, 0.1);
    let (status, body) = post_form(app, form("file", "a4.wav", &wav)).await;
    assert_error(
        status,
        &body,
        StatusCode::GATEWAY_TIMEOUT,
        error_codes::TIMEOUT,
    );
}

#[tokio::test]
async fn test_analyses_beyond_limit_wait_for_a_slot() {
    let config = ServerConfig {
        max_concurrent_analyses: 1,
        ..Default::default()
    };
    let app = app_with(config, Arc::new(SlowModel(Duration::from_millis(200))));
    let wav = sine_wav(440.0, 16000, 0.1);

    let started = std::time::Instant::now();
    let (first, second) = tokio::join!(
        post_form(app.clone(), form("file", "a.wav", &wav)),
        post_form(app, form("file", "b.wav", &wav)),
    );
    assert_eq!(first.0, StatusCode::OK, "body: {}", first.1);
    assert_eq!(second.0, StatusCode::OK, "body: {}", second.1);
    assert!(
        started.elapsed() >= Duration::from_millis(400),
        "analyses overlapped: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_waiting_for_a_slot_counts_against_timeout() {
    let config = ServerConfig {
        max_concurrent_analyses: 1,
        request_timeout: Duration::from_millis(350),
        ..Default::default()
    };
    let app = app_with(config, Arc::new(SlowModel(Duration::from_millis(200))));
    let wav = sine_wav(440.0, 16000, 0.1);

    let (first, second) = tokio::join!(
        post_form(app.clone(), form("file", "a.wav", &wav)),
        post_form(app, form("file", "b.wav", &wav)),
    );
    let mut statuses = vec![first.0, second.0];
    statuses.sort_by_key(|s| s.as_u16());
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::GATEWAY_TIMEOUT]);
}

#[tokio::test]
async fn test_state_sizes_analysis_slots_from_config() {
    let config = ServerConfig {
        max_concurrent_analyses: 3,
        ..Default::default()
    };
    let tracker = YinTracker::new(YinConfig::default()).unwrap();
    let state = AppState::new(&config, Arc::new(tracker));
    assert_eq!(state.analysis_slots.available_permits(), 3);
}

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/analyze-audio")
        .header(ORIGIN, "http://localhost:19006")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:19006"
    );
    assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let request = Request::builder()
        .uri("/")
        .header(ORIGIN, "http://evil.test")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
