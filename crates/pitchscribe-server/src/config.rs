//! Validated server configuration.

use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use axum::http::HeaderValue;
use pitchscribe_midi::{SynthesisOptions, TimingMode};

use crate::cli_args::Cli;

/// Default port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default request body limit (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Default time allowed for one analysis.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of uploads decoded and tracked at once.
pub const DEFAULT_MAX_CONCURRENT_ANALYSES: usize = 4;

/// Origins of the mobile and web development clients.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:8081",
    "http://localhost:19006",
    "exp://localhost:19000",
];

/// Runtime settings for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Exact origins answered with CORS headers. Never contains `*`.
    pub allowed_origins: Vec<HeaderValue>,
    pub max_upload_bytes: usize,
    pub request_timeout: Duration,
    /// Analyses allowed on the blocking pool at once; later uploads wait.
    pub max_concurrent_analyses: usize,
    pub timing: TimingMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .into_iter()
                .map(HeaderValue::from_static)
                .collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent_analyses: DEFAULT_MAX_CONCURRENT_ANALYSES,
            timing: TimingMode::default(),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from parsed arguments, rejecting values the
    /// server cannot run with.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        ensure!(!cli.host.trim().is_empty(), "Bind host must not be empty");
        ensure!(cli.max_upload_bytes > 0, "Upload limit must be positive");
        ensure!(cli.timeout_secs > 0, "Request timeout must be positive");
        ensure!(
            cli.max_concurrent_analyses > 0,
            "At least one concurrent analysis must be allowed"
        );

        Ok(Self {
            host: cli.host.trim().to_string(),
            port: cli.port,
            allowed_origins: parse_origins(&cli.allowed_origins)?,
            max_upload_bytes: cli.max_upload_bytes,
            request_timeout: Duration::from_secs(cli.timeout_secs),
            max_concurrent_analyses: cli.max_concurrent_analyses,
            timing: cli.timing.into(),
        })
    }

    /// Note synthesis settings derived from this configuration.
    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            timing: self.timing,
            ..Default::default()
        }
    }
}

fn parse_origins(origins: &[String]) -> Result<Vec<HeaderValue>> {
    let mut parsed = Vec::with_capacity(origins.len());
    for origin in origins.iter().map(|o| o.trim()).filter(|o| !o.is_empty()) {
        if origin == "*" {
            bail!("Wildcard origin cannot be combined with credentialed requests");
        }
        let value = HeaderValue::from_str(origin)
            .with_context(|| format!("Invalid origin '{}'", origin))?;
        parsed.push(value);
    }
    Ok(parsed)
}
