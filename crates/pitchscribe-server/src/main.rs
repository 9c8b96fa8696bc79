//! pitchscribe - HTTP service that transcribes recordings to MIDI

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use pitchscribe_server::cli_args::Cli;
use pitchscribe_server::{serve, ServerConfig};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = ServerConfig::from_cli(&cli).and_then(serve::run);

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red(), e);
            ExitCode::from(1)
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
