//! Command-line arguments for the pitchscribe server.
//!
//! Every flag can also be set through a `PITCHSCRIBE_*` environment variable.

use clap::{Parser, ValueEnum};
use pitchscribe_midi::TimingMode;

use crate::config::{
    DEFAULT_MAX_CONCURRENT_ANALYSES, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
};

/// pitchscribe - transcribe sung or played melodies to MIDI
#[derive(Debug, Parser)]
#[command(name = "pitchscribe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "PITCHSCRIBE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PITCHSCRIBE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Origins allowed to make cross-origin requests (comma separated)
    #[arg(
        long,
        env = "PITCHSCRIBE_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values = ["http://localhost:8081", "http://localhost:19006", "exp://localhost:19000"]
    )]
    pub allowed_origins: Vec<String>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "PITCHSCRIBE_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Seconds allowed for decoding and pitch tracking one upload
    #[arg(long, env = "PITCHSCRIBE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Uploads analyzed at the same time; further uploads queue
    #[arg(
        long,
        env = "PITCHSCRIBE_MAX_CONCURRENT_ANALYSES",
        default_value_t = DEFAULT_MAX_CONCURRENT_ANALYSES
    )]
    pub max_concurrent_analyses: usize,

    /// How note times are placed in the MIDI file
    #[arg(long, env = "PITCHSCRIBE_TIMING", value_enum, default_value_t = TimingArg::SecondsAsBeats)]
    pub timing: TimingArg,
}

/// Note timing selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimingArg {
    /// Write seconds unchanged as beat positions
    SecondsAsBeats,
    /// Scale seconds by the tempo so playback matches the recording
    WallClock,
}

impl From<TimingArg> for TimingMode {
    fn from(arg: TimingArg) -> Self {
        match arg {
            TimingArg::SecondsAsBeats => TimingMode::SecondsAsBeats,
            TimingArg::WallClock => TimingMode::WallClock,
        }
    }
}
