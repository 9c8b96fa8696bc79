//! pitchscribe server library
//!
//! HTTP front end that accepts a recording, tracks its pitch and returns the
//! track together with a MIDI transcription.

pub mod cli_args;
pub mod config;
pub mod serve;

pub use config::ServerConfig;
pub use serve::{router, run, AppState};
