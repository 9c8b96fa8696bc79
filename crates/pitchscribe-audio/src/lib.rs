//! pitchscribe audio backend
//!
//! Decodes uploaded recordings to mono PCM at the tracker's rate and runs
//! monophonic pitch tracking over them.
//!
//! # Module Structure
//!
//! - [`decode`]: Container sniffing, WAV decoding and mono downmix
//! - [`codec`]: Compressed and non-WAV containers through the codec registry
//! - [`resample`]: Sample-rate conversion
//! - [`pitch`]: The [`PitchModel`] seam and the YIN tracker

pub mod codec;
pub mod decode;
pub mod pitch;
pub mod resample;

pub use decode::{
    decode_bytes, decode_file, load_audio, Container, DecodeError, DecodedAudio, MODEL_SAMPLE_RATE,
};
pub use pitch::{Decoding, PitchError, PitchModel, YinConfig, YinTracker};
pub use resample::resample;
