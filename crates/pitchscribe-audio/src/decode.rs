//! Audio loading: container sniffing, sample normalization and mono downmix.
//!
//! Plain PCM and float WAV goes through `hound`. Every other container, and
//! WAV encodings `hound` does not handle, goes through the codec registry in
//! [`crate::codec`].

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::codec::decode_media;
use crate::resample::resample;

/// Sample rate expected by the pitch tracker.
pub const MODEL_SAMPLE_RATE: u32 = 16_000;

/// Bytes needed to recognise every supported container.
const MAGIC_LEN: usize = 12;

/// Error type for audio decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The data is not in a container this decoder recognises.
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The container is recognised but its codec or sample layout is not.
    #[error("Unsupported audio encoding: {0}")]
    UnsupportedEncoding(String),

    /// The audio is malformed or truncated.
    #[error("Corrupt audio data: {0}")]
    Corrupt(String),

    /// IO error while opening or reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map a `hound` failure. Once the file is open every read failure means the
/// bytes themselves are short or malformed.
fn wav_error(err: hound::Error) -> DecodeError {
    match err {
        hound::Error::IoError(e) => DecodeError::Corrupt(format!("truncated WAV header: {}", e)),
        hound::Error::Unsupported => {
            DecodeError::UnsupportedEncoding("WAV format tag not handled by PCM reader".to_string())
        }
        other => DecodeError::Corrupt(other.to_string()),
    }
}

/// Container families recognised from the leading bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Wav,
    Ogg,
    Flac,
    Mpeg,
    Mp4,
    Aiff,
    Matroska,
}

impl Container {
    /// Identify the container from its magic bytes.
    pub fn sniff(magic: &[u8]) -> Result<Self, DecodeError> {
        if magic.starts_with(b"RIFF") {
            if magic.len() < MAGIC_LEN {
                return Err(DecodeError::Corrupt(format!(
                    "file too small: {} bytes",
                    magic.len()
                )));
            }
            if &magic[8..12] == b"WAVE" {
                return Ok(Container::Wav);
            }
            return Err(DecodeError::UnsupportedFormat(
                "RIFF container without WAVE data".to_string(),
            ));
        }
        if magic.starts_with(b"OggS") {
            Ok(Container::Ogg)
        } else if magic.starts_with(b"fLaC") {
            Ok(Container::Flac)
        } else if magic.starts_with(b"ID3")
            || (magic.len() >= 2 && magic[0] == 0xFF && magic[1] & 0xE0 == 0xE0)
        {
            Ok(Container::Mpeg)
        } else if magic.len() >= 8 && &magic[4..8] == b"ftyp" {
            Ok(Container::Mp4)
        } else if magic.starts_with(b"FORM") {
            Ok(Container::Aiff)
        } else if magic.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            Ok(Container::Matroska)
        } else {
            Err(DecodeError::UnsupportedFormat("unrecognized data".to_string()))
        }
    }

    /// Human-readable name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Container::Wav => "WAV",
            Container::Ogg => "Ogg",
            Container::Flac => "FLAC",
            Container::Mpeg => "MPEG audio",
            Container::Mp4 => "MP4/M4A",
            Container::Aiff => "AIFF",
            Container::Matroska => "Matroska/WebM",
        }
    }

    /// File extension handed to the format reader as a hint.
    pub fn extension(self) -> &'static str {
        match self {
            Container::Wav => "wav",
            Container::Ogg => "ogg",
            Container::Flac => "flac",
            Container::Mpeg => "mp3",
            Container::Mp4 => "m4a",
            Container::Aiff => "aiff",
            Container::Matroska => "mka",
        }
    }
}

/// Mono PCM samples in [-1.0, 1.0] at a known rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Resample to `target_rate`.
    pub fn resampled(self, target_rate: u32) -> Self {
        if self.sample_rate == target_rate {
            return self;
        }
        Self {
            samples: resample(&self.samples, self.sample_rate, target_rate),
            sample_rate: target_rate,
        }
    }
}

/// Load an audio file as mono samples at [`MODEL_SAMPLE_RATE`].
pub fn load_audio(path: &Path) -> Result<DecodedAudio, DecodeError> {
    let decoded = decode_file(path)?;
    debug!(
        path = %path.display(),
        sample_rate = decoded.sample_rate,
        samples = decoded.samples.len(),
        "decoded audio"
    );
    Ok(decoded.resampled(MODEL_SAMPLE_RATE))
}

/// Decode an audio file to mono at its native sample rate.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, DecodeError> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; MAGIC_LEN];
    let read = read_prefix(&mut file, &mut magic)?;
    let container = Container::sniff(&magic[..read])?;

    file.seek(SeekFrom::Start(0))?;
    if container == Container::Wav {
        match decode_wav(BufReader::new(&mut file)) {
            Err(DecodeError::UnsupportedEncoding(reason)) => {
                debug!(%reason, "falling back to codec registry for WAV");
                file.seek(SeekFrom::Start(0))?;
            }
            result => return result,
        }
    }
    decode_media(Box::new(file), container)
}

/// Decode in-memory audio to mono at its native sample rate.
pub fn decode_bytes(data: &[u8]) -> Result<DecodedAudio, DecodeError> {
    let container = Container::sniff(&data[..data.len().min(MAGIC_LEN)])?;
    if container == Container::Wav {
        match decode_wav(Cursor::new(data)) {
            Err(DecodeError::UnsupportedEncoding(reason)) => {
                debug!(%reason, "falling back to codec registry for WAV");
            }
            result => return result,
        }
    }
    decode_media(Box::new(Cursor::new(data.to_vec())), container)
}

fn read_prefix<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn decode_wav<R: Read>(source: R) -> Result<DecodedAudio, DecodeError> {
    let mut reader = hound::WavReader::new(source).map_err(wav_error)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(DecodeError::Corrupt("zero channels".to_string()));
    }
    if spec.sample_rate == 0 {
        return Err(DecodeError::Corrupt("zero sample rate".to_string()));
    }

    let interleaved = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = normalization_scale(bits);
            read_until_eof(reader.samples::<i32>(), |v| (v as f64 / scale) as f32)?
        }
        (hound::SampleFormat::Float, 32) => read_until_eof(reader.samples::<f32>(), |v| v)?,
        (format, bits) => {
            return Err(DecodeError::UnsupportedEncoding(format!(
                "{:?} samples at {} bits",
                format, bits
            )));
        }
    };

    Ok(DecodedAudio {
        samples: downmix_to_mono(&interleaved, spec.channels),
        sample_rate: spec.sample_rate,
    })
}

/// Collect samples until the data chunk or the stream ends.
///
/// Recorders that are cut off leave a data-chunk size larger than what was
/// written; the samples that are present are kept. The iterator's size hint
/// comes from that header field, so nothing is reserved from it.
fn read_until_eof<S, I, F>(samples: I, convert: F) -> Result<Vec<f32>, DecodeError>
where
    I: Iterator<Item = hound::Result<S>>,
    F: Fn(S) -> f32,
{
    let mut out = Vec::new();
    for sample in samples {
        match sample {
            Ok(v) => out.push(convert(v)),
            Err(hound::Error::IoError(e)) => {
                debug!(samples = out.len(), error = %e, "WAV data ends before its declared size");
                break;
            }
            Err(other) => return Err(DecodeError::Corrupt(other.to_string())),
        }
    }
    Ok(out)
}

/// Full-scale value for a signed integer sample of the given bit depth.
fn normalization_scale(bits_per_sample: u16) -> f64 {
    (1u64 << (bits_per_sample - 1)) as f64
}

/// Convert interleaved multi-channel samples to mono by averaging channels.
///
/// A trailing partial frame is dropped.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
