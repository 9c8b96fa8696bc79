//! Decoding through the `symphonia` format and codec registry.
//!
//! Handles MP3, Ogg (Vorbis, FLAC), native FLAC, MP4/M4A (AAC, ALAC, PCM),
//! AIFF, Matroska and the WAV encodings the PCM reader rejects.

use std::io::ErrorKind;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as MediaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::decode::{downmix_to_mono, Container, DecodeError, DecodedAudio};

fn media_error(container: Container, err: MediaError) -> DecodeError {
    match err {
        MediaError::Unsupported(what) => {
            DecodeError::UnsupportedEncoding(format!("{}: {}", container.name(), what))
        }
        other => DecodeError::Corrupt(format!("{}: {}", container.name(), other)),
    }
}

/// Decode the first audio track of `source` to mono at its native rate.
///
/// Packets that fail to decode are skipped; the stream is only rejected as
/// corrupt when none of them decode.
pub fn decode_media(
    source: Box<dyn MediaSource>,
    container: Container,
) -> Result<DecodedAudio, DecodeError> {
    let mut hint = Hint::new();
    hint.with_extension(container.extension());

    let stream = MediaSourceStream::new(source, Default::default());
    let opened = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| media_error(container, e))?;
    let mut format = opened.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            DecodeError::UnsupportedFormat(format!("{} file has no audio track", container.name()))
        })?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| media_error(container, e))?;

    let mut samples = Vec::new();
    let mut buffer: Option<SampleBuffer<f32>> = None;
    let mut channels = 0usize;
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(MediaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(MediaError::ResetRequired) => break,
            Err(e) if samples.is_empty() => return Err(media_error(container, e)),
            Err(e) => {
                debug!(error = %e, samples = samples.len(), "stopping at unreadable packet");
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e @ (MediaError::DecodeError(_) | MediaError::IoError(_))) => {
                skipped += 1;
                debug!(error = %e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(media_error(container, e)),
        };
        if decoded.frames() == 0 {
            continue;
        }

        let spec = *decoded.spec();
        let count = spec.channels.count();
        if sample_rate.is_none() {
            sample_rate = Some(spec.rate);
        }
        let needed = decoded.capacity() * count;
        if count != channels || buffer.as_ref().map_or(true, |b| b.capacity() < needed) {
            buffer = None;
            channels = count;
        }
        let buf = buffer.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buf.copy_interleaved_ref(decoded);
        samples.extend(downmix_to_mono(buf.samples(), channels as u16));
    }

    if samples.is_empty() && skipped > 0 {
        return Err(DecodeError::Corrupt(format!(
            "{}: none of {} packets decoded",
            container.name(),
            skipped
        )));
    }
    let sample_rate = sample_rate
        .filter(|&rate| rate > 0)
        .ok_or_else(|| DecodeError::Corrupt(format!("{}: missing sample rate", container.name())))?;

    debug!(
        container = container.name(),
        sample_rate,
        samples = samples.len(),
        skipped,
        "decoded compressed audio"
    );
    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}
