//! Format-agnostic audio decoding
//!
//! Uses symphonia so that providers may return any supported container
//! (WAV, MP3). Used by the mixer to load its inputs and by the composer to
//! learn the final audio duration.

use crate::error::{PipelineError, PipelineResult};
use crate::utils::Waveform;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

fn open_format(file_path: &Path) -> PipelineResult<Box<dyn FormatReader>> {
    let file = std::fs::File::open(file_path).map_err(|e| {
        PipelineError::Audio(format!(
            "Failed to open audio file {}: {}",
            file_path.display(),
            e
        ))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| {
            PipelineError::Audio(format!(
                "Failed to probe audio file {}: {}",
                file_path.display(),
                e
            ))
        })?;

    Ok(probed.format)
}

/// Decode an audio file to interleaved f32, keeping every channel
pub fn decode_audio_file(file_path: &Path) -> PipelineResult<Waveform> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let mut format = open_format(file_path)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::Audio("No audio track found in file".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PipelineError::Audio("Sample rate unknown".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| PipelineError::Audio("Channels unknown".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| {
            PipelineError::Audio(format!(
                "Failed to create decoder for {}: {}",
                file_path.display(),
                e
            ))
        })?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(PipelineError::Audio(format!("Error reading packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(path = %file_path.display(), error = %e, "Skipping corrupt packet");
                continue;
            }
            Err(e) => {
                return Err(PipelineError::Audio(format!(
                    "Failed to decode packet in {}: {}",
                    file_path.display(),
                    e
                )));
            }
        };

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
        });
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    let waveform = Waveform::new(samples, channels, sample_rate);

    tracing::debug!(
        path = %file_path.display(),
        frames = waveform.frames(),
        duration_seconds = format!("{:.2}", waveform.duration_seconds()),
        "Audio decoding complete"
    );

    Ok(waveform)
}

/// Duration of an audio file in seconds
///
/// Reads the frame count from the container when it is known, otherwise
/// decodes the whole stream.
pub fn probe_duration(file_path: &Path) -> PipelineResult<f64> {
    let format = open_format(file_path)?;

    let known = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .and_then(|t| Some((t.codec_params.n_frames?, t.codec_params.sample_rate?)));

    if let Some((n_frames, sample_rate)) = known {
        if sample_rate > 0 {
            return Ok(n_frames as f64 / sample_rate as f64);
        }
    }

    Ok(decode_audio_file(file_path)?.duration_seconds())
}
