//! WAV read/write
//!
//! Provider outputs and intermediate mixes are plain PCM WAV files.

use crate::error::{PipelineError, PipelineResult};
use crate::utils::Waveform;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Sample rate used for generated silence
pub const SILENCE_SAMPLE_RATE: u32 = 44100;

/// Read a WAV file, keeping every channel
///
/// Integer formats are normalized to [-1, 1]; float formats pass through.
pub fn read_wav(path: &Path) -> PipelineResult<Waveform> {
    let reader = WavReader::open(path).map_err(|e| {
        PipelineError::Audio(format!("Failed to open WAV file {}: {}", path.display(), e))
    })?;

    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()?
        }
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
    };

    Ok(Waveform::new(samples, spec.channels, spec.sample_rate))
}

/// Write a waveform as 16-bit PCM, clipping to [-1, 1]
///
/// Creates parent directories if needed.
pub fn write_wav(path: &Path, waveform: &Waveform) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let spec = WavSpec {
        channels: waveform.channels,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &waveform.samples {
        let clipped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clipped * 32767.0) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write `duration_seconds` of mono silence
pub fn write_silence(path: &Path, duration_seconds: u32) -> PipelineResult<()> {
    let frames = duration_seconds as usize * SILENCE_SAMPLE_RATE as usize;
    write_wav(path, &Waveform::silent(frames, 1, SILENCE_SAMPLE_RATE))
}

/// Concatenate WAV files in order into `output`
///
/// The first part fixes the output layout; later parts are converted to it.
/// No cross-fade, so total duration is the sum of part durations.
pub fn concat_wavs<P: AsRef<Path>>(parts: &[P], output: &Path) -> PipelineResult<()> {
    let mut iter = parts.iter();
    let first = iter
        .next()
        .ok_or_else(|| PipelineError::Audio("No WAV parts to concatenate".to_string()))?;

    let mut combined = read_wav(first.as_ref())?;
    for part in iter {
        let next = read_wav(part.as_ref())?.conformed_to(combined.channels, combined.sample_rate)?;
        combined.append(&next)?;
    }

    write_wav(output, &combined)
}

/// Duration of a WAV file in seconds, read from the header
pub fn wav_duration(path: &Path) -> PipelineResult<f64> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let frames = reader.duration() as f64;
    Ok(frames / spec.sample_rate as f64)
}
