//! Audio mixing
//!
//! The instrumental (background) is looped by whole-track repetition and cut
//! to the vocal (foreground) length. The foreground gets a dB gain and is
//! added on top. Output length always equals the foreground length. The sum
//! is written as a WAV and then encoded to MP3.

use crate::error::PipelineResult;
use crate::utils::{decode_audio_file, write_wav, Waveform};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compressed-audio encoder
#[async_trait]
pub trait AudioEncoder: Send + Sync {
    /// Encode `input_wav` to MP3 at `bitrate` (e.g. "192k")
    async fn encode_mp3(&self, input_wav: &Path, output: &Path, bitrate: &str)
        -> PipelineResult<()>;
}

/// Linear factor for a gain in decibels
pub fn gain_factor(gain_db: f32) -> f32 {
    10f32.powf(gain_db / 20.0)
}

/// Overlay `foreground` (with gain) on the looped `background`
///
/// The background is converted to the foreground's channel count and sample
/// rate first. An empty background contributes silence.
pub fn mix_waveforms(
    background: Waveform,
    foreground: Waveform,
    gain_db: f32,
) -> PipelineResult<Waveform> {
    let background = background.conformed_to(foreground.channels, foreground.sample_rate)?;
    let gain = gain_factor(gain_db);
    let channels = foreground.channels as usize;
    let bg_frames = background.frames();

    if bg_frames > 0 && bg_frames < foreground.frames() {
        tracing::debug!(
            loops = foreground.frames() / bg_frames + 1,
            "Looping instrumental to vocal length"
        );
    }

    let samples = foreground
        .samples
        .chunks_exact(channels)
        .enumerate()
        .flat_map(|(frame, fg)| {
            let bg = if bg_frames == 0 {
                None
            } else {
                let start = (frame % bg_frames) * channels;
                Some(&background.samples[start..start + channels])
            };
            fg.iter().enumerate().map(move |(ch, s)| {
                let under = bg.map(|b| b[ch]).unwrap_or(0.0);
                under + s * gain
            })
        })
        .collect();

    Ok(Waveform::new(samples, foreground.channels, foreground.sample_rate))
}

/// Mix two audio files into a WAV and return the mix duration in seconds
pub fn mix_to_wav(
    background: &Path,
    foreground: &Path,
    output_wav: &Path,
    gain_db: f32,
) -> PipelineResult<f64> {
    let bg = decode_audio_file(background)?;
    let fg = decode_audio_file(foreground)?;
    let mixed = mix_waveforms(bg, fg, gain_db)?;
    write_wav(output_wav, &mixed)?;
    Ok(mixed.duration_seconds())
}

/// Files written by one mix
#[derive(Debug, Clone)]
pub struct MixOutput {
    pub wav_path: PathBuf,
    pub encoded_path: PathBuf,
    pub duration_seconds: f64,
}

/// Mixer stage
pub struct Mixer {
    encoder: Arc<dyn AudioEncoder>,
    bitrate: String,
}

impl Mixer {
    pub fn new(encoder: Arc<dyn AudioEncoder>, bitrate: impl Into<String>) -> Self {
        Self {
            encoder,
            bitrate: bitrate.into(),
        }
    }

    /// Mix `background` and `foreground` into `wav_path`, then encode to `output`
    pub async fn mix(
        &self,
        background: &Path,
        foreground: &Path,
        wav_path: &Path,
        output: &Path,
        foreground_gain_db: f32,
    ) -> PipelineResult<MixOutput> {
        let duration_seconds = tokio::task::spawn_blocking({
            let (bg, fg, wav) = (
                background.to_path_buf(),
                foreground.to_path_buf(),
                wav_path.to_path_buf(),
            );
            move || mix_to_wav(&bg, &fg, &wav, foreground_gain_db)
        })
        .await??;

        self.encoder
            .encode_mp3(wav_path, output, &self.bitrate)
            .await?;

        tracing::debug!(
            output = %output.display(),
            duration_seconds = format!("{:.2}", duration_seconds),
            "Mix encoded"
        );

        Ok(MixOutput {
            wav_path: wav_path.to_path_buf(),
            encoded_path: output.to_path_buf(),
            duration_seconds,
        })
    }
}
