//! In-memory PCM waveform
//!
//! Samples are interleaved f32 in [-1.0, 1.0].

use crate::error::{PipelineError, PipelineResult};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Interleaved PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
        }
    }

    pub fn silent(frames: usize, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        Self::new(vec![0.0; frames * channels as usize], channels, sample_rate)
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Keep at most `frames` frames
    pub fn truncate_frames(&mut self, frames: usize) {
        self.samples.truncate(frames * self.channels as usize);
    }

    /// Append another waveform of the same layout
    pub fn append(&mut self, other: &Waveform) -> PipelineResult<()> {
        if other.channels != self.channels || other.sample_rate != self.sample_rate {
            return Err(PipelineError::Audio(format!(
                "Cannot append {}ch/{}Hz to {}ch/{}Hz",
                other.channels, other.sample_rate, self.channels, self.sample_rate
            )));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Remap to `channels`: average down to mono, duplicate up from mono,
    /// otherwise wrap source channels.
    pub fn with_channels(self, channels: u16) -> Self {
        let channels = channels.max(1);
        if channels == self.channels {
            return self;
        }

        let src = self.channels as usize;
        let dst = channels as usize;
        let mut out = Vec::with_capacity(self.frames() * dst);

        for frame in self.samples.chunks_exact(src) {
            if dst == 1 {
                out.push(frame.iter().sum::<f32>() / src as f32);
            } else {
                for ch in 0..dst {
                    out.push(frame[ch % src]);
                }
            }
        }

        Self::new(out, channels, self.sample_rate)
    }

    /// Resample to `sample_rate` with a windowed-sinc resampler
    pub fn resampled(self, sample_rate: u32) -> PipelineResult<Self> {
        if sample_rate == self.sample_rate || self.is_empty() {
            return Ok(Self {
                sample_rate,
                ..self
            });
        }

        let channels = self.channels as usize;
        let frames = self.frames();

        let mut planar: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
        for frame in self.samples.chunks_exact(channels) {
            for (ch, sample) in frame.iter().enumerate() {
                planar[ch].push(*sample);
            }
        }

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let ratio = sample_rate as f64 / self.sample_rate as f64;
        let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, channels)
            .map_err(|e| PipelineError::Audio(format!("Resampler setup failed: {}", e)))?;

        let output = resampler
            .process(&planar, None)
            .map_err(|e| PipelineError::Audio(format!("Resampling failed: {}", e)))?;

        let out_frames = output.first().map(Vec::len).unwrap_or(0);
        let mut samples = Vec::with_capacity(out_frames * channels);
        for i in 0..out_frames {
            for channel in &output {
                samples.push(channel[i]);
            }
        }

        Ok(Self::new(samples, self.channels, sample_rate))
    }

    /// Match another waveform's channel count and sample rate
    pub fn conformed_to(self, channels: u16, sample_rate: u32) -> PipelineResult<Self> {
        self.with_channels(channels).resampled(sample_rate)
    }
}
