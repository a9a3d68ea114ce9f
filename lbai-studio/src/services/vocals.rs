//! Vocal synthesis
//!
//! Lyrics are chunked, each chunk is sung independently, and the parts are
//! concatenated in chunk order. No continuity between chunks is attempted.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{StageOutcome, VoiceType};
use crate::services::instrumental::UnavailableProvider;
use crate::services::model_server::ModelServerClient;
use crate::services::text_chunker;
use crate::utils::{concat_wavs, write_silence};
use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One chunk to sing
#[derive(Debug, Clone)]
pub struct VocalRequest<'a> {
    pub text: &'a str,
    pub voice: VoiceType,
    /// Full prompt including the singer style
    pub prompt: String,
    pub reference_sample: Option<&'a Path>,
}

/// Text-to-singing capability
#[async_trait]
pub trait VocalProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Sing one chunk into a WAV file at `output`
    async fn synthesize_chunk(&self, request: &VocalRequest<'_>, output: &Path)
        -> PipelineResult<()>;
}

/// Prompt sent with every chunk
pub fn chunk_prompt(voice: VoiceType, chunk: &str) -> String {
    format!(
        "{}. Sing the following lyrics melodically:\n\n{}",
        voice.style_prompt(),
        chunk
    )
}

/// Pick the effective voice and reference sample
///
/// A custom voice without a sample on disk falls back to `Male`.
pub fn resolve_voice(requested: VoiceType, sample: &Path) -> (VoiceType, Option<PathBuf>) {
    match requested {
        VoiceType::Custom if sample.is_file() => (VoiceType::Custom, Some(sample.to_path_buf())),
        VoiceType::Custom => {
            tracing::warn!(
                sample = %sample.display(),
                "Custom voice requested but no sample found, defaulting to male"
            );
            (VoiceType::Male, None)
        }
        other => (other, None),
    }
}

#[derive(Serialize)]
struct SynthesizeBody<'a> {
    text: &'a str,
    voice: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_sample_b64: Option<String>,
}

/// Vocal model behind the model-server HTTP contract
pub struct HttpVocalProvider {
    client: ModelServerClient,
}

impl HttpVocalProvider {
    pub fn new(client: ModelServerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VocalProvider for HttpVocalProvider {
    fn name(&self) -> &str {
        "bark-http"
    }

    async fn synthesize_chunk(
        &self,
        request: &VocalRequest<'_>,
        output: &Path,
    ) -> PipelineResult<()> {
        let reference_sample_b64 = match request.reference_sample {
            Some(path) => {
                let bytes = tokio::fs::read(path).await?;
                Some(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            None => None,
        };

        let body = SynthesizeBody {
            text: request.text,
            voice: request.voice.as_str(),
            prompt: &request.prompt,
            reference_sample_b64,
        };

        self.client.post_for_audio("/synthesize", &body, output).await
    }
}

#[async_trait]
impl VocalProvider for UnavailableProvider {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn synthesize_chunk(&self, _: &VocalRequest<'_>, _: &Path) -> PipelineResult<()> {
        Err(PipelineError::ProviderUnavailable(self.reason().to_string()))
    }
}

fn part_path(output: &Path, index: usize) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vocals".to_string());
    output.with_file_name(format!("{}_part{:03}.wav", stem, index))
}

/// Settings for one vocal stage run
#[derive(Debug, Clone)]
pub struct VocalJob<'a> {
    pub lyrics: &'a str,
    pub voice: VoiceType,
    pub reference_sample: Option<&'a Path>,
    pub max_chunk_chars: usize,
    /// Length of the silent fallback
    pub fallback_seconds: u32,
}

/// Run the vocal stage with the silent fallback
///
/// `ProviderUnavailable` on any chunk, or lyrics with no words, degrade to
/// silence of `fallback_seconds`. Other errors are fatal. Chunk files are
/// removed once concatenated.
pub async fn synthesize_vocals(
    provider: &dyn VocalProvider,
    job: &VocalJob<'_>,
    output: &Path,
) -> PipelineResult<StageOutcome<PathBuf>> {
    let chunks = text_chunker::chunk(job.lyrics, job.max_chunk_chars);
    if chunks.is_empty() {
        write_silence_async(output, job.fallback_seconds).await?;
        return Ok(StageOutcome::fallback(output.to_path_buf(), "lyrics are empty"));
    }

    tracing::debug!(
        provider = provider.name(),
        chunks = chunks.len(),
        voice = job.voice.as_str(),
        "Synthesizing vocals"
    );

    let mut parts = Vec::with_capacity(chunks.len());
    for (index, text) in chunks.iter().enumerate() {
        let part = part_path(output, index);
        let request = VocalRequest {
            text,
            voice: job.voice,
            prompt: chunk_prompt(job.voice, text),
            reference_sample: job.reference_sample,
        };

        match provider.synthesize_chunk(&request, &part).await {
            Ok(()) => parts.push(part),
            Err(PipelineError::ProviderUnavailable(reason)) => {
                remove_parts(&parts).await;
                write_silence_async(output, job.fallback_seconds).await?;
                return Ok(StageOutcome::fallback(output.to_path_buf(), reason));
            }
            Err(e) => return Err(e),
        }
    }

    let out = output.to_path_buf();
    let blocking_parts = parts.clone();
    tokio::task::spawn_blocking(move || concat_wavs(&blocking_parts, &out)).await??;
    remove_parts(&parts).await;

    Ok(StageOutcome::Produced(output.to_path_buf()))
}

async fn write_silence_async(output: &Path, seconds: u32) -> PipelineResult<()> {
    let path = output.to_path_buf();
    tokio::task::spawn_blocking(move || write_silence(&path, seconds)).await?
}

async fn remove_parts(parts: &[PathBuf]) {
    for part in parts {
        if let Err(e) = tokio::fs::remove_file(part).await {
            tracing::debug!(part = %part.display(), error = %e, "Could not remove vocal part");
        }
    }
}
