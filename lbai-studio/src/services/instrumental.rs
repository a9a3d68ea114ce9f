//! Instrumental synthesis
//!
//! An `InstrumentalProvider` turns a style prompt and a duration into a WAV
//! file. When the provider is unavailable the stage writes silence of the
//! requested length instead, so the job can continue.

use crate::error::{PipelineError, PipelineResult};
use crate::models::StageOutcome;
use crate::services::model_server::ModelServerClient;
use crate::utils::write_silence;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Text-to-music capability
#[async_trait]
pub trait InstrumentalProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Write exactly one waveform file at `output`
    ///
    /// Returns `ProviderUnavailable` if the model never initialized.
    async fn synthesize(
        &self,
        prompt: &str,
        duration_seconds: u32,
        output: &Path,
    ) -> PipelineResult<()>;
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
    duration: u32,
}

/// Music model behind the model-server HTTP contract
pub struct HttpInstrumentalProvider {
    client: ModelServerClient,
}

impl HttpInstrumentalProvider {
    pub fn new(client: ModelServerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InstrumentalProvider for HttpInstrumentalProvider {
    fn name(&self) -> &str {
        "musicgen-http"
    }

    async fn synthesize(
        &self,
        prompt: &str,
        duration_seconds: u32,
        output: &Path,
    ) -> PipelineResult<()> {
        self.client
            .post_for_audio(
                "/generate",
                &GenerateBody {
                    prompt,
                    duration: duration_seconds,
                },
                output,
            )
            .await
    }
}

/// Stand-in for a capability that failed to initialize at startup
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl InstrumentalProvider for UnavailableProvider {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn synthesize(&self, _: &str, _: u32, _: &Path) -> PipelineResult<()> {
        Err(PipelineError::ProviderUnavailable(self.reason.clone()))
    }
}

/// Run the instrumental stage with the silent fallback
///
/// `ProviderUnavailable` degrades to silence; any other error is fatal.
pub async fn synthesize_or_silence(
    provider: &dyn InstrumentalProvider,
    prompt: &str,
    duration_seconds: u32,
    output: &Path,
) -> PipelineResult<StageOutcome<PathBuf>> {
    match provider.synthesize(prompt, duration_seconds, output).await {
        Ok(()) => Ok(StageOutcome::Produced(output.to_path_buf())),
        Err(PipelineError::ProviderUnavailable(reason)) => {
            let path = output.to_path_buf();
            tokio::task::spawn_blocking({
                let path = path.clone();
                move || write_silence(&path, duration_seconds)
            })
            .await??;
            Ok(StageOutcome::fallback(path, reason))
        }
        Err(e) => Err(e),
    }
}
