//! Capability handles constructed once at startup
//!
//! Each provider is initialized exactly once. A provider that cannot be
//! reached at startup is replaced by an `UnavailableProvider`, whose calls
//! make the pipeline take the silent fallback.

use crate::config::StudioConfig;
use crate::error::PipelineResult;
use crate::services::asset_fetcher::{AssetFetcher, HttpAssetFetcher};
use crate::services::asset_search::{AssetSearch, SerperClient};
use crate::services::ffmpeg::FfmpegClient;
use crate::services::instrumental::{self, HttpInstrumentalProvider, InstrumentalProvider};
use crate::services::mixer::AudioEncoder;
use crate::services::model_server::ModelServerClient;
use crate::services::publisher::{GitHubUploader, RemoteUploader};
use crate::services::video_composer::VideoRenderer;
use crate::services::vocals::{HttpVocalProvider, VocalProvider};
use crate::services::voice_converter::VoiceConverter;
use std::sync::Arc;
use std::time::Duration;

/// Timeout for the short auxiliary calls (search, downloads, uploads)
const AUXILIARY_TIMEOUT: Duration = Duration::from_secs(60);

/// Generative and external capabilities used by the orchestrator
#[derive(Clone)]
pub struct Providers {
    pub instrumental: Arc<dyn InstrumentalProvider>,
    pub vocals: Arc<dyn VocalProvider>,
    /// `None` when conversion is not compiled in or not configured
    pub voice_converter: Option<Arc<dyn VoiceConverter>>,
    /// `None` without an API key
    pub asset_search: Option<Arc<dyn AssetSearch>>,
    /// `None` when remote publishing is not configured
    pub uploader: Option<Arc<dyn RemoteUploader>>,
}

/// Media tooling shared by the mixer and composer
#[derive(Clone)]
pub struct MediaTools {
    pub encoder: Arc<dyn AudioEncoder>,
    pub renderer: Arc<dyn VideoRenderer>,
    pub fetcher: Arc<dyn AssetFetcher>,
}

impl MediaTools {
    /// ffmpeg for encoding and rendering, HTTP for downloads
    pub fn from_config(config: &StudioConfig) -> PipelineResult<Self> {
        let ffmpeg = Arc::new(FfmpegClient::new(config.ffmpeg_path.clone()));
        Ok(Self {
            encoder: ffmpeg.clone(),
            renderer: ffmpeg,
            fetcher: Arc::new(HttpAssetFetcher::new(AUXILIARY_TIMEOUT)?),
        })
    }
}

impl Providers {
    /// Connect every configured capability
    ///
    /// Never fails: anything unreachable is logged and replaced by its
    /// fallback.
    pub async fn initialize(config: &StudioConfig) -> Self {
        let instrumental: Arc<dyn InstrumentalProvider> = match connect(
            "Instrumental",
            config.instrumental_url.as_deref(),
            config.request_timeout,
        )
        .await
        {
            Ok(client) => Arc::new(HttpInstrumentalProvider::new(client)),
            Err(reason) => Arc::new(instrumental::UnavailableProvider::new(reason)),
        };

        let vocals: Arc<dyn VocalProvider> = match connect(
            "Vocal",
            config.vocals_url.as_deref(),
            config.request_timeout,
        )
        .await
        {
            Ok(client) => Arc::new(HttpVocalProvider::new(client)),
            Err(reason) => Arc::new(instrumental::UnavailableProvider::new(reason)),
        };

        let asset_search = config.serper_api_key.as_deref().and_then(|key| {
            match SerperClient::new(key, AUXILIARY_TIMEOUT) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn AssetSearch>),
                Err(e) => {
                    tracing::error!("Failed to initialize asset search client: {}", e);
                    None
                }
            }
        });
        if asset_search.is_none() {
            tracing::warn!("Asset search not configured, videos will use solid backgrounds");
        }

        let uploader = config.github.clone().and_then(|target| {
            match GitHubUploader::new(target, AUXILIARY_TIMEOUT) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn RemoteUploader>),
                Err(e) => {
                    tracing::error!("Failed to initialize GitHub uploader: {}", e);
                    None
                }
            }
        });

        Self {
            instrumental,
            vocals,
            voice_converter: voice_converter(config),
            asset_search,
            uploader,
        }
    }
}

async fn connect(
    label: &str,
    base_url: Option<&str>,
    timeout: Option<Duration>,
) -> Result<ModelServerClient, String> {
    let Some(base_url) = base_url else {
        tracing::warn!("{} model server not configured, using silent fallback", label);
        return Err(format!("{} model server not configured", label.to_lowercase()));
    };

    match ModelServerClient::connect(base_url, timeout).await {
        Ok(client) => {
            tracing::info!("{} model server ready at {}", label, base_url);
            Ok(client)
        }
        Err(e) => {
            tracing::warn!("{} model server unavailable ({}), using silent fallback", label, e);
            Err(e.to_string())
        }
    }
}

#[cfg(feature = "voice-conversion")]
fn voice_converter(config: &StudioConfig) -> Option<Arc<dyn VoiceConverter>> {
    use crate::services::voice_converter::CommandVoiceConverter;

    match CommandVoiceConverter::new(&config.voice_conversion_command) {
        Ok(converter) => {
            tracing::info!(program = converter.program(), "Voice conversion enabled");
            Some(Arc::new(converter))
        }
        Err(e) => {
            tracing::warn!("Voice conversion disabled: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "voice-conversion"))]
fn voice_converter(_config: &StudioConfig) -> Option<Arc<dyn VoiceConverter>> {
    tracing::info!("Voice conversion not compiled in");
    None
}
