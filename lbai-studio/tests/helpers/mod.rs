//! Shared fixtures for lbai-studio integration tests
//!
//! In-process fakes stand in for the model servers, ffmpeg, Serper and
//! GitHub. Each fake implements the same trait as its production client.

#![allow(dead_code)]

use async_trait::async_trait;
use lbai_common::events::{EventBus, StudioEvent};
use lbai_studio::config::{PipelineSettings, StudioPaths};
use lbai_studio::error::{PipelineError, PipelineResult};
use lbai_studio::services::asset_fetcher::AssetFetcher;
use lbai_studio::services::asset_search::AssetSearch;
use lbai_studio::services::instrumental::{InstrumentalProvider, UnavailableProvider};
use lbai_studio::services::mixer::AudioEncoder;
use lbai_studio::services::publisher::RemoteUploader;
use lbai_studio::services::video_composer::{CompositionPlan, VideoRenderer};
use lbai_studio::services::vocals::{VocalProvider, VocalRequest};
use lbai_studio::services::voice_converter::VoiceConverter;
use lbai_studio::services::{JobOrchestrator, MediaTools, Providers};
use lbai_studio::utils::{write_wav, Waveform};
use lbai_studio::AppState;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Sample rate of every synthesized fixture
pub const FIXTURE_RATE: u32 = 8000;

/// Mono sine tone of `seconds`
pub fn tone(seconds: f64) -> Waveform {
    let frames = (seconds * FIXTURE_RATE as f64).round() as usize;
    let samples = (0..frames)
        .map(|i| 0.25 * (i as f32 * 440.0 * std::f32::consts::TAU / FIXTURE_RATE as f32).sin())
        .collect();
    Waveform::new(samples, 1, FIXTURE_RATE)
}

pub fn write_tone(path: &Path, seconds: f64) {
    write_wav(path, &tone(seconds)).unwrap();
}

/// Instrumental model: a tone of the requested duration
pub struct FakeInstrumental;

#[async_trait]
impl InstrumentalProvider for FakeInstrumental {
    fn name(&self) -> &str {
        "fake-instrumental"
    }

    async fn synthesize(&self, _prompt: &str, duration_seconds: u32, output: &Path) -> PipelineResult<()> {
        write_wav(output, &tone(duration_seconds as f64))
    }
}

/// Vocal model: one second of tone per chunk; records every request
#[derive(Default)]
pub struct FakeVocals {
    pub requests: Mutex<Vec<(String, String, bool)>>,
}

#[async_trait]
impl VocalProvider for FakeVocals {
    fn name(&self) -> &str {
        "fake-vocals"
    }

    async fn synthesize_chunk(&self, request: &VocalRequest<'_>, output: &Path) -> PipelineResult<()> {
        self.requests.lock().unwrap().push((
            request.text.to_string(),
            request.voice.as_str().to_string(),
            request.reference_sample.is_some(),
        ));
        write_wav(output, &tone(1.0))
    }
}

/// Converter: copies input to output, or fails
pub struct FakeConverter {
    pub fail: bool,
    pub calls: Mutex<usize>,
}

impl FakeConverter {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl VoiceConverter for FakeConverter {
    async fn convert(&self, input: &Path, output: &Path, model: Option<&Path>) -> PipelineResult<PathBuf> {
        *self.calls.lock().unwrap() += 1;
        if model.is_none() {
            return Err(PipelineError::Configuration("no model".to_string()));
        }
        if self.fail {
            return Err(PipelineError::Provider("converter crashed".to_string()));
        }
        std::fs::copy(input, output)?;
        Ok(output.to_path_buf())
    }
}

/// Encoder: "encodes" by copying the WAV bytes
pub struct FakeEncoder {
    pub fail: bool,
}

#[async_trait]
impl AudioEncoder for FakeEncoder {
    async fn encode_mp3(&self, input_wav: &Path, output: &Path, _bitrate: &str) -> PipelineResult<()> {
        if self.fail {
            return Err(PipelineError::Media("encoder exited with status 1".to_string()));
        }
        std::fs::copy(input_wav, output)?;
        Ok(())
    }
}

/// Renderer: writes a placeholder file and records each plan
#[derive(Default)]
pub struct FakeRenderer {
    pub plans: Mutex<Vec<CompositionPlan>>,
}

#[async_trait]
impl VideoRenderer for FakeRenderer {
    async fn render(&self, plan: &CompositionPlan) -> PipelineResult<()> {
        std::fs::write(&plan.output, format!("video {:.3}s", plan.duration_seconds))?;
        self.plans.lock().unwrap().push(plan.clone());
        Ok(())
    }
}

/// Fetcher for which every URL is unreachable
pub struct UnreachableFetcher;

#[async_trait]
impl AssetFetcher for UnreachableFetcher {
    async fn fetch(&self, url: &str, _dir: &Path, _stem: &str) -> PipelineResult<PathBuf> {
        Err(PipelineError::AssetFetch(format!("connection refused: {}", url)))
    }
}

/// Search returning a fixed link list
pub struct FixedSearch(pub Vec<String>);

#[async_trait]
impl AssetSearch for FixedSearch {
    async fn search(&self, _query: &str) -> PipelineResult<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Uploader that records file names
#[derive(Default)]
pub struct RecordingUploader {
    pub uploaded: Mutex<Vec<String>>,
}

#[async_trait]
impl RemoteUploader for RecordingUploader {
    fn name(&self) -> &str {
        "recording"
    }

    async fn upload(&self, file: &Path) -> PipelineResult<String> {
        let name = file.file_name().unwrap().to_string_lossy().into_owned();
        self.uploaded.lock().unwrap().push(name.clone());
        Ok(format!("https://example.invalid/{}", name))
    }
}

/// Everything a test needs to drive and inspect one orchestrator
pub struct Harness {
    pub root: TempDir,
    pub paths: StudioPaths,
    pub db: sqlx::SqlitePool,
    pub event_bus: EventBus,
    pub orchestrator: Arc<JobOrchestrator>,
    pub vocals: Arc<FakeVocals>,
    pub renderer: Arc<FakeRenderer>,
}

/// Knobs for `Harness::build`
pub struct HarnessOptions {
    pub providers_available: bool,
    pub encoder_fails: bool,
    pub converter: Option<Arc<FakeConverter>>,
    pub asset_links: Option<Vec<String>>,
    pub uploader: Option<Arc<RecordingUploader>>,
    pub voice_model: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            providers_available: true,
            encoder_fails: false,
            converter: None,
            asset_links: None,
            uploader: None,
            voice_model: false,
        }
    }
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(HarnessOptions::default()).await
    }

    pub async fn build(options: HarnessOptions) -> Self {
        let root = TempDir::new().unwrap();
        let paths = StudioPaths::from_root(root.path());
        paths.ensure_exists().unwrap();

        let db = lbai_studio::db::init_memory_pool().await.unwrap();
        let event_bus = EventBus::new(256);
        let vocals = Arc::new(FakeVocals::default());
        let renderer = Arc::new(FakeRenderer::default());

        let providers = Providers {
            instrumental: if options.providers_available {
                Arc::new(FakeInstrumental) as Arc<dyn InstrumentalProvider>
            } else {
                Arc::new(UnavailableProvider::new("music model failed to load"))
            },
            vocals: if options.providers_available {
                vocals.clone() as Arc<dyn VocalProvider>
            } else {
                Arc::new(UnavailableProvider::new("speech model failed to load"))
            },
            voice_converter: options
                .converter
                .map(|c| c as Arc<dyn VoiceConverter>),
            asset_search: options
                .asset_links
                .map(|links| Arc::new(FixedSearch(links)) as Arc<dyn AssetSearch>),
            uploader: options
                .uploader
                .map(|u| u as Arc<dyn RemoteUploader>),
        };

        let media = MediaTools {
            encoder: Arc::new(FakeEncoder {
                fail: options.encoder_fails,
            }),
            renderer: renderer.clone(),
            fetcher: Arc::new(UnreachableFetcher),
        };

        let mut settings = PipelineSettings::default();
        if options.voice_model {
            settings.voice_model_path = Some(root.path().join("voice.pth"));
        }

        let orchestrator = Arc::new(JobOrchestrator::new(
            db.clone(),
            event_bus.clone(),
            providers,
            media,
            paths.clone(),
            settings,
        ));

        Self {
            root,
            paths,
            db,
            event_bus,
            orchestrator,
            vocals,
            renderer,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(self.db.clone(), self.event_bus.clone(), self.orchestrator.clone())
    }

    pub fn generation_log(&self) -> String {
        std::fs::read_to_string(&self.paths.generation_log).unwrap_or_default()
    }

    pub fn public_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.paths.public_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Drain every event currently buffered
pub fn drain(rx: &mut broadcast::Receiver<StudioEvent>) -> Vec<StudioEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Stage names of the JobStageChanged events, in order
pub fn stages(events: &[StudioEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            StudioEvent::JobStageChanged { stage, .. } => Some(stage.clone()),
            _ => None,
        })
        .collect()
}
