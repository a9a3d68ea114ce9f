//! Video composition
//!
//! Builds a render plan (background, text overlays, exact duration) from the
//! final audio and hands it to a `VideoRenderer`. Background assets are
//! optional: any failure to fetch or render them downgrades to a solid black
//! frame and never aborts the job.

use crate::error::{PipelineError, PipelineResult};
use crate::services::asset_fetcher::AssetFetcher;
use crate::utils::probe_duration;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of lyric lines in the simple-mode footer
pub const SIMPLE_FOOTER_LINES: usize = 3;
/// Number of lyric lines in the high-mode caption block
pub const HIGH_CAPTION_LINES: usize = 40;

const FOOTER_SEPARATOR: &str = "   |   ";
const FALLBACK_COLOR: &str = "black";

/// Quality variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMode {
    /// Static image or solid background with a short lyric footer
    Simple,
    /// Looping background clip with a larger lyric block
    High,
}

impl VideoMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoMode::Simple => "simple",
            VideoMode::High => "high",
        }
    }
}

/// Background layer of a render plan
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    SolidColor(String),
    Image(PathBuf),
    Video(PathBuf),
}

impl Background {
    pub fn solid() -> Self {
        Background::SolidColor(FALLBACK_COLOR.to_string())
    }

    pub fn is_solid(&self) -> bool {
        matches!(self, Background::SolidColor(_))
    }
}

/// How the background was chosen
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundChoice {
    /// The requested asset is used
    Asset(PathBuf),
    /// No asset was requested
    NotRequested,
    /// The requested asset was unusable
    Fallback { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPosition {
    Center,
    BottomCenter,
}

/// Text burned into the video
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub font_size: u32,
    pub color: &'static str,
    pub position: OverlayPosition,
}

/// Everything a renderer needs
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    pub audio: PathBuf,
    pub output: PathBuf,
    pub background: Background,
    /// Output duration; always the audio duration
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub overlays: Vec<TextOverlay>,
}

/// Renders a plan into a video file
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn render(&self, plan: &CompositionPlan) -> PipelineResult<()>;
}

/// Output frame settings
#[derive(Debug, Clone, Copy)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 24,
        }
    }
}

/// One composition request
#[derive(Debug, Clone)]
pub struct ComposeRequest<'a> {
    pub audio: &'a Path,
    pub output: &'a Path,
    pub mode: VideoMode,
    /// URL or local path
    pub background_image: Option<&'a str>,
    /// URL or local path
    pub background_video: Option<&'a str>,
    pub title: &'a str,
    pub lyric_lines: &'a [String],
}

/// Result of one composition
#[derive(Debug, Clone)]
pub struct ComposeOutput {
    pub path: PathBuf,
    pub background: BackgroundChoice,
    pub duration_seconds: f64,
}

/// Text overlays for `mode`
pub fn overlays_for(mode: VideoMode, title: &str, lyric_lines: &[String]) -> Vec<TextOverlay> {
    let mut overlays = vec![TextOverlay {
        text: title.to_string(),
        font_size: 60,
        color: "white",
        position: OverlayPosition::Center,
    }];

    let (caption, font_size) = match mode {
        VideoMode::Simple => (
            lyric_lines
                .iter()
                .take(SIMPLE_FOOTER_LINES)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(FOOTER_SEPARATOR),
            32,
        ),
        VideoMode::High => (
            lyric_lines
                .iter()
                .take(HIGH_CAPTION_LINES)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
            28,
        ),
    };

    if !caption.is_empty() {
        overlays.push(TextOverlay {
            text: caption,
            font_size,
            color: "yellow",
            position: OverlayPosition::BottomCenter,
        });
    }

    overlays
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Composer stage
pub struct VideoComposer {
    renderer: Arc<dyn VideoRenderer>,
    fetcher: Arc<dyn AssetFetcher>,
    settings: VideoSettings,
    download_dir: PathBuf,
}

impl VideoComposer {
    pub fn new(
        renderer: Arc<dyn VideoRenderer>,
        fetcher: Arc<dyn AssetFetcher>,
        settings: VideoSettings,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            renderer,
            fetcher,
            settings,
            download_dir,
        }
    }

    /// Resolve an asset reference to a local file
    async fn localize(&self, reference: &str, stem: &str) -> PipelineResult<PathBuf> {
        if is_remote(reference) {
            return self.fetcher.fetch(reference, &self.download_dir, stem).await;
        }

        let path = PathBuf::from(reference);
        if path.is_file() {
            Ok(path)
        } else {
            Err(PipelineError::AssetFetch(format!(
                "Background asset not found: {}",
                reference
            )))
        }
    }

    async fn choose_background(
        &self,
        request: &ComposeRequest<'_>,
    ) -> (Background, BackgroundChoice) {
        let reference = match request.mode {
            VideoMode::Simple => request.background_image,
            VideoMode::High => request.background_video,
        }
        .filter(|r| !r.trim().is_empty() && *r != "none");

        let Some(reference) = reference else {
            return (Background::solid(), BackgroundChoice::NotRequested);
        };

        let stem = request
            .output
            .file_stem()
            .map(|s| format!("{}_bg", s.to_string_lossy()))
            .unwrap_or_else(|| "background".to_string());

        match self.localize(reference, &stem).await {
            Ok(path) => {
                let background = match request.mode {
                    VideoMode::Simple => Background::Image(path.clone()),
                    VideoMode::High => Background::Video(path.clone()),
                };
                (background, BackgroundChoice::Asset(path))
            }
            Err(e) => {
                tracing::warn!(
                    mode = request.mode.as_str(),
                    asset = %reference,
                    error = %e,
                    "Background asset unusable, using solid color"
                );
                (
                    Background::solid(),
                    BackgroundChoice::Fallback {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    /// Compose one video whose duration equals the audio duration
    pub async fn compose(&self, request: &ComposeRequest<'_>) -> PipelineResult<ComposeOutput> {
        let audio = request.audio.to_path_buf();
        let duration_seconds =
            tokio::task::spawn_blocking(move || probe_duration(&audio)).await??;

        let (background, mut choice) = self.choose_background(request).await;

        let mut plan = CompositionPlan {
            audio: request.audio.to_path_buf(),
            output: request.output.to_path_buf(),
            background,
            duration_seconds,
            width: self.settings.width,
            height: self.settings.height,
            fps: self.settings.fps,
            overlays: overlays_for(request.mode, request.title, request.lyric_lines),
        };

        if let Err(e) = self.renderer.render(&plan).await {
            if plan.background.is_solid() {
                return Err(e);
            }
            tracing::warn!(
                mode = request.mode.as_str(),
                error = %e,
                "Render with background asset failed, retrying on solid color"
            );
            plan.background = Background::solid();
            choice = BackgroundChoice::Fallback {
                reason: e.to_string(),
            };
            self.renderer.render(&plan).await?;
        }

        Ok(ComposeOutput {
            path: plan.output,
            background: choice,
            duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{write_wav, Waveform};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records plans; fails any plan whose background is a video
    struct RecordingRenderer {
        plans: Mutex<Vec<CompositionPlan>>,
        fail_video: bool,
    }

    #[async_trait]
    impl VideoRenderer for RecordingRenderer {
        async fn render(&self, plan: &CompositionPlan) -> PipelineResult<()> {
            self.plans.lock().unwrap().push(plan.clone());
            if self.fail_video && matches!(plan.background, Background::Video(_)) {
                return Err(PipelineError::Media("corrupt clip".to_string()));
            }
            std::fs::write(&plan.output, b"mp4")?;
            Ok(())
        }
    }

    struct OfflineFetcher;

    #[async_trait]
    impl AssetFetcher for OfflineFetcher {
        async fn fetch(&self, url: &str, _: &Path, _: &str) -> PipelineResult<PathBuf> {
            Err(PipelineError::AssetFetch(format!("unreachable: {}", url)))
        }
    }

    fn setup(fail_video: bool) -> (TempDir, Arc<RecordingRenderer>, VideoComposer, PathBuf) {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("song.wav");
        write_wav(&audio, &Waveform::silent(8000 * 3, 1, 8000)).unwrap();

        let renderer = Arc::new(RecordingRenderer {
            plans: Mutex::new(Vec::new()),
            fail_video,
        });
        let composer = VideoComposer::new(
            renderer.clone(),
            Arc::new(OfflineFetcher),
            VideoSettings::default(),
            dir.path().to_path_buf(),
        );
        (dir, renderer, composer, audio)
    }

    fn lines(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("line {}", i)).collect()
    }

    #[tokio::test]
    async fn test_duration_matches_audio_in_both_modes() {
        let (dir, renderer, composer, audio) = setup(false);
        let lyrics = lines(5);

        for mode in [VideoMode::Simple, VideoMode::High] {
            let output = dir.path().join(format!("{}.mp4", mode.as_str()));
            let out = composer
                .compose(&ComposeRequest {
                    audio: &audio,
                    output: &output,
                    mode,
                    background_image: None,
                    background_video: None,
                    title: "Test Song",
                    lyric_lines: &lyrics,
                })
                .await
                .unwrap();
            assert!((out.duration_seconds - 3.0).abs() < 0.01);
            assert_eq!(out.background, BackgroundChoice::NotRequested);
        }

        let plans = renderer.plans.lock().unwrap();
        assert!(plans.iter().all(|p| (p.duration_seconds - 3.0).abs() < 0.01));
        assert!(plans.iter().all(|p| p.fps == 24 && p.width == 1280 && p.height == 720));
    }

    #[tokio::test]
    async fn test_unreachable_video_falls_back_to_solid() {
        let (dir, renderer, composer, audio) = setup(false);
        let output = dir.path().join("high.mp4");
        let lyrics = lines(2);

        let out = composer
            .compose(&ComposeRequest {
                audio: &audio,
                output: &output,
                mode: VideoMode::High,
                background_image: None,
                background_video: Some("https://unreachable.invalid/clip.mp4"),
                title: "Test Song",
                lyric_lines: &lyrics,
            })
            .await
            .unwrap();

        assert!(matches!(out.background, BackgroundChoice::Fallback { .. }));
        assert!(output.exists());
        let plans = renderer.plans.lock().unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].background.is_solid());
    }

    #[tokio::test]
    async fn test_render_failure_with_asset_retries_on_solid() {
        let (dir, renderer, composer, audio) = setup(true);
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"not really a video").unwrap();
        let output = dir.path().join("high.mp4");
        let clip_ref = clip.to_string_lossy().into_owned();

        let out = composer
            .compose(&ComposeRequest {
                audio: &audio,
                output: &output,
                mode: VideoMode::High,
                background_image: None,
                background_video: Some(&clip_ref),
                title: "Test Song",
                lyric_lines: &[],
            })
            .await
            .unwrap();

        assert!(matches!(out.background, BackgroundChoice::Fallback { .. }));
        let plans = renderer.plans.lock().unwrap();
        assert_eq!(plans.len(), 2);
        assert!(matches!(plans[0].background, Background::Video(_)));
        assert!(plans[1].background.is_solid());
    }

    #[test]
    fn test_simple_overlays() {
        let overlays = overlays_for(VideoMode::Simple, "Test Song", &lines(5));
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].text, "Test Song");
        assert_eq!(overlays[0].font_size, 60);
        assert_eq!(overlays[0].position, OverlayPosition::Center);
        assert_eq!(overlays[1].text, "line 1   |   line 2   |   line 3");
        assert_eq!(overlays[1].font_size, 32);
        assert_eq!(overlays[1].color, "yellow");
    }

    #[test]
    fn test_high_overlays_cap_lines() {
        let overlays = overlays_for(VideoMode::High, "T", &lines(50));
        assert_eq!(overlays[1].text.lines().count(), HIGH_CAPTION_LINES);
        assert_eq!(overlays[1].font_size, 28);
    }

    #[test]
    fn test_no_lyrics_means_title_only() {
        assert_eq!(overlays_for(VideoMode::High, "T", &[]).len(), 1);
    }
}
