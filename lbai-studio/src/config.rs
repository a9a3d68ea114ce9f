//! Configuration for lbai-studio
//!
//! Settings come from (highest priority first) command-line arguments,
//! environment variables, the TOML file and compiled defaults. Secrets are
//! resolved through `lbai_common::config::resolve_setting`, which logs only
//! where a value came from.

use lbai_common::config::{
    default_config_path, load_toml_or_default, resolve_setting, LoggingConfig,
    RootFolderInitializer, RootFolderResolver,
};
use lbai_common::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::publisher::{GitHubTarget, DEFAULT_GITHUB_FOLDER};
use crate::services::text_chunker::DEFAULT_MAX_CHARS;
use crate::services::video_composer::VideoSettings;
use crate::utils::safe_filename;

/// Module name used for the config file and log prefixes
pub const MODULE_NAME: &str = "lbai-studio";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// File name of the most recently uploaded voice sample
pub const VOICE_SAMPLE_FILE_NAME: &str = "latest_sample.wav";

/// Generation log file name
pub const GENERATION_LOG_FILE_NAME: &str = "generation_log.txt";

/// `[providers]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersToml {
    /// Base URL of the music model server
    pub instrumental_url: Option<String>,
    /// Base URL of the vocal model server
    pub vocals_url: Option<String>,
    /// Per-request timeout; unset means wait indefinitely
    pub request_timeout_secs: Option<u64>,
}

/// `[voice_conversion]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConversionToml {
    /// e.g. "python rvc_infer.py"
    pub command: Option<String>,
    pub model_path: Option<String>,
}

/// `[assets]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetsToml {
    pub serper_api_key: Option<String>,
}

/// `[publish]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishToml {
    pub github_user: Option<String>,
    pub github_repo: Option<String>,
    pub github_token: Option<String>,
    pub github_folder: Option<String>,
}

/// `[media]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaToml {
    pub ffmpeg_path: Option<String>,
}

/// `[pipeline]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineToml {
    pub lyric_chunk_chars: usize,
    pub vocals_gain_db: f32,
    pub mp3_bitrate: String,
    pub video_fps: u32,
    pub video_width: u32,
    pub video_height: u32,
}

impl Default for PipelineToml {
    fn default() -> Self {
        let video = VideoSettings::default();
        Self {
            lyric_chunk_chars: DEFAULT_MAX_CHARS,
            vocals_gain_db: 0.0,
            mp3_bitrate: "192k".to_string(),
            video_fps: video.fps,
            video_width: video.width,
            video_height: video.height,
        }
    }
}

/// Contents of `lbai-studio.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioToml {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub logging: LoggingConfig,
    pub providers: ProvidersToml,
    pub voice_conversion: VoiceConversionToml,
    pub assets: AssetsToml,
    pub publish: PublishToml,
    pub media: MediaToml,
    pub pipeline: PipelineToml,
}

/// Pipeline tuning passed to the orchestrator
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub lyric_chunk_chars: usize,
    pub vocals_gain_db: f32,
    pub mp3_bitrate: String,
    pub video: VideoSettings,
    /// Voice model for conversion; conversion fails without it
    pub voice_model_path: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings::from_toml(&PipelineToml::default(), None)
    }
}

impl PipelineSettings {
    fn from_toml(toml: &PipelineToml, voice_model_path: Option<PathBuf>) -> Self {
        Self {
            lyric_chunk_chars: toml.lyric_chunk_chars.max(1),
            vocals_gain_db: toml.vocals_gain_db,
            mp3_bitrate: toml.mp3_bitrate.clone(),
            video: VideoSettings {
                width: toml.video_width,
                height: toml.video_height,
                fps: toml.video_fps.max(1),
            },
            voice_model_path,
        }
    }
}

/// Directory layout under the root folder
#[derive(Debug, Clone)]
pub struct StudioPaths {
    pub root: PathBuf,
    /// Every artifact a job writes
    pub output_dir: PathBuf,
    /// Published copies served by `/public`
    pub public_dir: PathBuf,
    pub voice_samples_dir: PathBuf,
    pub generation_log: PathBuf,
    pub database: PathBuf,
}

impl StudioPaths {
    pub fn from_root(root: &Path) -> Self {
        let initializer = RootFolderInitializer::new(root.to_path_buf());
        Self {
            root: root.to_path_buf(),
            output_dir: root.join("output"),
            public_dir: root.join("public_downloads"),
            voice_samples_dir: root.join("voice_samples"),
            generation_log: root.join(GENERATION_LOG_FILE_NAME),
            database: initializer.database_path(),
        }
    }

    /// Fixed location of the uploaded voice sample
    pub fn voice_sample_path(&self) -> PathBuf {
        self.voice_samples_dir.join(VOICE_SAMPLE_FILE_NAME)
    }

    /// Sample file named by a request, confined to the samples directory
    ///
    /// Only the basename of `requested` is used; absent or unusable names
    /// select the uploaded sample.
    pub fn voice_sample_for(&self, requested: Option<&str>) -> PathBuf {
        match requested.and_then(safe_filename) {
            Some(name) => self.voice_samples_dir.join(name),
            None => self.voice_sample_path(),
        }
    }

    /// Create the root folder and every subdirectory
    pub fn ensure_exists(&self) -> Result<()> {
        RootFolderInitializer::new(self.root.clone()).ensure_directory_exists()?;
        for dir in [&self.output_dir, &self.public_dir, &self.voice_samples_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Command-line overrides
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub root_folder: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub port: u16,
    pub bind_address: String,
    pub log_level: String,
    pub paths: StudioPaths,
    pub instrumental_url: Option<String>,
    pub vocals_url: Option<String>,
    pub request_timeout: Option<Duration>,
    pub voice_conversion_command: String,
    pub serper_api_key: Option<String>,
    pub github: Option<GitHubTarget>,
    pub ffmpeg_path: PathBuf,
    pub pipeline: PipelineSettings,
}

impl StudioConfig {
    /// Resolve from CLI overrides, environment, and the TOML file
    pub fn resolve(cli: &CliOverrides) -> Self {
        let config_path = cli
            .config_path
            .clone()
            .or_else(|| default_config_path(MODULE_NAME));
        let toml: StudioToml = load_toml_or_default(config_path.as_deref());
        Self::from_sources(cli, toml)
    }

    /// Resolve against an already-loaded TOML config
    pub fn from_sources(cli: &CliOverrides, toml: StudioToml) -> Self {
        let root = RootFolderResolver::new(MODULE_NAME)
            .with_cli_arg(cli.root_folder.clone())
            .with_toml_root(toml.root_folder.clone())
            .resolve();

        let port = cli
            .port
            .or_else(|| {
                resolve_setting("Port", "PORT", None).and_then(|(v, _)| v.trim().parse().ok())
            })
            .or(toml.port)
            .unwrap_or(DEFAULT_PORT);

        let voice_model_path = resolve_setting(
            "Voice model path",
            "RVC_MODEL_PATH",
            toml.voice_conversion.model_path.as_deref(),
        )
        .map(|(v, _)| PathBuf::from(v));

        let serper_api_key = resolve_setting(
            "Serper API key",
            "SERPER_API_KEY",
            toml.assets.serper_api_key.as_deref(),
        )
        .map(|(v, _)| v);

        let github = resolve_github(&toml.publish);

        Self {
            port,
            bind_address: toml
                .bind_address
                .clone()
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            log_level: toml.logging.level.clone(),
            paths: StudioPaths::from_root(&root),
            instrumental_url: toml.providers.instrumental_url.clone(),
            vocals_url: toml.providers.vocals_url.clone(),
            request_timeout: toml.providers.request_timeout_secs.map(Duration::from_secs),
            voice_conversion_command: toml
                .voice_conversion
                .command
                .clone()
                .unwrap_or_else(|| "python rvc_infer.py".to_string()),
            serper_api_key,
            github,
            ffmpeg_path: toml
                .media
                .ffmpeg_path
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            pipeline: PipelineSettings::from_toml(&toml.pipeline, voice_model_path),
        }
    }
}

/// All three of user, repo and token are required; the folder is optional
fn resolve_github(publish: &PublishToml) -> Option<GitHubTarget> {
    let user = resolve_setting("GitHub user", "GITHUB_USER", publish.github_user.as_deref());
    let repo = resolve_setting("GitHub repo", "GITHUB_REPO", publish.github_repo.as_deref());
    let token = resolve_setting("GitHub token", "GITHUB_TOKEN", publish.github_token.as_deref());

    match (user, repo, token) {
        (Some((user, _)), Some((repo, _)), Some((token, _))) => Some(GitHubTarget {
            user,
            repo,
            token,
            folder: publish
                .github_folder
                .clone()
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GITHUB_FOLDER.to_string()),
        }),
        _ => None,
    }
}
