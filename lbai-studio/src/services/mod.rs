//! Pipeline components
//!
//! Capability traits live next to their production implementations:
//! HTTP model servers for synthesis, ffmpeg for encoding and rendering,
//! Serper for asset search, the GitHub contents API for publishing.

pub mod asset_fetcher;
pub mod asset_search;
pub mod ffmpeg;
pub mod instrumental;
pub mod job_orchestrator;
pub mod metadata_log;
pub mod mixer;
pub mod model_server;
pub mod providers;
pub mod publisher;
pub mod text_chunker;
pub mod video_composer;
pub mod vocals;
pub mod voice_converter;

pub use asset_fetcher::{AssetFetcher, HttpAssetFetcher};
pub use asset_search::{AssetSearch, AssetType, SerperClient};
pub use ffmpeg::FfmpegClient;
pub use instrumental::{HttpInstrumentalProvider, InstrumentalProvider, UnavailableProvider};
pub use job_orchestrator::JobOrchestrator;
pub use metadata_log::{GenerationLogRecord, MetadataLogger};
pub use mixer::{AudioEncoder, Mixer};
pub use model_server::ModelServerClient;
pub use providers::{MediaTools, Providers};
pub use publisher::{GitHubTarget, GitHubUploader, PublishReport, Publisher, RemoteUploader};
pub use video_composer::{VideoComposer, VideoMode, VideoRenderer, VideoSettings};
pub use vocals::{HttpVocalProvider, VocalProvider, VocalRequest};
pub use voice_converter::VoiceConverter;
