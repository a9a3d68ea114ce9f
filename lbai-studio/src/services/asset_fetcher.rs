//! Background asset download
//!
//! Remote images and clips are downloaded next to the job's artifacts before
//! rendering. Anything that is not an image or a video is rejected.

use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Downloads a remote asset into a directory
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download `url` into `dir` as `{stem}.{ext}` and return the path
    async fn fetch(&self, url: &str, dir: &Path, stem: &str) -> PipelineResult<PathBuf>;
}

/// File extension for a media content type, `None` if not image/video
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        m if m.starts_with("image/") => "img",
        m if m.starts_with("video/") => "video",
        _ => return None,
    };
    Some(ext)
}

/// reqwest-backed fetcher
pub struct HttpAssetFetcher {
    http_client: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout: Duration) -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::AssetFetch(e.to_string()))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str, dir: &Path, stem: &str) -> PipelineResult<PathBuf> {
        tracing::debug!(url = %url, "Downloading background asset");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::AssetFetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::AssetFetch(format!("{} answered {}", url, status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let ext = extension_for_content_type(&content_type).ok_or_else(|| {
            PipelineError::AssetFetch(format!(
                "{} is not an image or video (content-type {:?})",
                url, content_type
            ))
        })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::AssetFetch(format!("{}: {}", url, e)))?;
        if bytes.is_empty() {
            return Err(PipelineError::AssetFetch(format!("{} returned no data", url)));
        }

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.{}", stem, ext));
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(url = %url, path = %path.display(), bytes = bytes.len(), "Asset downloaded");
        Ok(path)
    }
}
