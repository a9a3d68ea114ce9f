//! Publishing
//!
//! Copies finished artifacts into the public download directory and uploads
//! them to a GitHub repository. Publishing is best-effort: every failure is
//! recorded in the report and logged, none aborts the job.

use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const GITHUB_API_URL: &str = "https://api.github.com";

/// Folder in the target repository when none is configured
pub const DEFAULT_GITHUB_FOLDER: &str = "d-output";

/// Remote storage for finished artifacts
#[async_trait]
pub trait RemoteUploader: Send + Sync {
    fn name(&self) -> &str;

    /// Upload `file`, returning a remote reference
    async fn upload(&self, file: &Path) -> PipelineResult<String>;
}

/// GitHub repository settings
#[derive(Debug, Clone)]
pub struct GitHubTarget {
    pub user: String,
    pub repo: String,
    pub token: String,
    pub folder: String,
}

#[derive(Serialize)]
struct PutContents<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Uploads through the GitHub contents API
pub struct GitHubUploader {
    http_client: reqwest::Client,
    target: GitHubTarget,
    api_url: String,
}

impl GitHubUploader {
    pub fn new(target: GitHubTarget, timeout: Duration) -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("lbai-studio/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Provider(e.to_string()))?;
        Ok(Self {
            http_client,
            target,
            api_url: GITHUB_API_URL.to_string(),
        })
    }

    /// Contents API URL for `file_name`
    pub fn contents_url(&self, file_name: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}/{}",
            self.api_url,
            self.target.user,
            self.target.repo,
            self.target.folder.trim_matches('/'),
            file_name
        )
    }
}

#[async_trait]
impl RemoteUploader for GitHubUploader {
    fn name(&self) -> &str {
        "github"
    }

    async fn upload(&self, file: &Path) -> PipelineResult<String> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PipelineError::Validation(format!("No file name: {}", file.display())))?;

        let bytes = tokio::fs::read(file).await?;
        let url = self.contents_url(&file_name);

        let body = PutContents {
            message: format!("Add generated file {}", file_name),
            content: base64::engine::general_purpose::STANDARD.encode(bytes),
            branch: None,
        };

        let response = self
            .http_client
            .put(&url)
            .header("Authorization", format!("token {}", self.target.token))
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Provider(format!("GitHub upload failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() != 200 && status.as_u16() != 201 {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Provider(format!(
                "GitHub answered {}: {}",
                status, error_text
            )));
        }

        Ok(url)
    }
}

/// Outcome for one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishEntry {
    pub source: PathBuf,
    /// Copy in the public directory, if the copy succeeded
    pub public_path: Option<PathBuf>,
    /// Remote reference, if the upload succeeded
    pub remote: Option<String>,
    pub errors: Vec<String>,
}

/// Per-artifact publishing results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub entries: Vec<PublishEntry>,
}

impl PublishReport {
    pub fn public_paths(&self) -> Vec<&Path> {
        self.entries
            .iter()
            .filter_map(|e| e.public_path.as_deref())
            .collect()
    }

    pub fn uploaded(&self) -> usize {
        self.entries.iter().filter(|e| e.remote.is_some()).count()
    }

    pub fn failures(&self) -> Vec<&str> {
        self.entries
            .iter()
            .flat_map(|e| e.errors.iter().map(String::as_str))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.errors.is_empty())
    }
}

/// Publisher stage
pub struct Publisher {
    public_dir: PathBuf,
    uploader: Option<Arc<dyn RemoteUploader>>,
}

impl Publisher {
    pub fn new(public_dir: PathBuf, uploader: Option<Arc<dyn RemoteUploader>>) -> Self {
        Self {
            public_dir,
            uploader,
        }
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Copy each file to the public directory and upload it
    pub async fn publish(&self, files: &[PathBuf]) -> PublishReport {
        let mut report = PublishReport::default();

        if let Err(e) = tokio::fs::create_dir_all(&self.public_dir).await {
            tracing::warn!(dir = %self.public_dir.display(), error = %e, "Cannot create public directory");
        }

        if self.uploader.is_none() {
            tracing::warn!("Remote upload not configured, skipping");
        }

        for source in files {
            let mut entry = PublishEntry {
                source: source.clone(),
                public_path: None,
                remote: None,
                errors: Vec::new(),
            };

            match source.file_name() {
                Some(name) => {
                    let dest = self.public_dir.join(name);
                    match tokio::fs::copy(source, &dest).await {
                        Ok(_) => entry.public_path = Some(dest),
                        Err(e) => {
                            tracing::warn!(file = %source.display(), error = %e, "Copy to public directory failed");
                            entry.errors.push(format!("copy: {}", e));
                        }
                    }
                }
                None => entry.errors.push("copy: source has no file name".to_string()),
            }

            if let Some(uploader) = &self.uploader {
                match uploader.upload(source).await {
                    Ok(remote) => {
                        tracing::info!(file = %source.display(), uploader = uploader.name(), "Uploaded");
                        entry.remote = Some(remote);
                    }
                    Err(e) => {
                        tracing::warn!(
                            file = %source.display(),
                            uploader = uploader.name(),
                            error = %e,
                            "Upload failed"
                        );
                        entry.errors.push(format!("{}: {}", uploader.name(), e));
                    }
                }
            }

            report.entries.push(entry);
        }

        report
    }
}
