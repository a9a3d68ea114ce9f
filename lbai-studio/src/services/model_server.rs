//! HTTP client for generative model servers
//!
//! Music and vocal models run out of process behind a small HTTP contract:
//! `GET {base}/health` answers 2xx once the model is loaded, and generation
//! endpoints take a JSON body and answer with WAV bytes.

use crate::error::{PipelineError, PipelineResult};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = concat!("lbai-studio/", env!("CARGO_PKG_VERSION"));

/// Connection to one model server
#[derive(Debug, Clone)]
pub struct ModelServerClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl ModelServerClient {
    /// Build a client without probing the server
    pub fn new(base_url: &str, timeout: Option<Duration>) -> PipelineResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| PipelineError::ProviderUnavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Build a client and confirm the model is loaded
    ///
    /// Any failure means the capability is unavailable for this process.
    pub async fn connect(base_url: &str, timeout: Option<Duration>) -> PipelineResult<Self> {
        let client = Self::new(base_url, timeout)?;
        let url = format!("{}/health", client.base_url);

        let response = client
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::ProviderUnavailable(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::ProviderUnavailable(format!(
                "{} answered {}",
                url,
                response.status()
            )));
        }

        tracing::info!(base_url = %client.base_url, "Model server ready");
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `{base}{path}` and write the audio response to `output`
    pub async fn post_for_audio<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        output: &Path,
    ) -> PipelineResult<()> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, output = %output.display(), "Requesting audio");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Provider(format!(
                "{} answered {}: {}",
                url, status, error_text
            )));
        }

        let bytes = response.bytes().await.map_err(map_request_error)?;
        if bytes.is_empty() {
            return Err(PipelineError::Provider(format!("{} returned no audio", url)));
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &bytes).await?;
        Ok(())
    }
}

/// Unreachable server means the capability is gone; anything else is a failed request
fn map_request_error(e: reqwest::Error) -> PipelineError {
    if e.is_connect() {
        PipelineError::ProviderUnavailable(e.to_string())
    } else {
        PipelineError::Provider(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ModelServerClient::new("http://localhost:9000/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_is_unavailable() {
        // Port 9 (discard) is closed on test hosts
        let result =
            ModelServerClient::connect("http://127.0.0.1:9", Some(Duration::from_secs(2))).await;
        assert!(matches!(result, Err(PipelineError::ProviderUnavailable(_))));
    }
}
