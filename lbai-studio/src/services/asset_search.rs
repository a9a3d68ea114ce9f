//! Background asset search
//!
//! Queries a web search capability for free stock images/clips. Only links on
//! known free-stock hosts qualify; one of them is picked at random. Search is
//! optional: every failure becomes `AssetOutcome::Unavailable`.

use crate::error::{PipelineError, PipelineResult};
use crate::models::AssetOutcome;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERPER_SEARCH_URL: &str = "https://google.serper.dev/search";

/// Hosts whose assets are free to reuse
pub const ALLOWED_HOSTS: &[&str] = &["pexels.com", "unsplash.com", "pixabay.com"];

/// Kind of background asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    Image,
    Video,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Image => "image",
            AssetType::Video => "video",
        }
    }
}

/// Web search capability returning result links in rank order
#[async_trait]
pub trait AssetSearch: Send + Sync {
    async fn search(&self, query: &str) -> PipelineResult<Vec<String>>;
}

/// Full query string sent to the search capability
pub fn search_query(query: &str, asset_type: AssetType) -> String {
    format!("{} {} free image", query, asset_type.as_str())
}

/// True if `link` points at one of the allowed hosts
pub fn is_allowed_link(link: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(link) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    ALLOWED_HOSTS
        .iter()
        .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
}

/// Search for one usable asset URL
pub async fn find_asset<R: Rng + ?Sized>(
    search: Option<&dyn AssetSearch>,
    asset_type: AssetType,
    query: &str,
    rng: &mut R,
) -> AssetOutcome {
    let Some(search) = search else {
        return AssetOutcome::Unavailable("asset search not configured".to_string());
    };

    let links = match search.search(&search_query(query, asset_type)).await {
        Ok(links) => links,
        Err(e) => return AssetOutcome::Unavailable(e.to_string()),
    };

    let candidates: Vec<String> = links.into_iter().filter(|l| is_allowed_link(l)).collect();
    match candidates.choose(rng) {
        Some(url) => AssetOutcome::Found(url.clone()),
        None => AssetOutcome::Unavailable(format!(
            "no {} results from allowed hosts",
            asset_type.as_str()
        )),
    }
}

#[derive(Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    #[serde(default)]
    link: String,
}

/// Serper (Google search API) client
pub struct SerperClient {
    http_client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SerperClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::AssetFetch(e.to_string()))?;
        Ok(Self {
            http_client,
            api_key: api_key.into(),
            endpoint: SERPER_SEARCH_URL.to_string(),
        })
    }

    /// Point at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl AssetSearch for SerperClient {
    async fn search(&self, query: &str) -> PipelineResult<Vec<String>> {
        tracing::debug!(query = %query, "Searching assets");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest { q: query })
            .send()
            .await
            .map_err(|e| PipelineError::AssetFetch(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::AssetFetch(format!(
                "Search answered {}",
                status
            )));
        }

        let body: SerperResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::AssetFetch(format!("Search response invalid: {}", e)))?;

        Ok(body
            .organic
            .into_iter()
            .map(|o| o.link)
            .filter(|l| !l.is_empty())
            .collect())
    }
}
