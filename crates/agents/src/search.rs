//! Web search access for the research agent.

use async_trait::async_trait;
use quorum_common::{QuorumError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: String,
}

/// A pluggable search backend. At most `max_results` results come back.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

#[derive(Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    engine: Option<String>,
}

/// Client for a self-hosted SearXNG instance returning JSON.
pub struct SearxngClient {
    base_url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl SearxngClient {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuorumError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    fn convert(response: SearxngResponse, max_results: usize) -> Vec<SearchResult> {
        response
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                snippet: r.content,
                source: r.engine.unwrap_or_else(|| "unknown".to_string()),
            })
            .collect()
    }
}

#[async_trait]
impl SearchClient for SearxngClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let mut request = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("categories", "general"),
                ("engines", "google,bing,duckduckgo"),
                ("safesearch", "1"),
            ])
            .header("Accept", "application/json");

        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QuorumError::Search(format!("Search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuorumError::Search(format!("Search error {status}")));
        }

        let body: SearxngResponse = response
            .json()
            .await
            .map_err(|e| QuorumError::Search(format!("Failed to parse search response: {e}")))?;

        Ok(Self::convert(body, max_results))
    }
}
