//! Live web search used to ground answers in fresh data.
//!
//! Two hosted backends are supported: the You.com search index (the default)
//! and the Brave Search API.  Both degrade instead of failing: a missing API
//! key yields one clearly-marked placeholder hit and any transport or
//! decoding error yields no hits at all.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

pub const DEFAULT_MAX_RESULTS: usize = 3;

const YOU_SEARCH_URL: &str = "https://api.ydc-index.io/search";
const BRAVE_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// At most the configured number of hits, best first.  Never fails.
    async fn search(&self, query: &str) -> Vec<SearchHit>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    You,
    Brave,
    /// Search switched off; every query returns no hits.
    None,
}

impl SearchProvider {
    /// Parse a provider name (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "you" | "you.com" | "ydc" => Some(Self::You),
            "brave" => Some(Self::Brave),
            "none" | "off" | "disabled" => Some(Self::None),
            _ => None,
        }
    }

    fn key_env_var(self) -> &'static str {
        match self {
            Self::You => "YOU_API_KEY",
            Self::Brave => "BRAVE_API_KEY",
            Self::None => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub provider: SearchProvider,
    pub api_key: Option<String>,
    pub max_results: usize,
    pub timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: SearchProvider::You,
            api_key: None,
            max_results: DEFAULT_MAX_RESULTS,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Build the backend selected by `settings.provider`.
pub fn build_web_search(settings: SearchSettings) -> Result<Arc<dyn WebSearch>> {
    let search: Arc<dyn WebSearch> = match settings.provider {
        SearchProvider::You | SearchProvider::Brave => Arc::new(HostedSearchClient::new(settings)?),
        SearchProvider::None => Arc::new(DisabledSearch),
    };
    Ok(search)
}

/// Client for the hosted search APIs.
#[derive(Debug, Clone)]
pub struct HostedSearchClient {
    client: reqwest::Client,
    settings: SearchSettings,
}

impl HostedSearchClient {
    pub fn new(settings: SearchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("researcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build search HTTP client")?;
        Ok(Self { client, settings })
    }

    fn api_key(&self) -> Option<&str> {
        self.settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    async fn search_you(&self, query: &str, api_key: &str) -> Result<Vec<SearchHit>> {
        let count = self.settings.max_results.to_string();
        let response = self
            .client
            .get(YOU_SEARCH_URL)
            .query(&[("query", query), ("num_web_results", count.as_str())])
            .header("X-API-Key", api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("You.com search error {status}: {body}");
        }

        let json: serde_json::Value = response.json().await?;
        Ok(parse_you_hits(&json, self.settings.max_results))
    }

    async fn search_brave(&self, query: &str, api_key: &str) -> Result<Vec<SearchHit>> {
        let count = self.settings.max_results.to_string();
        let response = self
            .client
            .get(BRAVE_SEARCH_URL)
            .query(&[("q", query), ("count", count.as_str())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Brave Search API error {status}: {body}");
        }

        let json: serde_json::Value = response.json().await?;
        Ok(parse_brave_results(&json, self.settings.max_results))
    }
}

#[async_trait]
impl WebSearch for HostedSearchClient {
    async fn search(&self, query: &str) -> Vec<SearchHit> {
        let provider = self.settings.provider;
        let Some(api_key) = self.api_key() else {
            warn!(?provider, "search API key is not set; returning mock results");
            return placeholder_hits(provider);
        };

        let result = match provider {
            SearchProvider::You => self.search_you(query, api_key).await,
            SearchProvider::Brave => self.search_brave(query, api_key).await,
            SearchProvider::None => Ok(Vec::new()),
        };

        match result {
            Ok(hits) => {
                debug!(?provider, hits = hits.len(), "web search complete");
                hits
            }
            Err(err) => {
                error!(?provider, error = %err, "error searching the web");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    async fn search(&self, _query: &str) -> Vec<SearchHit> {
        Vec::new()
    }
}

fn placeholder_hits(provider: SearchProvider) -> Vec<SearchHit> {
    vec![SearchHit {
        title: "Mock Result: web search unavailable".to_string(),
        url: match provider {
            SearchProvider::Brave => "https://search.brave.com".to_string(),
            _ => "https://you.com".to_string(),
        },
        snippet: format!(
            "This is a placeholder result because the {} environment variable is not set.",
            provider.key_env_var()
        ),
    }]
}

/// Map a You.com response (`hits[]`) to search hits.  A hit's snippet is its
/// `snippets` joined by spaces, falling back to `description`.
pub fn parse_you_hits(json: &serde_json::Value, max_results: usize) -> Vec<SearchHit> {
    let Some(hits) = json["hits"].as_array() else {
        return Vec::new();
    };

    hits.iter()
        .take(max_results)
        .map(|hit| {
            let snippets = hit["snippets"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|s| s.as_str())
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            let snippet = if snippets.is_empty() {
                hit["description"].as_str().unwrap_or("").trim().to_string()
            } else {
                snippets
            };
            SearchHit {
                title: hit["title"].as_str().unwrap_or("").trim().to_string(),
                url: hit["url"].as_str().unwrap_or("").trim().to_string(),
                snippet,
            }
        })
        .collect()
}

/// Map a Brave response (`web.results[]`) to search hits, skipping untitled
/// results.
pub fn parse_brave_results(json: &serde_json::Value, max_results: usize) -> Vec<SearchHit> {
    let Some(results) = json["web"]["results"].as_array() else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|item| {
            let title = item["title"].as_str().unwrap_or("").trim();
            if title.is_empty() {
                return None;
            }
            Some(SearchHit {
                title: title.to_string(),
                url: item["url"].as_str().unwrap_or("").trim().to_string(),
                snippet: item["description"].as_str().unwrap_or("").trim().to_string(),
            })
        })
        .take(max_results)
        .collect()
}
