//! Web search fallback.
//!
//! When the transcript cannot answer a question, a short web snippet is used
//! instead. Backends are tried in configured order and the first result wins.

mod clean;
mod duckduckgo;

pub use clean::clean_text;

use crate::config::WebSearchSettings;
use crate::error::{Result, YoutubotError};
use async_trait::async_trait;
use duckduckgo::QueryOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A single web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Capability to look something up on the web.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Best result for `query`, or `None` if nothing could be found.
    ///
    /// Backend failures are logged, never returned.
    async fn search(&self, query: &str) -> Option<WebSearchResult>;
}

/// Available search backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    /// html.duckduckgo.com results page.
    DuckDuckGoHtml,
    /// lite.duckduckgo.com results page.
    DuckDuckGoLite,
    /// api.duckduckgo.com Instant Answer JSON.
    InstantAnswer,
}

impl std::str::FromStr for SearchBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "duckduckgo_html" | "html" => Ok(SearchBackend::DuckDuckGoHtml),
            "duckduckgo_lite" | "lite" => Ok(SearchBackend::DuckDuckGoLite),
            "instant_answer" | "instant" => Ok(SearchBackend::InstantAnswer),
            _ => Err(format!("Unknown search backend: {}", s)),
        }
    }
}

impl std::fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchBackend::DuckDuckGoHtml => write!(f, "duckduckgo_html"),
            SearchBackend::DuckDuckGoLite => write!(f, "duckduckgo_lite"),
            SearchBackend::InstantAnswer => write!(f, "instant_answer"),
        }
    }
}

/// Web search over DuckDuckGo with ordered backend fallback.
pub struct WebSearchService {
    client: reqwest::Client,
    backends: Vec<SearchBackend>,
    options: QueryOptions,
}

impl WebSearchService {
    /// Build the service from settings. Unknown backend names are skipped.
    pub fn from_settings(settings: &WebSearchSettings) -> Result<Self> {
        let backends = settings
            .backends
            .iter()
            .filter_map(|name| match name.parse::<SearchBackend>() {
                Ok(backend) => Some(backend),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            })
            .collect();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| YoutubotError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            backends,
            options: QueryOptions {
                region: settings.region.clone(),
                safesearch: settings.safesearch.clone(),
                max_results: settings.max_results.max(1),
            },
        })
    }

    pub fn backends(&self) -> &[SearchBackend] {
        &self.backends
    }

    async fn search_backend(&self, backend: SearchBackend, query: &str) -> Result<Vec<WebSearchResult>> {
        match backend {
            SearchBackend::DuckDuckGoHtml => duckduckgo::search_html(&self.client, query, &self.options).await,
            SearchBackend::DuckDuckGoLite => duckduckgo::search_lite(&self.client, query, &self.options).await,
            SearchBackend::InstantAnswer => duckduckgo::search_instant_answer(&self.client, query).await,
        }
    }
}

#[async_trait]
impl WebSearch for WebSearchService {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Option<WebSearchResult> {
        for backend in &self.backends {
            match self.search_backend(*backend, query).await {
                Ok(results) => {
                    if let Some(first) = results.into_iter().next() {
                        info!("Web search via {} found '{}'", backend, first.title);
                        return Some(first);
                    }
                    debug!("Web search via {} returned nothing", backend);
                }
                Err(e) => warn!("Web search via {} failed: {}", backend, e),
            }
        }

        None
    }
}
