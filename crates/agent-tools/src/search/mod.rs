//! Web Search Backends
//!
//! Abstractions and implementations for answer-style web search.

mod mock;
mod tavily;

pub use mock::MockSearchClient;
pub use tavily::{TavilyClient, TavilyConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One search hit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// What a backend returns for a query
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchAnswer {
    /// Synthesized answer, when the backend produces one
    pub answer: Option<String>,
    pub hits: Vec<SearchHit>,
}

/// Search client trait (Strategy pattern)
///
/// Implement this for each search backend.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<SearchAnswer>;

    /// Backend name
    fn name(&self) -> &str;
}

/// Stand-in when no backend is configured; every search fails with a clear message.
pub struct UnconfiguredSearch;

#[async_trait]
impl SearchClient for UnconfiguredSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<SearchAnswer> {
        Err(crate::error::ToolkitError::SearchUnavailable(
            "set TAVILY_API_KEY to enable web search".into(),
        ))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// Tavily when `TAVILY_API_KEY` is set, otherwise [`UnconfiguredSearch`]
pub fn client_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<std::sync::Arc<dyn SearchClient>> {
    match TavilyConfig::from_lookup(lookup) {
        Some(config) => Ok(std::sync::Arc::new(TavilyClient::new(config)?)),
        None => {
            tracing::warn!("TAVILY_API_KEY not set, web search disabled");
            Ok(std::sync::Arc::new(UnconfiguredSearch))
        }
    }
}
