//! Tavily search backend

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SearchAnswer, SearchClient, SearchHit};
use crate::error::{Result, ToolkitError};

pub const TAVILY_URL: &str = "https://api.tavily.com/search";

#[derive(Clone, Debug)]
pub struct TavilyConfig {
    pub api_key: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl TavilyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: TAVILY_URL.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// `None` when `TAVILY_API_KEY` is unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        lookup("TAVILY_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .map(|key| Self::new(key))
    }
}

pub struct TavilyClient {
    config: TavilyConfig,
    client: reqwest::Client,
}

impl TavilyClient {
    pub fn new(config: TavilyConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResponse> for SearchAnswer {
    fn from(response: TavilyResponse) -> Self {
        SearchAnswer {
            answer: response.answer.filter(|a| !a.trim().is_empty()),
            hits: response
                .results
                .into_iter()
                .map(|r| SearchHit {
                    title: r.title,
                    url: r.url,
                    content: r.content,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<SearchAnswer> {
        let request = TavilyRequest {
            query,
            search_depth: "advanced",
            max_results,
            include_answer: true,
        };

        tracing::debug!(query, max_results, "Tavily search");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolkitError::HttpStatus {
                status: status.as_u16(),
                url: self.config.endpoint.clone(),
            });
        }

        let body: TavilyResponse = response.json().await?;
        Ok(body.into())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
