//! Tavily search API client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, SearchConfig, SearchError, SearchHit, SearchMode, SearchProvider, SearchResult};

/// Tavily-backed search provider
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    config: SearchConfig,
}

impl TavilySearch {
    /// Create a client with the search API key and configuration
    pub fn new(api_key: impl Into<String>, config: SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            config,
        }
    }

    fn build_request<'a>(&self, query: &'a str) -> TavilyRequest<'a> {
        TavilyRequest {
            query,
            max_results: self.config.max_results(),
            include_answer: self.config.mode == SearchMode::Answer,
            search_depth: "basic",
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn try_search(&self, query: &str) -> Result<SearchResult> {
        tracing::debug!(
            mode = %self.config.mode,
            max_results = self.config.max_results(),
            "Searching: {}",
            query
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(query))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                message: error_detail(&body),
            });
        }

        let payload: serde_json::Value = serde_json::from_str(&body)?;
        parse_response(&self.config, payload)
    }
}

/// Interpret a Tavily response payload according to the configured mode.
fn parse_response(config: &SearchConfig, payload: serde_json::Value) -> Result<SearchResult> {
    match config.mode {
        SearchMode::Answer => {
            let answer = payload
                .get("answer")
                .and_then(|a| a.as_str())
                .map(str::trim)
                .filter(|a| !a.is_empty());
            Ok(match answer {
                Some(answer) => SearchResult::Answer(answer.to_string()),
                None => SearchResult::Raw(payload),
            })
        }
        SearchMode::Results => {
            let Some(results) = payload.get("results") else {
                return Ok(SearchResult::Raw(payload));
            };
            let results: Vec<TavilyResult> = serde_json::from_value(results.clone())?;
            let hits = results
                .into_iter()
                .take(config.max_results())
                .map(|r| SearchHit {
                    title: r.title,
                    snippet: r.content,
                })
                .collect();
            Ok(SearchResult::Hits(hits))
        }
    }
}

/// Pull a readable message out of a Tavily error body.
fn error_detail(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let detail = parsed.as_ref().and_then(|v| {
        v.pointer("/detail/error")
            .or_else(|| v.get("detail"))
            .or_else(|| v.get("error"))
            .and_then(|d| d.as_str())
    });
    match detail {
        Some(d) => d.to_string(),
        None if body.trim().is_empty() => "empty response".to_string(),
        None => body.trim().to_string(),
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    include_answer: bool,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}
