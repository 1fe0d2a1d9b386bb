//! Search modes, configuration and result forms

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker every failed search starts with
pub const SEARCH_ERROR_PREFIX: &str = "Search error:";

/// Text returned when a result-set search finds nothing
pub const NO_RESULTS_TEXT: &str = "No specific results found on the web.";

/// Hosted Tavily endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";

/// Bounds on the number of title/snippet pairs returned in result-set mode
pub const MIN_RESULTS: usize = 3;
pub const MAX_RESULTS: usize = 5;

/// How a query is answered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// One synthesized short answer
    Answer,
    /// A bounded, ordered list of title/snippet pairs
    #[default]
    Results,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "answer" | "direct" => Ok(SearchMode::Answer),
            "results" | "result-set" => Ok(SearchMode::Results),
            other => Err(format!(
                "unknown search mode '{}' (expected 'answer' or 'results')",
                other
            )),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Answer => f.write_str("answer"),
            SearchMode::Results => f.write_str("results"),
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub mode: SearchMode,
    max_results: usize,
    /// Search endpoint URL
    pub endpoint: String,
}

impl SearchConfig {
    /// Create a config; `max_results` is clamped to `MIN_RESULTS..=MAX_RESULTS`.
    pub fn new(mode: SearchMode, max_results: usize) -> Self {
        Self {
            mode,
            max_results: max_results.clamp(MIN_RESULTS, MAX_RESULTS),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Point the client at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new(SearchMode::default(), MIN_RESULTS)
    }
}

/// One entry of a result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
}

/// The forms a search can produce. Downstream code treats all of them as
/// opaque text via [`SearchResult::render`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    /// Direct short answer
    Answer(String),
    /// Ordered title/snippet pairs
    Hits(Vec<SearchHit>),
    /// Provider payload that fit neither shape
    Raw(serde_json::Value),
    /// Failure description (without the marker)
    Error(String),
}

impl SearchResult {
    /// Render as prompt-ready text
    pub fn render(&self) -> String {
        match self {
            SearchResult::Answer(answer) => answer.trim().to_string(),
            SearchResult::Hits(hits) if hits.is_empty() => NO_RESULTS_TEXT.to_string(),
            SearchResult::Hits(hits) => hits
                .iter()
                .map(|h| format!("Title: {}\nSnippet: {}", h.title, h.snippet))
                .collect::<Vec<_>>()
                .join("\n"),
            SearchResult::Raw(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            SearchResult::Error(message) => format!("{} {}", SEARCH_ERROR_PREFIX, message),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SearchResult::Error(_))
    }

    /// Whether the search found anything the tutor can ground on.
    ///
    /// Errors, empty result sets and blank answers do not count.
    pub fn has_live_data(&self) -> bool {
        match self {
            SearchResult::Answer(answer) => !answer.trim().is_empty(),
            SearchResult::Hits(hits) => !hits.is_empty(),
            SearchResult::Raw(value) => !value.is_null(),
            SearchResult::Error(_) => false,
        }
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
