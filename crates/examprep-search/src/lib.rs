//! examprep-search: best-effort web search
//!
//! A [`SearchProvider`] turns a free-text query into text that can be dropped
//! straight into a tutoring prompt. Failures never escape [`SearchProvider::search`];
//! they come back as a `Search error: ...` string instead.

pub mod error;
pub mod provider;
pub mod tavily;
pub mod types;

pub use error::{Result, SearchError};
pub use provider::SearchProvider;
pub use tavily::TavilySearch;
pub use types::{
    MAX_RESULTS, MIN_RESULTS, NO_RESULTS_TEXT, SEARCH_ERROR_PREFIX, SearchConfig, SearchHit,
    SearchMode, SearchResult,
};
