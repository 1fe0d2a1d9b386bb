//! The search provider trait

use async_trait::async_trait;

use crate::{Result, SearchResult};

/// A web search backend.
///
/// Implementors only write [`SearchProvider::try_search`]; the provided
/// [`SearchProvider::search`] folds every failure into text so callers never
/// see an error.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Run one query. A single best-effort call: no retry, no backoff.
    async fn try_search(&self, query: &str) -> Result<SearchResult>;

    /// Run one query, converting failures into [`SearchResult::Error`]
    async fn lookup(&self, query: &str) -> SearchResult {
        match self.try_search(query).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(provider = self.name(), "Search failed: {}", e);
                SearchResult::Error(e.to_string())
            }
        }
    }

    /// Run one query and render the outcome as prompt-ready text
    async fn search(&self, query: &str) -> String {
        self.lookup(query).await.render()
    }
}
