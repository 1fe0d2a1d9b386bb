//! `search_web`: the Search Provider exposed as a model-callable tool

use async_trait::async_trait;
use examprep_search::SearchProvider;
use serde_json::json;
use std::sync::Arc;

use crate::tool::{Tool, ToolResult};

/// Name the model sees
pub const SEARCH_TOOL_NAME: &str = "search_web";

/// Wraps a [`SearchProvider`] so the model can decide when to search
pub struct SearchTool {
    provider: Arc<dyn SearchProvider>,
}

impl SearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Searches the web for the latest information on a topic."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, _tool_call_id: &str, arguments: serde_json::Value) -> ToolResult {
        let query = match arguments.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q.trim(),
            _ => return ToolResult::error("Missing 'query' argument"),
        };

        // Failures are already text; the model reads them like any result
        let result = self.provider.lookup(query).await;
        ToolResult {
            is_error: result.is_error(),
            ..ToolResult::text(result.render())
        }
    }
}
