//! Tool trait, results, and the registry handed to the model runtime

use async_trait::async_trait;
use examprep_ai::Content;
use std::sync::Arc;

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Content returned to the model
    pub content: Vec<Content>,
    /// Whether the execution resulted in an error
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }

    /// Get the text content as a single string
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A function the model may call while producing its reply
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in API calls)
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool. Runs to completion before the model is called again.
    async fn execute(&self, tool_call_id: &str, arguments: serde_json::Value) -> ToolResult;
}

/// Type alias for a shared tool
pub type BoxedTool = Arc<dyn Tool>;

/// Convert a Tool to an API declaration
pub fn to_api_tool(tool: &dyn Tool) -> examprep_ai::Tool {
    examprep_ai::Tool {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: tool.parameters_schema(),
    }
}

/// The set of tools visible to the model
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, tool: BoxedTool) -> Self {
        self.register(tool);
        self
    }

    /// Add a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: BoxedTool) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Declarations for the model request
    pub fn api_tools(&self) -> Vec<examprep_ai::Tool> {
        self.tools.iter().map(|t| to_api_tool(t.as_ref())).collect()
    }

    /// Run the named tool with the model's arguments as given.
    ///
    /// An unknown tool comes back as an error result for the model to see; it
    /// never fails the turn. Each tool checks its own arguments.
    pub async fn execute(
        &self,
        tool_call_id: &str,
        name: &str,
        arguments: serde_json::Value,
    ) -> ToolResult {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.execute(tool_call_id, arguments).await,
            None => ToolResult::error(format!("Tool not found: {}", name)),
        }
    }
}
