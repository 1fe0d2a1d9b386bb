//! Google Generative AI (Gemini) API provider

use crate::{
    error::{Error, Result},
    providers::LlmProvider,
    stream::{MessageEvent, MessageEventStream},
    types::{AssistantMetadata, Content, Context, Message, Model, StopReason, Usage},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

/// Google Generative AI client
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleProvider {
    /// Create a new Google provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn build_request(&self, model: &Model, context: &Context) -> GeminiRequest {
        let contents = context.messages.iter().filter_map(convert_message).collect();

        let system_instruction = context.system_prompt.as_ref().map(|prompt| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text {
                text: prompt.clone(),
            }],
        });

        let tools = if context.tools.is_empty() {
            None
        } else {
            let function_declarations = context
                .tools
                .iter()
                .map(|t| GeminiFunctionDeclaration {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: Some(t.parameters.clone()),
                })
                .collect();
            Some(vec![GeminiTool {
                function_declarations,
            }])
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(model.max_tokens),
                temperature: None,
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    async fn stream(&self, model: &Model, context: &Context) -> Result<MessageEventStream> {
        let request = self.build_request(model, context);
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            model.base_url, model.id, self.api_key
        );

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (key, value) in &model.headers {
            if let (Ok(name), Ok(val)) = (key.parse::<HeaderName>(), value.parse::<HeaderValue>()) {
                headers.insert(name, val);
            }
        }

        tracing::debug!(
            model = %model.id,
            messages = request.contents.len(),
            tools = request.tools.as_ref().map_or(0, |t| t[0].function_declarations.len()),
            "Sending Gemini request"
        );

        let request_builder = self.client.post(&url).headers(headers).json(&request);
        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source, model.clone())))
    }
}

fn convert_message(msg: &Message) -> Option<GeminiContent> {
    match msg {
        Message::User { content, .. } => {
            let parts: Vec<GeminiPart> = content
                .iter()
                .filter_map(|c| {
                    c.as_text().map(|text| GeminiPart::Text {
                        text: text.to_string(),
                    })
                })
                .collect();

            if parts.is_empty() {
                None
            } else {
                Some(GeminiContent {
                    role: Some("user".to_string()),
                    parts,
                })
            }
        }
        Message::Assistant { content, .. } => {
            let parts: Vec<GeminiPart> = content
                .iter()
                .map(|c| match c {
                    Content::Text { text } => GeminiPart::Text { text: text.clone() },
                    // Gemini has no call IDs; calls pair with responses by name and order
                    Content::ToolCall {
                        name, arguments, ..
                    } => GeminiPart::FunctionCall {
                        function_call: GeminiFunctionCall {
                            name: name.clone(),
                            args: arguments.clone(),
                        },
                    },
                })
                .collect();

            if parts.is_empty() {
                None
            } else {
                Some(GeminiContent {
                    role: Some("model".to_string()),
                    parts,
                })
            }
        }
        Message::ToolResult {
            tool_name, content, ..
        } => {
            let response_text = content
                .iter()
                .filter_map(|c| c.as_text())
                .collect::<Vec<_>>()
                .join("");

            Some(GeminiContent {
                role: Some("function".to_string()),
                parts: vec![GeminiPart::FunctionResponse {
                    function_response: GeminiFunctionResponse {
                        name: tool_name.clone(),
                        response: serde_json::json!({ "result": response_text }),
                    },
                }],
            })
        }
    }
}

/// What one SSE chunk adds to the reply
#[derive(Debug, Default)]
struct ChunkUpdate {
    text: Vec<String>,
    calls: Vec<(String, serde_json::Value)>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
}

/// Decode one SSE data payload.
///
/// Errors come back as `(message, status)`. Gemini can report failures such
/// as quota exhaustion inside an otherwise successful stream.
fn read_chunk(data: &str) -> std::result::Result<ChunkUpdate, (String, Option<u16>)> {
    let response = serde_json::from_str::<GeminiStreamResponse>(data)
        .map_err(|e| (format!("Failed to parse chunk: {}", e), None))?;

    if let Some(error) = response.error {
        return Err((error.describe(), error.http_status()));
    }

    let mut update = ChunkUpdate::default();
    for candidate in response.candidates {
        if let Some(content) = candidate.content {
            for part in content.parts {
                match part {
                    GeminiResponsePart::Text { thought: true, .. } => {}
                    GeminiResponsePart::Text { text, .. } => update.text.push(text),
                    GeminiResponsePart::FunctionCall { function_call } => {
                        update.calls.push((function_call.name, function_call.args));
                    }
                    GeminiResponsePart::Other(_) => {}
                }
            }
        }
        if candidate.finish_reason.is_some() {
            update.finish_reason = candidate.finish_reason;
        }
    }

    update.usage = response.usage_metadata.map(|meta| Usage {
        input: meta.prompt_token_count.unwrap_or(0),
        output: meta.candidates_token_count.unwrap_or(0),
    });
    Ok(update)
}

/// Turn a Gemini error body into a readable message, keeping the status string
/// (e.g. `RESOURCE_EXHAUSTED`) so callers can still classify it.
fn error_message_from_body(body: &str) -> String {
    match serde_json::from_str::<GeminiErrorResponse>(body) {
        Ok(response) => response.error.describe(),
        Err(_) if body.trim().is_empty() => "empty error response".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn map_finish_reason(reason: Option<&str>, has_tool_calls: bool) -> StopReason {
    if has_tool_calls {
        return StopReason::ToolUse;
    }
    match reason {
        Some("MAX_TOKENS") => StopReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
            StopReason::Safety
        }
        _ => StopReason::Stop,
    }
}

fn create_stream(
    mut event_source: EventSource,
    model: Model,
) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut accumulated_text = String::new();
        let mut tool_calls: Vec<(String, String, serde_json::Value)> = Vec::new();
        let mut finish_reason: Option<String> = None;
        let mut usage = Usage::default();

        yield MessageEvent::Start {
            message: Message::Assistant {
                content: vec![],
                metadata: AssistantMetadata {
                    model: Some(model.id.clone()),
                    ..Default::default()
                },
            },
        };

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.is_empty() || msg.data == "[DONE]" {
                        continue;
                    }

                    let chunk = match read_chunk(&msg.data) {
                        Ok(chunk) => chunk,
                        Err((message, status)) => {
                            event_source.close();
                            yield MessageEvent::Error { message, status };
                            return;
                        }
                    };

                    for text in chunk.text {
                        accumulated_text.push_str(&text);
                        yield MessageEvent::TextDelta { delta: text };
                    }
                    for (name, arguments) in chunk.calls {
                        let id = format!("call_{}", tool_calls.len());
                        yield MessageEvent::ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            arguments: arguments.clone(),
                        };
                        tool_calls.push((id, name, arguments));
                    }
                    if chunk.finish_reason.is_some() {
                        finish_reason = chunk.finish_reason;
                    }
                    if let Some(chunk_usage) = chunk.usage {
                        usage = chunk_usage;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    event_source.close();
                    let body = response.text().await.unwrap_or_default();
                    yield MessageEvent::Error {
                        message: error_message_from_body(&body),
                        status: Some(status.as_u16()),
                    };
                    return;
                }
                Err(e) => {
                    event_source.close();
                    yield MessageEvent::Error {
                        message: format!("SSE error: {}", e),
                        status: None,
                    };
                    return;
                }
            }
        }
        event_source.close();

        let stop_reason = map_finish_reason(finish_reason.as_deref(), !tool_calls.is_empty());

        let mut content = Vec::new();
        if !accumulated_text.is_empty() {
            content.push(Content::Text { text: accumulated_text });
        }
        for (id, name, arguments) in tool_calls {
            content.push(Content::ToolCall { id, name, arguments });
        }

        yield MessageEvent::Done {
            message: Message::Assistant {
                content,
                metadata: AssistantMetadata {
                    model: Some(model.id.clone()),
                    usage,
                    stop_reason: Some(stop_reason),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                },
            },
            stop_reason,
            usage,
        };
    }
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
}

#[derive(Debug, Serialize)]
struct GeminiFunctionCall {
    name: String,
    args: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiResponsePart {
    Text {
        text: String,
        #[serde(default)]
        thought: bool,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiResponseFunctionCall,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct GeminiResponseFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiError {
    fn describe(&self) -> String {
        match &self.status {
            Some(status) => format!("{}: {}", status, self.message),
            None => self.message.clone(),
        }
    }

    fn http_status(&self) -> Option<u16> {
        match self.status.as_deref() {
            Some("RESOURCE_EXHAUSTED") => Some(429),
            _ => self.code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::model_or_default;
    use crate::types::Tool;

    fn search_tool() -> Tool {
        Tool::new(
            "search_web",
            "Searches the web for the latest information on a topic.",
            serde_json::json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        )
    }

    #[test]
    fn test_request_roles_and_function_parts() {
        let provider = GoogleProvider::new("test-key");
        let model = model_or_default("gemini-2.0-flash");
        let context = Context {
            system_prompt: None,
            messages: vec![
                Message::user("Explain deadlocks"),
                Message::Assistant {
                    content: vec![Content::tool_call(
                        "call_0",
                        "search_web",
                        serde_json::json!({"query": "deadlock"}),
                    )],
                    metadata: AssistantMetadata::default(),
                },
                Message::tool_result(
                    "call_0",
                    "search_web",
                    vec![Content::text("Title: Deadlock\nSnippet: circular wait")],
                    false,
                ),
            ],
            tools: vec![search_tool()],
        };

        let json = serde_json::to_value(provider.build_request(&model, &context)).unwrap();
        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Explain deadlocks");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "search_web");
        assert_eq!(contents[2]["role"], "function");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["result"],
            "Title: Deadlock\nSnippet: circular wait"
        );
        assert_eq!(
            json["tools"][0]["functionDeclarations"][0]["name"],
            "search_web"
        );
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_request_without_tools_omits_declarations() {
        let provider = GoogleProvider::new("test-key");
        let model = model_or_default("gemini-2.0-flash");
        let context = Context {
            system_prompt: Some("Be a tutor.".into()),
            messages: vec![Message::user("Paging")],
            tools: vec![],
        };
        let json = serde_json::to_value(provider.build_request(&model, &context)).unwrap();
        assert!(json.get("tools").is_none());
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be a tutor.");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_parse_stream_chunk_with_unknown_part() {
        let data = r#"{
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "A deadlock is" },
                    { "thought": true, "thoughtSignature": "abc" },
                    { "functionCall": { "name": "search_web", "args": { "query": "deadlock" } } }
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 40, "candidatesTokenCount": 12 }
        }"#;
        let response: GeminiStreamResponse = serde_json::from_str(data).unwrap();
        let parts = &response.candidates[0].content.as_ref().unwrap().parts;
        assert!(matches!(parts[0], GeminiResponsePart::Text { .. }));
        assert!(matches!(parts[1], GeminiResponsePart::Other(_)));
        assert!(matches!(parts[2], GeminiResponsePart::FunctionCall { .. }));
        assert_eq!(
            response.usage_metadata.unwrap().prompt_token_count,
            Some(40)
        );
    }

    #[test]
    fn test_thought_parts_are_not_reply_text() {
        let data = r#"{"candidates":[{"content":{"parts":[
            {"text":"Let me think about deadlocks...","thought":true},
            {"text":"A deadlock is a cycle of waits."}
        ]}}]}"#;
        let chunk = read_chunk(data).unwrap();
        assert_eq!(chunk.text, vec!["A deadlock is a cycle of waits.".to_string()]);
    }

    #[test]
    fn test_in_stream_quota_error_is_429() {
        let data = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let (message, status) = read_chunk(data).unwrap_err();
        assert_eq!(message, "RESOURCE_EXHAUSTED: Quota exceeded");
        assert_eq!(status, Some(429));

        let err = crate::Error::from_status(status.unwrap(), message);
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_in_stream_error_without_code() {
        let data = r#"{"error":{"message":"backend unavailable","status":"UNAVAILABLE"}}"#;
        assert_eq!(
            read_chunk(data).unwrap_err(),
            ("UNAVAILABLE: backend unavailable".to_string(), None)
        );
    }

    #[test]
    fn test_read_chunk_collects_text_calls_and_usage() {
        let data = r#"{
            "candidates": [{
                "content": { "parts": [
                    { "text": "Deadlock" },
                    { "functionCall": { "name": "search_web", "args": { "query": "deadlock" } } }
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 3 }
        }"#;
        let chunk = read_chunk(data).unwrap();
        assert_eq!(chunk.text, vec!["Deadlock".to_string()]);
        assert_eq!(chunk.calls[0].0, "search_web");
        assert_eq!(chunk.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(chunk.usage, Some(Usage { input: 7, output: 3 }));
    }

    #[test]
    fn test_error_body_keeps_status() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            error_message_from_body(body),
            "RESOURCE_EXHAUSTED: Quota exceeded"
        );
        assert_eq!(error_message_from_body("  "), "empty error response");
        assert_eq!(error_message_from_body("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(Some("STOP"), false), StopReason::Stop);
        assert_eq!(map_finish_reason(Some("STOP"), true), StopReason::ToolUse);
        assert_eq!(map_finish_reason(Some("MAX_TOKENS"), false), StopReason::Length);
        assert_eq!(map_finish_reason(Some("SAFETY"), false), StopReason::Safety);
        assert_eq!(map_finish_reason(None, false), StopReason::Stop);
    }
}
