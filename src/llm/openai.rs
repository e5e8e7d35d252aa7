//! OpenAI-compatible chat completion client (OpenAI, OpenRouter, local servers).

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{AssistantMessage, LlmClient, LlmError, Message, ToolCall, ToolSchema};

/// Client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

fn function_type() -> String {
    "function".to_string()
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        match message {
            Message::System { content } => Self::plain("system", content),
            Message::User { content } => Self::plain("user", content),
            Message::Assistant(msg) => Self {
                role: "assistant",
                content: Some(msg.content.clone()),
                tool_calls: msg.has_tool_calls().then(|| {
                    msg.tool_calls
                        .iter()
                        .map(|call| WireToolCall {
                            id: call.id.clone(),
                            kind: function_type(),
                            function: WireFunctionCall {
                                name: call.name.clone(),
                                arguments: Value::Object(call.arguments.clone()).to_string(),
                            },
                        })
                        .collect()
                }),
                tool_call_id: None,
                name: None,
            },
            Message::Tool(result) => Self {
                role: "tool",
                content: Some(result.content.clone()),
                tool_calls: None,
                tool_call_id: Some(result.tool_call_id.clone()),
                name: Some(result.name.clone()),
            },
        }
    }
}

impl WireMessage {
    fn plain(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

/// Decode a tool call's JSON-encoded arguments. Empty means no arguments.
fn parse_arguments(call: &WireToolCall) -> Result<Map<String, Value>, LlmError> {
    let raw = call.function.arguments.trim();
    if raw.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(LlmError::InvalidResponse(format!(
            "arguments for tool call '{}' are not a JSON object: {}",
            call.id, other
        ))),
        Err(e) => Err(LlmError::InvalidResponse(format!(
            "malformed arguments for tool call '{}': {}",
            call.id, e
        ))),
    }
}

/// Turn a raw response body into an assistant message.
fn parse_response(body: &str) -> Result<AssistantMessage, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("unexpected completion payload: {}", e)))?;

    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("completion has no choices".to_string()))?
        .message;

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .iter()
        .map(|call| {
            Ok(ToolCall {
                id: call.id.clone(),
                name: call.function.name.clone(),
                arguments: parse_arguments(call)?,
            })
        })
        .collect::<Result<Vec<_>, LlmError>>()?;

    // Tool results are joined back to their calls by id.
    let mut seen = HashSet::new();
    if let Some(dup) = tool_calls.iter().find(|call| !seen.insert(call.id.as_str())) {
        return Err(LlmError::InvalidResponse(format!(
            "duplicate tool call id '{}' in one completion",
            dup.id
        )));
    }

    Ok(AssistantMessage {
        content: message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<AssistantMessage, LlmError> {
        let body = ChatRequest {
            model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools: tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireFunction {
                        name: &tool.name,
                        description: &tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
        };

        debug!(
            model = %model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(format!("completion request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Unavailable(format!("failed to read completion body: {}", e)))?;

        if !status.is_success() {
            return Err(LlmError::Unavailable(format!(
                "completion endpoint returned {}: {}",
                status, text
            )));
        }

        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolResult;
    use serde_json::json;

    #[test]
    fn parses_terminal_reply() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi there!"}}]
        })
        .to_string();
        let msg = parse_response(&body).unwrap();
        assert_eq!(msg, AssistantMessage::text("Hi there!"));
    }

    #[test]
    fn parses_tool_calls_with_null_content() {
        let body = json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "duckduckgo_search", "arguments": "{\"query\":\"rust\"}"}
                }]
            }}]
        })
        .to_string();
        let msg = parse_response(&body).unwrap();
        assert_eq!(msg.content, "");
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].id, "call_1");
        assert_eq!(msg.tool_calls[0].arguments["query"], "rust");
    }

    #[test]
    fn empty_arguments_become_empty_object() {
        let body = json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "a", "function": {"name": "noop", "arguments": ""}}
            ]}}]
        })
        .to_string();
        let msg = parse_response(&body).unwrap();
        assert!(msg.tool_calls[0].arguments.is_empty());
    }

    #[test]
    fn malformed_arguments_are_invalid() {
        let body = json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "a", "function": {"name": "s", "arguments": "{not json"}}
            ]}}]
        })
        .to_string();
        assert!(matches!(parse_response(&body), Err(LlmError::InvalidResponse(_))));

        let body = json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "a", "function": {"name": "s", "arguments": "[1,2]"}}
            ]}}]
        })
        .to_string();
        assert!(matches!(parse_response(&body), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn duplicate_tool_call_ids_are_invalid() {
        let body = json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "1", "function": {"name": "search", "arguments": "{\"query\":\"a\"}"}},
                {"id": "1", "function": {"name": "search", "arguments": "{\"query\":\"b\"}"}}
            ]}}]
        })
        .to_string();
        match parse_response(&body) {
            Err(LlmError::InvalidResponse(msg)) => assert!(msg.contains("'1'"), "{}", msg),
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
    }

    #[test]
    fn missing_choices_is_invalid() {
        assert!(matches!(
            parse_response(r#"{"choices": []}"#),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_response("<html>bad gateway</html>"),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn assistant_tool_calls_serialize_as_json_strings() {
        let mut arguments = Map::new();
        arguments.insert("query".to_string(), json!("weather"));
        let msg = Message::Assistant(AssistantMessage {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "1".to_string(),
                name: "search".to_string(),
                arguments,
            }],
        });
        let wire = serde_json::to_value(WireMessage::from(&msg)).unwrap();
        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(
            wire["tool_calls"][0]["function"]["arguments"],
            "{\"query\":\"weather\"}"
        );
        assert!(wire.get("tool_call_id").is_none());
    }

    #[test]
    fn tool_results_carry_correlation_id() {
        let msg = Message::Tool(ToolResult {
            tool_call_id: "1".to_string(),
            name: "search".to_string(),
            content: "sunny".to_string(),
        });
        let wire = serde_json::to_value(WireMessage::from(&msg)).unwrap();
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "1");
        assert_eq!(wire["name"], "search");
    }
}
