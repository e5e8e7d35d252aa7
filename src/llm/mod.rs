//! LLM module - conversation messages and the completion client seam.
//!
//! The agent only talks to [`LlmClient`]; [`OpenAiClient`] is the production
//! implementation for any OpenAI-compatible `/chat/completions` endpoint.

mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use openai::OpenAiClient;

/// Errors raised by a completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The service could not be reached or refused the request.
    #[error("{0}")]
    Unavailable(String),

    /// The service answered with something that is not a chat completion.
    #[error("{0}")]
    InvalidResponse(String),
}

/// A model-issued request to call a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id, unique within one assistant message
    pub id: String,

    /// Registered tool name
    pub name: String,

    /// Decoded JSON arguments
    pub arguments: Map<String, Value>,
}

/// Output of one reasoning step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// Answer text, possibly empty when tools are requested
    pub content: String,

    /// Pending tool invocations; empty means the turn is finished
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantMessage {
    /// A final answer with no tool requests.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Result of a single tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the [`ToolCall`] this answers
    pub tool_call_id: String,

    /// Tool that was invoked
    pub name: String,

    /// Raw tool output, or error text when the tool failed
    pub content: String,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System { content: String },
    User { content: String },
    Assistant(AssistantMessage),
    Tool(ToolResult),
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// The assistant payload, if this is an assistant message.
    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Self::Assistant(msg) => Some(msg),
            _ => None,
        }
    }

    /// The tool result payload, if this is a tool message.
    pub fn as_tool_result(&self) -> Option<&ToolResult> {
        match self {
            Self::Tool(result) => Some(result),
            _ => None,
        }
    }
}

/// Name and argument schema of a callable tool, advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A chat completion capability.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the full history plus the advertised tools and return the
    /// assistant's reply.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<AssistantMessage, LlmError>;
}
