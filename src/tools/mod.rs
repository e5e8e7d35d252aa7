//! Tool registry and the tools the agent can call.
//!
//! The registry is built once at startup and shared read-only between
//! requests. New tools implement [`Tool`] and are registered; the agent loop
//! never needs to know about them.

mod web;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;

use crate::config::Config;
use crate::llm::{Message, ToolCall, ToolResult, ToolSchema};

pub use web::WebSearch;

/// A callable capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description sent to the model.
    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. Errors are reported back to the model as text.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Brief description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Immutable-after-startup mapping from tool name to implementation.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled tool set: web search.
    pub fn with_defaults(config: &Config) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(WebSearch::new(config.search.clone())?));
        Ok(registry)
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Replacing previously registered tool");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Schemas advertised to the model, ordered by tool name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Execute a single call, rendering any failure as the result text.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let content = match self.get(&call.name) {
            Some(tool) => match tool.execute(Value::Object(call.arguments.clone())).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(tool = %call.name, id = %call.id, "Tool failed: {:#}", e);
                    format!("Error: {:#}", e)
                }
            },
            None => {
                tracing::warn!(tool = %call.name, id = %call.id, "Model requested unknown tool");
                format!("Error: unknown tool '{}'", call.name)
            }
        };

        ToolResult {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content,
        }
    }

    /// Execute every call of one round concurrently. Results come back as
    /// tool messages in request order, one per call.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<Message> {
        join_all(calls.iter().map(|call| self.execute(call)))
            .await
            .into_iter()
            .map(Message::Tool)
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
