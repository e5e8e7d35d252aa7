//! Core agent loop implementation.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::llm::{AssistantMessage, LlmClient, Message, OpenAiClient, ToolSchema};
use crate::tools::ToolRegistry;

use super::error::AgentError;
use super::state::Conversation;

/// Where the loop is between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting on the model.
    Reasoning,
    /// The latest assistant message has tool calls to run.
    ActingOnTools,
    /// The latest assistant message is the answer.
    Done,
}

impl LoopState {
    /// State to enter after the model replied with `reply`.
    pub fn after_reasoning(reply: &AssistantMessage) -> Self {
        if reply.has_tool_calls() {
            Self::ActingOnTools
        } else {
            Self::Done
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Text of the final assistant message
    pub answer: String,

    /// Full history, user message first
    pub messages: Vec<Message>,

    /// Reasoning steps taken
    pub rounds: usize,
}

/// The search-capable chat agent.
pub struct Agent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
}

impl Agent {
    /// Create an agent talking to the configured OpenAI-compatible endpoint,
    /// with the bundled tool set.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::ConfigMissing` if the credential or endpoint is blank.
    pub fn new(config: Config) -> Result<Self, AgentError> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::ConfigMissing("API key is empty".to_string()));
        }
        if config.api_base.trim().is_empty() {
            return Err(AgentError::ConfigMissing("API base URL is empty".to_string()));
        }
        let llm = Arc::new(OpenAiClient::new(
            config.api_key.clone(),
            config.api_base.clone(),
        ));
        let tools = ToolRegistry::with_defaults(&config)
            .map_err(|e| AgentError::ConfigMissing(format!("tool setup failed: {:#}", e)))?;
        Ok(Self {
            config,
            llm,
            tools: Arc::new(tools),
        })
    }

    /// Assemble an agent from explicit parts.
    pub fn with_parts(config: Config, llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>) -> Self {
        Self { config, llm, tools }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer one user message, searching first if the model asks to.
    pub async fn invoke(&self, user_text: &str) -> Result<String, AgentError> {
        self.invoke_with_cancel(user_text, &CancellationToken::new())
            .await
    }

    /// Like [`Agent::invoke`], aborting in-flight work once `cancel` fires.
    pub async fn invoke_with_cancel(
        &self,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        self.run(user_text, cancel).await.map(|run| run.answer)
    }

    /// Run the reasoning/acting loop to completion.
    pub async fn run(
        &self,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<AgentRun, AgentError> {
        let mut conversation = match &self.config.system_prompt {
            Some(system) => Conversation::with_system(system.clone(), user_text),
            None => Conversation::new(user_text),
        };
        let schemas = self.tools.schemas();
        let max_rounds = self.config.max_iterations;

        let mut state = LoopState::Reasoning;
        let mut rounds = 0;
        let mut deadline = None;

        loop {
            match state {
                LoopState::Reasoning => {
                    if rounds == max_rounds {
                        return Err(AgentError::MaxIterationsExceeded(max_rounds));
                    }
                    rounds += 1;
                    deadline = self.config.round_timeout.map(|limit| Instant::now() + limit);
                    debug!("Agent round {}", rounds);

                    let reply = self
                        .guarded(rounds, deadline, cancel, self.reason(&conversation, &schemas))
                        .await??;
                    state = LoopState::after_reasoning(&reply);
                    conversation.push(Message::Assistant(reply));
                }
                LoopState::ActingOnTools => {
                    let calls = conversation.pending_tool_calls();
                    for call in calls {
                        info!(
                            tool = %call.name,
                            id = %call.id,
                            "Calling tool with args: {}",
                            serde_json::Value::Object(call.arguments.clone())
                        );
                    }

                    let results = self
                        .guarded(rounds, deadline, cancel, self.tools.execute_all(calls))
                        .await?;
                    conversation.append(results);
                    state = LoopState::Reasoning;
                }
                LoopState::Done => break,
            }
        }

        let answer = conversation
            .last_assistant()
            .map(|msg| msg.content.clone())
            .unwrap_or_default();
        info!(rounds, "Agent finished");

        Ok(AgentRun {
            answer,
            messages: conversation.into_messages(),
            rounds,
        })
    }

    /// One reasoning step: full history plus tool schemas to the model.
    ///
    /// A reply whose tool calls share an id is rejected, since results are
    /// matched back to calls by id.
    pub async fn reason(
        &self,
        conversation: &Conversation,
        tools: &[ToolSchema],
    ) -> Result<AssistantMessage, AgentError> {
        let reply = self
            .llm
            .chat_completion(&self.config.model, conversation.messages(), tools)
            .await?;
        debug!(
            history = conversation.messages().len(),
            tool_calls = reply.tool_calls.len(),
            "Model replied ({} chars)",
            reply.content.len()
        );

        let mut seen = HashSet::new();
        if let Some(dup) = reply.tool_calls.iter().find(|call| !seen.insert(call.id.as_str())) {
            return Err(AgentError::ModelResponseInvalid(format!(
                "duplicate tool call id '{}'",
                dup.id
            )));
        }
        Ok(reply)
    }

    /// Await `fut` under the round deadline and the caller's cancellation.
    async fn guarded<F, T>(
        &self,
        round: usize,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<T, AgentError>
    where
        F: Future<Output = T>,
    {
        let limited = async move {
            match deadline {
                Some(at) => tokio::time::timeout_at(at, fut).await.map_err(|_| {
                    AgentError::Timeout {
                        round,
                        limit: self.config.round_timeout.unwrap_or_default(),
                    }
                }),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            result = limited => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use serde_json::Map;

    #[test]
    fn done_iff_no_tool_calls() {
        assert_eq!(
            LoopState::after_reasoning(&AssistantMessage::text("hi")),
            LoopState::Done
        );

        let reply = AssistantMessage {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "1".to_string(),
                name: "search".to_string(),
                arguments: Map::new(),
            }],
        };
        assert_eq!(LoopState::after_reasoning(&reply), LoopState::ActingOnTools);
    }

    #[test]
    fn blank_credential_fails_fast() {
        let config = Config::new(String::new(), "http://localhost".to_string(), "m".to_string());
        assert!(matches!(Agent::new(config), Err(AgentError::ConfigMissing(_))));
    }

    #[test]
    fn new_agent_registers_search() {
        let config = Config::new("k".to_string(), "http://localhost".to_string(), "m".to_string());
        let agent = Agent::new(config).unwrap();
        assert!(agent.tools().get("duckduckgo_search").is_some());
    }
}
