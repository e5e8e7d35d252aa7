//! Per-request conversation history.

use crate::llm::{AssistantMessage, Message, ToolCall};

/// Append-only, chronologically ordered message history owned by one request.
/// Always holds at least the seeding user message.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation from the user's message.
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(user_text)],
        }
    }

    /// Start a conversation with a system message ahead of the user's.
    pub fn with_system(system: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(user_text)],
        }
    }

    /// Append messages in order. Existing entries are never touched.
    pub fn append<I>(&mut self, messages: I)
    where
        I: IntoIterator<Item = Message>,
    {
        self.messages.extend(messages);
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The latest message if it is an assistant reply.
    pub fn last_assistant(&self) -> Option<&AssistantMessage> {
        self.last().and_then(Message::as_assistant)
    }

    /// Tool calls the latest assistant message is waiting on.
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        self.last_assistant()
            .map(|msg| msg.tool_calls.as_slice())
            .unwrap_or(&[])
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
