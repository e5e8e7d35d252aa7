//! Agent module - the reasoning/acting loop.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Seed the conversation with the user's message
//! 2. Call the LLM with the history and the advertised tools
//! 3. If the reply requests tool calls, execute them and append the results
//! 4. Repeat until the reply has no tool calls or the round limit is reached

mod agent_loop;
mod error;
mod state;

pub use agent_loop::{Agent, AgentRun, LoopState};
pub use error::AgentError;
pub use state::Conversation;
