//! # Search Agent
//!
//! A single-turn chat agent that decides, per message, whether to answer
//! directly or search the web first.
//!
//! This library provides:
//! - A reasoning/acting loop over an OpenAI-compatible chat completion API
//! - A tool registry with a DuckDuckGo web search tool
//! - An HTTP API (`POST /chat`) and static frontend serving
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a message via the API
//! 2. Call the LLM with the conversation and the available tools
//! 3. Execute any requested tool calls and append their results
//! 4. Repeat until the LLM answers without tool calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use search_agent::{agent::Agent, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(config)?;
//! let answer = agent.invoke("What's the weather in Paris?").await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
