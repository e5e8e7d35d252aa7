//! Failures that cross the agent boundary.
//!
//! Tool failures are not here: they are folded into tool-result messages so the
//! model can react to them.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// A required setting is absent or invalid.
    #[error("Configuration error: {0}")]
    ConfigMissing(String),

    /// The completion service could not be reached or rejected the call.
    #[error("Language model unavailable: {0}")]
    ModelUnavailable(String),

    /// The completion payload could not be turned into an assistant message.
    #[error("Invalid language model response: {0}")]
    ModelResponseInvalid(String),

    /// The model kept requesting tools past the round limit.
    #[error("Max iterations ({0}) reached without a final answer")]
    MaxIterationsExceeded(usize),

    /// A round did not complete before its deadline.
    #[error("Round {round} timed out after {limit:?}")]
    Timeout { round: usize, limit: Duration },

    /// The caller abandoned the request.
    #[error("Request cancelled")]
    Cancelled,
}

impl From<LlmError> for AgentError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unavailable(msg) => Self::ModelUnavailable(msg),
            LlmError::InvalidResponse(msg) => Self::ModelResponseInvalid(msg),
        }
    }
}

impl From<ConfigError> for AgentError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigMissing(err.to_string())
    }
}
