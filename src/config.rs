//! Configuration management for the search agent.
//!
//! Configuration is read from environment variables:
//! - `OPENAI_API_KEY` - Required. Credential for the OpenAI-compatible endpoint.
//! - `OPENAI_API_BASE` - Optional. Endpoint base URL. Defaults to `https://openrouter.ai/api/v1`.
//! - `MODEL` - Optional. Model identifier. Defaults to `openai/gpt-3.5-turbo`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `MAX_ITERATIONS` - Optional. Maximum reasoning rounds per request. Defaults to `10`.
//! - `ROUND_TIMEOUT_SECS` - Optional. Deadline for one round, `0` disables. Defaults to `120`.
//! - `SEARCH_URL` - Optional. DuckDuckGo HTML endpoint. Defaults to `https://html.duckduckgo.com/html/`.
//! - `SEARCH_MAX_RESULTS` - Optional. Results returned by the search tool. Defaults to `5`.
//! - `FRONTEND_DIR` - Optional. Directory with the static frontend, relative to the working
//!   directory. Defaults to `frontend`, the chat page shipped at the crate root.
//! - `SYSTEM_PROMPT` - Optional. Prepended as a system message when set.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Web search tool configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// DuckDuckGo HTML endpoint the query is appended to
    pub url: String,

    /// Maximum number of results rendered into the tool output
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SEARCH_URL.to_string(),
            max_results: 5,
        }
    }
}

/// Agent and server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the completion endpoint
    pub api_key: String,

    /// Base URL of the OpenAI-compatible completion endpoint
    pub api_base: String,

    /// Model identifier sent with every completion request
    pub model: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum reasoning rounds before the loop gives up
    pub max_iterations: usize,

    /// Deadline for a single round (reasoning plus tool execution)
    pub round_timeout: Option<Duration>,

    /// Optional system message placed ahead of the user message
    pub system_prompt: Option<String>,

    /// Static frontend directory
    pub frontend_dir: PathBuf,

    /// Search tool configuration
    pub search: SearchConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set (or is
    /// blank), and `ConfigError::InvalidValue` for unparsable numeric values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` uses the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("OPENAI_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let api_base = non_empty("OPENAI_API_BASE")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let model = non_empty("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let host = non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = parse_or("PORT", non_empty("PORT"), 8000u16)?;

        let max_iterations = parse_or("MAX_ITERATIONS", non_empty("MAX_ITERATIONS"), 10usize)?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let round_timeout_secs =
            parse_or("ROUND_TIMEOUT_SECS", non_empty("ROUND_TIMEOUT_SECS"), 120u64)?;
        let round_timeout = (round_timeout_secs > 0).then(|| Duration::from_secs(round_timeout_secs));

        let search = SearchConfig {
            url: non_empty("SEARCH_URL").unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            max_results: parse_or("SEARCH_MAX_RESULTS", non_empty("SEARCH_MAX_RESULTS"), 5usize)?,
        };

        let frontend_dir = non_empty("FRONTEND_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("frontend"));

        Ok(Self {
            api_key,
            api_base,
            model,
            host,
            port,
            max_iterations,
            round_timeout,
            system_prompt: non_empty("SYSTEM_PROMPT"),
            frontend_dir,
            search,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        Self {
            api_key,
            api_base,
            model,
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_iterations: 10,
            round_timeout: Some(Duration::from_secs(120)),
            system_prompt: None,
            frontend_dir: PathBuf::from("frontend"),
            search: SearchConfig::default(),
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "OPENAI_API_KEY"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn defaults_applied() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.round_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.search.max_results, 5);
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn overrides_and_trailing_slash() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_API_BASE", "http://localhost:1234/v1/"),
            ("MODEL", "local/model"),
            ("MAX_ITERATIONS", "3"),
            ("ROUND_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.api_base, "http://localhost:1234/v1");
        assert_eq!(config.model, "local/model");
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.round_timeout, None);
    }

    #[test]
    fn invalid_numbers_rejected() {
        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "k"), ("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "PORT"));

        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "k"), ("MAX_ITERATIONS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "MAX_ITERATIONS"));
    }
}
