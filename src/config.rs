//! Startup configuration.
//!
//! Everything the session needs is resolved once at process start and
//! threaded through constructors; nothing reads ambient state afterwards.
//! The API key comes from `ANTHROPIC_API_KEY`; the remaining fields have
//! defaults that CLI flags may override. There is no configuration file.

use std::time::Duration;

use crate::error::AgentError;

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Wall-clock limit for one command execution.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Agent calls allowed per user request before the loop gives up.
pub const DEFAULT_MAX_ROUNDS: u32 = 50;

/// Per-stream cap on captured command output fed back to the model.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 100 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub command_timeout: Duration,
    pub max_rounds: u32,
    pub max_output_bytes: usize,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Fails with [`AgentError::Configuration`] when the API key variable
    /// is missing or blank.
    pub fn from_env() -> Result<Self, AgentError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AgentError::Configuration(format!(
                    "{} is not set; export your API key before starting",
                    API_KEY_ENV
                ))
            })?;
        Ok(Self::with_key(api_key))
    }

    /// Build a configuration with defaults around a known key.
    pub fn with_key(api_key: String) -> Self {
        Self {
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}
