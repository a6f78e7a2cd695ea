//! Error taxonomy for the agent session.
//!
//! Only configuration, transport, and response-shape problems are errors
//! here. Command failures (non-zero exit, timeout) are conversational data
//! and travel through the transcript instead.

use thiserror::Error;

/// Errors that break the current request or, at startup, the whole process.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Required configuration was missing or unusable. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote endpoint could not be reached or refused the request.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote endpoint answered with a shape we cannot use.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The per-request guard against unbounded tool calling tripped.
    #[error("no final answer after {0} agent calls; giving up on this request")]
    RoundLimit(u32),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Transport(err.to_string())
    }
}
