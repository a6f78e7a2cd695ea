//! Agent Call Adapter
//!
//! Boundary to the hosted agent endpoint. The turn loop only sees the
//! [`crate::types::AgentClient`] seam; the production implementation here
//! speaks the Anthropic Messages API.

pub mod anthropic;

pub use anthropic::AnthropicClient;
