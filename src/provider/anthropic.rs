//! Anthropic Messages API client.
//!
//! Converts the session transcript into the vendor's wire shape, performs
//! one `POST /v1/messages` per call, and decodes the content blocks of the
//! reply into an [`AgentReply`]. No caching, no retries: a failed call
//! fails the current request and nothing else.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, API_KEY_ENV};
use crate::error::AgentError;
use crate::types::{AgentClient, AgentReply, TokenUsage, ToolRequest, ToolSpec, Turn, TurnContent};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl AgentClient for AnthropicClient {
    async fn send(
        &self,
        transcript: &[Turn],
        system_prompt: &str,
        tools: &[ToolSpec],
    ) -> Result<AgentReply, AgentError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(system_prompt.to_string()),
            messages: to_wire_messages(transcript),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.to_vec())
            },
        };

        let url = format!("{}/v1/messages", self.api_url);
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            "calling agent endpoint"
        );

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 {
                return Err(AgentError::Transport(format!(
                    "authentication rejected (status 401); check {}",
                    API_KEY_ENV
                )));
            }
            return Err(AgentError::Transport(format!(
                "endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let decoded: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse(e.to_string()))?;

        debug!(
            input_tokens = decoded.usage.input_tokens,
            output_tokens = decoded.usage.output_tokens,
            stop_reason = decoded.stop_reason.as_deref().unwrap_or("none"),
            "agent endpoint replied"
        );

        decode_reply(decoded)
    }
}

// ─── Wire Types ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSpec>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: Vec<WireBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum WireBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<WireBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: TokenUsage,
}

// ─── Conversions ─────────────────────────────────────────────────

/// Map the transcript onto Messages-API messages.
///
/// The vendor contract wants strict user/assistant alternation, so the
/// tool-result turns of one batch coalesce into a single `user` message of
/// `tool_result` blocks. Turns that would produce an empty content list are
/// dropped: the endpoint rejects empty messages.
fn to_wire_messages(transcript: &[Turn]) -> Vec<WireMessage> {
    let mut messages: Vec<WireMessage> = Vec::new();

    for turn in transcript {
        match &turn.content {
            TurnContent::User { text } => {
                messages.push(WireMessage {
                    role: "user".to_string(),
                    content: vec![WireBlock::Text { text: text.clone() }],
                });
            }
            TurnContent::Assistant { text, requests } => {
                let mut blocks = Vec::new();
                if let Some(text) = text {
                    if !text.is_empty() {
                        blocks.push(WireBlock::Text { text: text.clone() });
                    }
                }
                for request in requests {
                    blocks.push(WireBlock::ToolUse {
                        id: request.id.clone(),
                        name: request.name.clone(),
                        input: serde_json::json!({
                            "command": request.command,
                            "description": request.description,
                        }),
                    });
                }
                if !blocks.is_empty() {
                    messages.push(WireMessage {
                        role: "assistant".to_string(),
                        content: blocks,
                    });
                }
            }
            TurnContent::ToolResult(outcome) => {
                let block = WireBlock::ToolResult {
                    tool_use_id: outcome.request_id.clone(),
                    content: outcome.payload(),
                };
                match messages.last_mut() {
                    Some(last)
                        if last.role == "user"
                            && last
                                .content
                                .iter()
                                .all(|b| matches!(b, WireBlock::ToolResult { .. })) =>
                    {
                        last.content.push(block);
                    }
                    _ => messages.push(WireMessage {
                        role: "user".to_string(),
                        content: vec![block],
                    }),
                }
            }
        }
    }

    messages
}

/// Decode response content blocks into the reply sum type.
///
/// Text blocks concatenate into commentary; `tool_use` blocks become
/// [`ToolRequest`]s in block order. A `tool_use` without a string `command`
/// is a malformed response; a missing `description` is tolerated.
fn decode_reply(response: MessagesResponse) -> Result<AgentReply, AgentError> {
    let mut text = String::new();
    let mut requests = Vec::new();

    for block in response.content {
        match block {
            WireBlock::Text { text: piece } => {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&piece);
            }
            WireBlock::ToolUse { id, name, input } => {
                let command = input
                    .get("command")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        AgentError::MalformedResponse(format!(
                            "tool_use {} carries no string 'command'",
                            id
                        ))
                    })?
                    .to_string();
                let description = input
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                requests.push(ToolRequest {
                    id,
                    name,
                    command,
                    description,
                });
            }
            WireBlock::ToolResult { tool_use_id, .. } => {
                return Err(AgentError::MalformedResponse(format!(
                    "unexpected tool_result block {} in model output",
                    tool_use_id
                )));
            }
        }
    }

    if requests.is_empty() {
        Ok(AgentReply::FinalAnswer { text })
    } else {
        Ok(AgentReply::ToolRequests {
            commentary: if text.trim().is_empty() {
                None
            } else {
                Some(text)
            },
            requests,
        })
    }
}
