//! Errand - Type Definitions
//!
//! Shared types for the transcript, the tool system, and the trait seams
//! between the turn loop, the remote agent endpoint, and the shell.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

// ─── Transcript ──────────────────────────────────────────────────

/// One immutable entry in the session transcript.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    /// Monotonic position in the transcript, assigned on append.
    pub index: u64,
    /// RFC 3339 creation time.
    pub at: String,
    pub content: TurnContent,
}

/// Role and payload of a turn, as one sum type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TurnContent {
    /// Free-text request typed by the user.
    User { text: String },
    /// Model output: commentary (or the final answer) plus any commands it
    /// wants run. A final answer is an assistant turn with no requests.
    Assistant {
        text: Option<String>,
        requests: Vec<ToolRequest>,
    },
    /// Captured outcome of one executed command.
    ToolResult(CommandOutcome),
}

impl Turn {
    pub fn role(&self) -> &'static str {
        match self.content {
            TurnContent::User { .. } => "user",
            TurnContent::Assistant { .. } => "assistant",
            TurnContent::ToolResult(_) => "tool-result",
        }
    }
}

// ─── Tool System ─────────────────────────────────────────────────

/// A structured ask from the model to run one shell command.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Vendor-assigned invocation id; echoed back on the matching result.
    pub id: String,
    /// Declared tool name the model invoked.
    pub name: String,
    /// The command text to hand to the shell.
    pub command: String,
    /// One-line description of the command, for the terminal echo.
    pub description: Option<String>,
}

/// Captured outcome of running one requested command. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Matches the originating [`ToolRequest::id`].
    pub request_id: String,
    /// Present on completion (including non-zero); absent only on timeout.
    pub exit_status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_status == Some(0)
    }

    /// JSON payload handed back to the model as tool-result content.
    pub fn payload(&self) -> String {
        serde_json::json!({
            "stdout": self.stdout,
            "stderr": self.stderr,
            "exit_status": self.exit_status,
            "timed_out": self.timed_out,
            "duration_ms": self.duration_ms,
            "success": self.success(),
        })
        .to_string()
    }
}

/// A tool made available to the model, in the vendor's declaration shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

// ─── Agent Reply ─────────────────────────────────────────────────

/// What one remote call came back with.
#[derive(Clone, Debug)]
pub enum AgentReply {
    /// The model is done with this request.
    FinalAnswer { text: String },
    /// The model wants commands run; commentary may accompany the requests
    /// and is surfaced to the user before execution starts.
    ToolRequests {
        commentary: Option<String>,
        requests: Vec<ToolRequest>,
    },
}

/// Token counts reported by the endpoint for one call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// ─── Seams ───────────────────────────────────────────────────────

/// Boundary to the remote agent endpoint: one network call per `send`.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn send(
        &self,
        transcript: &[Turn],
        system_prompt: &str,
        tools: &[ToolSpec],
    ) -> Result<AgentReply, AgentError>;
}

/// Boundary to the shell. Execution cannot fail at this level: timeouts,
/// non-zero exits, and launch failures all come back as outcome data.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, request: &ToolRequest) -> CommandOutcome;
}
