//! Shell Tool
//!
//! Declares the command-execution tool advertised to the model and runs
//! requested commands as subprocesses of the local shell. Command failures
//! and timeouts are data in the outcome, never errors: the model sees them
//! in the tool result and decides what to do next.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use crate::config::Config;
use crate::types::{CommandOutcome, CommandRunner, ToolRequest, ToolSpec};

/// Name of the command-execution tool as advertised to the model.
pub const RUN_COMMAND: &str = "run_command";

/// Create the tool definitions advertised on every agent call.
pub fn builtin_tools() -> Vec<ToolSpec> {
    vec![ToolSpec {
        name: RUN_COMMAND.to_string(),
        description: "Execute a shell command on the user's machine. Returns stdout, stderr, \
                      the exit status, and whether the command timed out."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "description": {
                    "type": "string",
                    "description": "One short line telling the user what this command does"
                }
            },
            "required": ["command", "description"]
        }),
    }]
}

// --- Local Shell Runner ---

/// Runs requested commands under the local shell with a hard deadline.
pub struct ShellRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl ShellRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            timeout: config.command_timeout,
            max_output_bytes: config.max_output_bytes,
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, request: &ToolRequest) -> CommandOutcome {
        tracing::debug!(command = %request.command, "executing command");
        let start = Instant::now();

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(&request.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the pending output future at the deadline must kill the child.
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => CommandOutcome {
                request_id: request.id.clone(),
                // A code of None means the process died to a signal.
                exit_status: Some(output.status.code().unwrap_or(-1)),
                stdout: truncate_to_byte_limit(
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    self.max_output_bytes,
                ),
                stderr: truncate_to_byte_limit(
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                    self.max_output_bytes,
                ),
                duration_ms: start.elapsed().as_millis() as u64,
                timed_out: false,
            },
            Ok(Err(err)) => CommandOutcome {
                request_id: request.id.clone(),
                exit_status: Some(-1),
                stdout: String::new(),
                stderr: format!("Failed to launch shell: {}", err),
                duration_ms: start.elapsed().as_millis() as u64,
                timed_out: false,
            },
            Err(_) => CommandOutcome {
                request_id: request.id.clone(),
                exit_status: None,
                stdout: String::new(),
                stderr: format!(
                    "Command timed out after {} seconds",
                    self.timeout.as_secs()
                ),
                duration_ms: start.elapsed().as_millis() as u64,
                timed_out: true,
            },
        }
    }
}

/// Cap a captured stream at `max_bytes`, cutting on a char boundary.
fn truncate_to_byte_limit(content: String, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content;
    }

    let mut cutoff = max_bytes.min(content.len());
    while cutoff > 0 && !content.is_char_boundary(cutoff) {
        cutoff -= 1;
    }

    let mut truncated = content[..cutoff].to_string();
    truncated.push_str("\n[truncated]");
    truncated
}
