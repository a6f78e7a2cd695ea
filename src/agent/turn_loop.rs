//! The Turn Loop
//!
//! The request/response/execute cycle driving one user request: call the
//! agent with the full transcript, surface its text, run the commands it
//! asks for, feed the outcomes back, and repeat until it settles on a
//! final answer. Commands run one at a time, in the order requested.

use std::io::IsTerminal;

use colored::Colorize;

use crate::config::Config;
use crate::error::AgentError;
use crate::transcript::Session;
use crate::types::{AgentClient, AgentReply, CommandOutcome, CommandRunner, ToolRequest, TurnContent};

use super::system_prompt::build_system_prompt;
use super::tools::builtin_tools;

/// Drives the conversation for the lifetime of one session.
pub struct TurnLoop {
    client: Box<dyn AgentClient>,
    runner: Box<dyn CommandRunner>,
    system_prompt: String,
    tools: Vec<crate::types::ToolSpec>,
    max_rounds: u32,
}

impl TurnLoop {
    pub fn new(
        client: Box<dyn AgentClient>,
        runner: Box<dyn CommandRunner>,
        config: &Config,
    ) -> Self {
        Self {
            client,
            runner,
            system_prompt: build_system_prompt(),
            tools: builtin_tools(),
            max_rounds: config.max_rounds,
        }
    }

    /// Handle one user request to completion.
    ///
    /// Appends the request to the transcript, then alternates agent calls
    /// and command execution until the agent returns a final answer with
    /// no further requests. Every command outcome, including failures and
    /// timeouts, goes back into the transcript as data; only transport and
    /// response-shape problems (and the round cap) surface as errors, and
    /// none of them invalidate the session.
    pub async fn handle_request(
        &self,
        session: &mut Session,
        input: String,
    ) -> Result<String, AgentError> {
        session.append(TurnContent::User { text: input });

        let mut rounds: u32 = 0;
        loop {
            if rounds >= self.max_rounds {
                return Err(AgentError::RoundLimit(self.max_rounds));
            }
            rounds += 1;

            // --- Agent Call ---
            if std::io::stdin().is_terminal() {
                println!("{}", "thinking...".dimmed());
            }
            tracing::debug!(round = rounds, turns = session.len(), "calling agent");

            let reply = self
                .client
                .send(session.snapshot(), &self.system_prompt, &self.tools)
                .await?;

            match reply {
                AgentReply::FinalAnswer { text } => {
                    if !text.trim().is_empty() {
                        echo_agent(&text);
                    }
                    session.append(TurnContent::Assistant {
                        text: Some(text.clone()),
                        requests: Vec::new(),
                    });
                    return Ok(text);
                }
                AgentReply::ToolRequests {
                    commentary,
                    requests,
                } => {
                    if let Some(ref text) = commentary {
                        echo_agent(text);
                    }
                    session.append(TurnContent::Assistant {
                        text: commentary,
                        requests: requests.clone(),
                    });

                    // --- Execute the Batch ---
                    // Every result from one reply is gathered before the
                    // next call; the model never sees a partial batch.
                    for request in &requests {
                        echo_run(request);
                        let outcome = self.runner.run(request).await;
                        echo_outcome(&outcome);
                        tracing::debug!(
                            request_id = %outcome.request_id,
                            exit_status = ?outcome.exit_status,
                            timed_out = outcome.timed_out,
                            duration_ms = outcome.duration_ms,
                            "command finished"
                        );
                        session.append(TurnContent::ToolResult(outcome));
                    }
                }
            }
        }
    }
}

// --- Terminal Echo ---

fn echo_agent(text: &str) {
    println!("{} {}", "[agent]".blue().bold(), text);
}

fn echo_run(request: &ToolRequest) {
    let what = request.description.as_deref().unwrap_or("no description given");
    println!(
        "{} {} {}",
        "[run]".cyan().bold(),
        request.command,
        format!("({})", what).dimmed()
    );
}

fn echo_outcome(outcome: &CommandOutcome) {
    if outcome.timed_out {
        println!(
            "{} after {}ms",
            "[timeout]".yellow().bold(),
            outcome.duration_ms
        );
    } else if outcome.success() {
        println!("{} {}ms", "[ok]".green().bold(), outcome.duration_ms);
    } else {
        let status = outcome
            .exit_status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "{} exit {} ({}ms)",
            "[fail]".red().bold(),
            status,
            outcome.duration_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::types::{ToolSpec, Turn};

    /// Returns scripted replies in order; falls back to a final answer once
    /// the script runs out. Records the roles of every snapshot it is sent.
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<AgentReply, AgentError>>>,
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    #[async_trait]
    impl AgentClient for ScriptedClient {
        async fn send(
            &self,
            transcript: &[Turn],
            _system_prompt: &str,
            _tools: &[ToolSpec],
        ) -> Result<AgentReply, AgentError> {
            let roles = transcript.iter().map(|t| t.role().to_string()).collect();
            self.calls.lock().unwrap().push(roles);
            self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
                Ok(AgentReply::FinalAnswer {
                    text: "done".to_string(),
                })
            })
        }
    }

    /// Records every command it is asked to run and reports clean exits.
    struct RecordingRunner {
        executed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, request: &ToolRequest) -> CommandOutcome {
            self.executed.lock().unwrap().push(request.command.clone());
            CommandOutcome {
                request_id: request.id.clone(),
                exit_status: Some(0),
                stdout: format!("ran {}", request.command),
                stderr: String::new(),
                duration_ms: 1,
                timed_out: false,
            }
        }
    }

    /// Reports every command as timed out, with no exit status.
    struct TimeoutRunner;

    #[async_trait]
    impl CommandRunner for TimeoutRunner {
        async fn run(&self, request: &ToolRequest) -> CommandOutcome {
            CommandOutcome {
                request_id: request.id.clone(),
                exit_status: None,
                stdout: String::new(),
                stderr: "Command timed out after 1 seconds".to_string(),
                duration_ms: 1000,
                timed_out: true,
            }
        }
    }

    fn tool_request(id: &str, command: &str) -> ToolRequest {
        ToolRequest {
            id: id.to_string(),
            name: "run_command".to_string(),
            command: command.to_string(),
            description: Some(format!("runs {}", command)),
        }
    }

    struct Harness {
        turn_loop: TurnLoop,
        calls: Arc<Mutex<Vec<Vec<String>>>>,
        executed: Arc<Mutex<Vec<String>>>,
    }

    fn harness(replies: Vec<Result<AgentReply, AgentError>>, max_rounds: u32) -> Harness {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let executed = Arc::new(Mutex::new(Vec::new()));
        let client = ScriptedClient {
            replies: Mutex::new(replies.into()),
            calls: Arc::clone(&calls),
        };
        let runner = RecordingRunner {
            executed: Arc::clone(&executed),
        };
        let mut config = Config::with_key("sk-test".to_string());
        config.max_rounds = max_rounds;
        Harness {
            turn_loop: TurnLoop::new(Box::new(client), Box::new(runner), &config),
            calls,
            executed,
        }
    }

    #[tokio::test]
    async fn test_final_answer_needs_no_execution() {
        let h = harness(
            vec![Ok(AgentReply::FinalAnswer {
                text: "All good.".to_string(),
            })],
            50,
        );
        let mut session = Session::new();

        let answer = h
            .turn_loop
            .handle_request(&mut session, "how are you".to_string())
            .await
            .unwrap();

        assert_eq!(answer, "All good.");
        assert!(h.executed.lock().unwrap().is_empty());
        assert_eq!(h.calls.lock().unwrap().len(), 1);
        let roles: Vec<_> = session.snapshot().iter().map(Turn::role).collect();
        assert_eq!(roles, ["user", "assistant"]);
    }

    #[tokio::test]
    async fn test_batch_executes_in_order_with_one_result_turn_each() {
        let requests = vec![
            tool_request("toolu_a", "echo one"),
            tool_request("toolu_b", "echo two"),
            tool_request("toolu_c", "echo three"),
        ];
        let h = harness(
            vec![
                Ok(AgentReply::ToolRequests {
                    commentary: None,
                    requests,
                }),
                Ok(AgentReply::FinalAnswer {
                    text: "Ran them.".to_string(),
                }),
            ],
            50,
        );
        let mut session = Session::new();

        h.turn_loop
            .handle_request(&mut session, "run three echoes".to_string())
            .await
            .unwrap();

        assert_eq!(
            *h.executed.lock().unwrap(),
            ["echo one", "echo two", "echo three"]
        );

        let roles: Vec<_> = session.snapshot().iter().map(Turn::role).collect();
        assert_eq!(
            roles,
            ["user", "assistant", "tool-result", "tool-result", "tool-result", "assistant"]
        );
        let result_ids: Vec<_> = session
            .snapshot()
            .iter()
            .filter_map(|turn| match &turn.content {
                TurnContent::ToolResult(outcome) => Some(outcome.request_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(result_ids, ["toolu_a", "toolu_b", "toolu_c"]);

        // The second call sees the whole batch, never a partial one.
        let calls = h.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            ["user", "assistant", "tool-result", "tool-result", "tool-result"]
        );
    }

    #[tokio::test]
    async fn test_commentary_rides_on_the_assistant_turn() {
        let h = harness(
            vec![
                Ok(AgentReply::ToolRequests {
                    commentary: Some("Let me check.".to_string()),
                    requests: vec![tool_request("toolu_a", "ls")],
                }),
                Ok(AgentReply::FinalAnswer {
                    text: "Empty directory.".to_string(),
                }),
            ],
            50,
        );
        let mut session = Session::new();

        h.turn_loop
            .handle_request(&mut session, "what is here".to_string())
            .await
            .unwrap();

        assert_eq!(*h.executed.lock().unwrap(), ["ls"]);
        match &session.snapshot()[1].content {
            TurnContent::Assistant { text, requests } => {
                assert_eq!(text.as_deref(), Some("Let me check."));
                assert_eq!(requests.len(), 1);
            }
            other => panic!("expected assistant turn, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_round_limit_aborts_but_session_survives() {
        let keep_asking = || {
            Ok(AgentReply::ToolRequests {
                commentary: None,
                requests: vec![tool_request("toolu_x", "true")],
            })
        };
        let h = harness(vec![keep_asking(), keep_asking(), keep_asking()], 3);
        let mut session = Session::new();

        let err = h
            .turn_loop
            .handle_request(&mut session, "loop forever".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::RoundLimit(3)));
        assert_eq!(h.calls.lock().unwrap().len(), 3);

        // The session still takes the next request (the script is exhausted,
        // so the client falls back to a final answer).
        let answer = h
            .turn_loop
            .handle_request(&mut session, "just answer".to_string())
            .await
            .unwrap();
        assert_eq!(answer, "done");
    }

    #[tokio::test]
    async fn test_transport_error_keeps_session_intact() {
        let h = harness(
            vec![Err(AgentError::Transport("connection refused".to_string()))],
            50,
        );
        let mut session = Session::new();

        let err = h
            .turn_loop
            .handle_request(&mut session, "hello".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));

        // The user turn stays; nothing was executed.
        assert_eq!(session.len(), 1);
        assert!(h.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_requested_command_really_runs() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("f.txt");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let client = ScriptedClient {
            replies: Mutex::new(
                vec![
                    Ok(AgentReply::ToolRequests {
                        commentary: None,
                        requests: vec![tool_request(
                            "toolu_01",
                            &format!("echo hi > '{}'", marker.display()),
                        )],
                    }),
                    Ok(AgentReply::FinalAnswer {
                        text: "Created the file.".to_string(),
                    }),
                ]
                .into(),
            ),
            calls: Arc::clone(&calls),
        };
        let config = Config::with_key("sk-test".to_string());
        let runner = crate::agent::tools::ShellRunner::new(&config);
        let turn_loop = TurnLoop::new(Box::new(client), Box::new(runner), &config);
        let mut session = Session::new();

        let answer = turn_loop
            .handle_request(&mut session, "create f.txt".to_string())
            .await
            .unwrap();

        assert_eq!(answer, "Created the file.");
        assert!(marker.exists());
        assert_eq!(calls.lock().unwrap().len(), 2);
        match &session.snapshot()[2].content {
            TurnContent::ToolResult(outcome) => {
                assert_eq!(outcome.exit_status, Some(0));
                assert!(outcome.success());
            }
            other => panic!("expected tool result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timed_out_outcome_is_fed_back_not_raised() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let client = ScriptedClient {
            replies: Mutex::new(
                vec![
                    Ok(AgentReply::ToolRequests {
                        commentary: None,
                        requests: vec![tool_request("toolu_slow", "sleep 600")],
                    }),
                    Ok(AgentReply::FinalAnswer {
                        text: "That took too long.".to_string(),
                    }),
                ]
                .into(),
            ),
            calls: Arc::clone(&calls),
        };
        let config = Config::with_key("sk-test".to_string());
        let turn_loop = TurnLoop::new(Box::new(client), Box::new(TimeoutRunner), &config);
        let mut session = Session::new();

        let answer = turn_loop
            .handle_request(&mut session, "run something slow".to_string())
            .await
            .unwrap();

        assert_eq!(answer, "That took too long.");
        assert_eq!(calls.lock().unwrap().len(), 2);
        match &session.snapshot()[2].content {
            TurnContent::ToolResult(outcome) => {
                assert!(outcome.timed_out);
                assert_eq!(outcome.exit_status, None);
            }
            other => panic!("expected tool result, got {:?}", other),
        }
    }
}
