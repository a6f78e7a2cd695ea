//! Terminal Surface
//!
//! Reads requests from stdin and hands them to the turn loop. Requests are
//! multi-line: a blank line after content submits, end-of-input ends the
//! session. Piped input works the same way; prompt decoration only appears
//! when stdin is a terminal.

use std::io::{IsTerminal, Write};

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::agent::turn_loop::TurnLoop;
use crate::config::Config;
use crate::transcript::Session;

/// Run the read/dispatch loop until end-of-input.
pub async fn run_repl(turn_loop: &TurnLoop, session: &mut Session, config: &Config) -> Result<()> {
    let interactive = std::io::stdin().is_terminal();
    if interactive {
        print_banner(config);
    }
    tracing::info!(session = %session.id(), model = %config.model, "session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            print!("{} ", ">>>".bold());
            let _ = std::io::stdout().flush();
        }

        let request = match read_request(&mut lines)
            .await
            .context("reading standard input")?
        {
            Some(request) => request,
            None => break,
        };

        // A failed request leaves the session alive; the prompt comes back.
        if let Err(err) = turn_loop.handle_request(session, request).await {
            println!("{} {}", "[error]".red().bold(), err);
            tracing::warn!(error = %err, "request failed");
        }
    }

    if interactive {
        println!("{}", "goodbye".dimmed());
    }
    Ok(())
}

fn print_banner(config: &Config) {
    println!(
        "{}",
        format!("errand v{}", env!("CARGO_PKG_VERSION")).bold()
    );
    let cwd = std::env::current_dir()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    println!("{} {}", "model:".dimmed(), config.model);
    println!("{} {}", "cwd:".dimmed(), cwd);
    println!(
        "{}",
        "Type a request; a blank line sends it. Ctrl-D or Ctrl-C exits.".dimmed()
    );
    println!();
}

/// Assemble one request from the line stream.
///
/// Leading blank lines are skipped. A blank line after content submits.
/// End-of-input submits pending content, or returns `None` when nothing
/// is pending, which ends the session.
async fn read_request<R>(lines: &mut Lines<R>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut collected: Vec<String> = Vec::new();
    loop {
        match lines.next_line().await? {
            Some(line) => {
                if line.trim().is_empty() {
                    if collected.is_empty() {
                        continue;
                    }
                    break;
                }
                collected.push(line);
            }
            None => {
                if collected.is_empty() {
                    return Ok(None);
                }
                break;
            }
        }
    }
    Ok(Some(collected.join("\n")))
}
