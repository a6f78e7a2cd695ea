//! errand -- an agent in your terminal.
//!
//! Entry point: parse flags, resolve configuration, wire the client and
//! runner into the turn loop, and run the terminal surface until
//! end-of-input or an interrupt.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use errand::agent::tools::ShellRunner;
use errand::agent::turn_loop::TurnLoop;
use errand::config::Config;
use errand::error::AgentError;
use errand::provider::AnthropicClient;
use errand::repl;
use errand::transcript::Session;

/// errand: describe a task; it runs the commands.
#[derive(Parser, Debug)]
#[command(
    name = "errand",
    version,
    about = "An agent in your terminal: describe a task, it runs the commands."
)]
struct Cli {
    /// Model to call
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the agent endpoint
    #[arg(long)]
    api_url: Option<String>,

    /// Per-command timeout in seconds
    #[arg(long)]
    command_timeout: Option<u64>,

    /// Agent calls allowed per request before giving up
    #[arg(long)]
    max_rounds: Option<u32>,
}

// ---- Entry Point -----------------------------------------------------------

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout belongs to the conversation.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "errand=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        eprintln!("{} {:#}", "fatal:".red().bold(), err);
        std::process::exit(1);
    }
}

/// Resolve configuration, wire the session together, run it to completion.
async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(cli)?;

    let client = AnthropicClient::new(&config);
    let runner = ShellRunner::new(&config);
    let turn_loop = TurnLoop::new(Box::new(client), Box::new(runner), &config);
    let mut session = Session::new();

    let shutdown = async {
        let ctrl_c = signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("Failed to register Ctrl+C handler");
        }
    };

    tokio::select! {
        result = repl::run_repl(&turn_loop, &mut session, &config) => result,
        _ = shutdown => {
            println!("\n{}", "goodbye".dimmed());
            Ok(())
        }
    }
}

/// Fold CLI flag overrides into the environment configuration.
fn resolve_config(cli: Cli) -> Result<Config, AgentError> {
    let mut config = Config::from_env()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(secs) = cli.command_timeout {
        if secs == 0 {
            return Err(AgentError::Configuration(
                "--command-timeout must be at least 1 second".to_string(),
            ));
        }
        config.command_timeout = Duration::from_secs(secs);
    }
    if let Some(max_rounds) = cli.max_rounds {
        if max_rounds == 0 {
            return Err(AgentError::Configuration(
                "--max-rounds must be at least 1".to_string(),
            ));
        }
        config.max_rounds = max_rounds;
    }
    Ok(config)
}
