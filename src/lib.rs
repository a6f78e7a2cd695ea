//! errand -- an agent in your terminal
//!
//! A terminal agent that takes a plain-language request, asks a model
//! what to do, and runs the shell commands it asks for until it has
//! an answer.

pub mod types;
pub mod config;
pub mod error;
pub mod transcript;
pub mod provider;
pub mod agent;
pub mod repl;
