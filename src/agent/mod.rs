//! Agent Module
//!
//! The turn loop, the system prompt builder, and the shell tool. Everything
//! between a user request and the final answer lives here.

pub mod system_prompt;
pub mod tools;
pub mod turn_loop;
