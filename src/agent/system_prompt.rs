//! System Prompt Builder
//!
//! Assembles the fixed behavior prompt plus a small dynamic context section
//! (working directory, platform). Built once per session at startup.

// --- Immutable Constants ---

pub const BEHAVIOR: &str = r#"You are a coding assistant operating in the user's terminal. You complete tasks by running shell commands through the run_command tool.

How to work:
1. Check what exists before you change it (ls, cat, git status).
2. Do the work; don't merely suggest commands for the user to run.
3. When a command fails, read the error, adjust, and try another approach.
4. Explain briefly what you are doing as you go.
5. Finish with a short summary of what was accomplished."#;

pub const CAUTION: &str = r#"Caution:
- Be careful with destructive commands (rm, mv over existing files, anything irreversible).
- Do not read credential material (keys, tokens, password stores) unless the user explicitly asks.
- Prefer the least invasive command that achieves the goal."#;

/// Build the complete system prompt for this session.
pub fn build_system_prompt() -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(BEHAVIOR.to_string());
    sections.push(CAUTION.to_string());

    let working_dir = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    sections.push(format!(
        "--- ENVIRONMENT ---\nWorking directory: {}\nPlatform: {}\n--- END ENVIRONMENT ---",
        working_dir,
        std::env::consts::OS,
    ));

    sections.join("\n\n")
}
