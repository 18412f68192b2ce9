//! CLI output formatting utilities.

use crate::agent::{AgentOutput, ToolCallRecord};
use crate::session::{Session, State, REMINDERS_KEY, USER_NAME_KEY};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a one-line session summary.
    pub fn session_info(session: &Session) {
        let name = session.state.get_str(USER_NAME_KEY).unwrap_or("-");
        println!(
            "  {} {} ({}, {} reminders, updated {})",
            style("*").cyan(),
            style(&session.id).bold(),
            name,
            session.state.get_items(REMINDERS_KEY).len(),
            style(session.updated_at.format("%Y-%m-%d %H:%M").to_string()).dim()
        );
    }

    /// Print the session state: the user's name and reminders, then any other keys.
    pub fn state(state: &State) {
        Output::header("Session State");
        Output::kv("User", state.get_str(USER_NAME_KEY).unwrap_or("(unknown)"));

        let reminders = state.get_items(REMINDERS_KEY);
        if reminders.is_empty() {
            Output::kv("Reminders", "None");
        } else {
            println!("  {}:", style("Reminders").dim());
            for (i, reminder) in reminders.iter().enumerate() {
                println!("    {}. {}", i + 1, value_preview(reminder, 80));
            }
        }

        for (key, value) in state.iter() {
            if key == USER_NAME_KEY || key == REMINDERS_KEY {
                continue;
            }
            Output::kv(key, &value_preview(value, 80));
        }
        println!();
    }

    /// Print a tool call as it was made during a turn.
    pub fn tool_call(record: &ToolCallRecord) {
        let mark = if record.outcome.is_success() {
            style("ok").green()
        } else {
            style("failed").red()
        };
        println!("{} {}", style(format!("  [{}]", record.name)).dim(), mark);
    }

    /// Print an agent's final response.
    pub fn agent_response(output: &AgentOutput) {
        println!("\n{} {}\n", style("Agent:").cyan().bold(), output);
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
        {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Render a state value on one line, truncated to `max_len` characters.
fn value_preview(value: &Value, max_len: usize) -> String {
    let text = match value {
        Value::String(s) => s.replace('\n', " "),
        other => other.to_string(),
    };
    if text.chars().count() <= max_len {
        text
    } else {
        let cut: String = text.chars().take(max_len).collect();
        format!("{}...", cut)
    }
}
