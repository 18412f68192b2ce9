//! CLI module for Recall.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Recall - Session-Scoped Tool Agents
///
/// Talk to LLM agents that remember things between runs.
#[derive(Parser, Debug)]
#[command(name = "recall")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the persistent reminder assistant
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Resume or create this session instead of the most recent one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Ask a one-shot question
    Ask {
        /// The question to ask
        question: String,

        /// Answer without tools (instruction-only agent)
        #[arg(long)]
        no_tools: bool,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Draft an email as structured JSON
    Email {
        /// What the email should be about
        task: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Answer a question about the configured user profile
    Profile {
        /// The question to ask
        question: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Inspect stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionsAction {
    /// List sessions for the configured app and user
    List,

    /// Show a session's state (most recent if no id is given)
    Show {
        /// Session id
        session_id: Option<String>,
    },

    /// Delete a session
    Delete {
        /// Session id
        session_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
