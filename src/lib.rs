//! Recall - Session-Scoped Tool Agents
//!
//! A CLI for talking to LLM agents whose instructions are rendered from
//! per-session state, and whose tools mutate that state durably.
//!
//! # Overview
//!
//! Recall allows you to:
//! - Keep a reminder list that survives restarts, managed in natural language
//! - Ask one-shot questions, with or without tools
//! - Draft emails as validated structured output
//! - Inspect and delete stored sessions
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt management
//! - `session` - Session state, stores (memory, SQLite) and lifecycle
//! - `agent` - Agent definitions, tools, instruction templates and the turn runner
//! - `openai` - OpenAI client construction
//! - `cli` - Command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recall::agent::{catalog, OpenAiChatModel, Runner};
//! use recall::config::{Prompts, Settings};
//! use recall::openai::create_client;
//! use recall::session::{SessionManager, SqliteSessionStore, State};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let store = Arc::new(SqliteSessionStore::new(&settings.sqlite_path())?);
//!     let sessions = SessionManager::new(store.clone(), "Recall Assistant", "afzal");
//!     let (session, _) = sessions.resume_or_create(State::new()).await?;
//!
//!     let agent = catalog::reminder_agent(&Prompts::default(), "gpt-4o");
//!     let model = Arc::new(OpenAiChatModel::new(create_client(&settings.model)?));
//!     let mut runner = Runner::new(agent, model, store);
//!
//!     let report = runner.run_turn(&session.key(), "Remind me to water the plants").await?;
//!     println!("{}", report.output);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod session;

pub use error::{RecallError, Result};
