//! Configuration module for Recall.
//!
//! Handles loading and managing application settings and agent prompts.

mod prompts;
mod settings;

pub use prompts::{AgentPrompt, Prompts};
pub use settings::{
    GeneralSettings, ModelSettings, ProfileSettings, PromptSettings, SessionSettings, Settings,
    StoreProvider,
};
