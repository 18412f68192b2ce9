//! Configuration settings for Recall.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub session: SessionSettings,
    pub profile: ProfileSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.recall".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Chat model name.
    pub name: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum model calls per conversational turn.
    pub max_iterations: usize,
    /// Conversation messages kept between turns.
    pub max_history: usize,
    /// Override for the API base URL (OpenAI-compatible servers).
    pub api_base: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gpt-4o".to_string(),
            timeout_seconds: 300,
            max_iterations: 10,
            max_history: 40,
            api_base: None,
        }
    }
}

/// Session store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    /// Durable SQLite database (default).
    #[default]
    Sqlite,
    /// Volatile, lost on exit.
    Memory,
}

impl std::fmt::Display for StoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreProvider::Sqlite => write!(f, "sqlite"),
            StoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Session scoping and persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Application name sessions are scoped by.
    pub app_name: String,
    /// User id sessions are scoped by.
    pub user_id: String,
    /// Session store backend.
    pub store: StoreProvider,
    /// Path to the SQLite database (for the sqlite store).
    pub sqlite_path: String,
    /// Print the session state before each chat turn.
    pub show_state: bool,
    /// State for newly created reminder sessions.
    pub initial_state: Map<String, Value>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let mut initial_state = Map::new();
        initial_state.insert("user_name".to_string(), json!("Friend"));
        initial_state.insert("reminders".to_string(), json!([]));

        Self {
            app_name: "Recall Assistant".to_string(),
            user_id: "default".to_string(),
            store: StoreProvider::Sqlite,
            sqlite_path: "~/.recall/sessions.db".to_string(),
            show_state: true,
            initial_state,
        }
    }
}

/// Seed state for the question-answering profile agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    pub user_name: String,
    pub user_preferences: String,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            user_name: "Friend".to_string(),
            user_preferences: "No preferences recorded yet.".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom agent prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::RecallError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recall")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.session.sqlite_path)
    }
}
