//! Error types for Recall.

use thiserror::Error;

/// Library-level error type for Recall operations.
#[derive(Error, Debug)]
pub enum RecallError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Session not found: {session_id} (app '{app_name}', user '{user_id}')")]
    SessionNotFound {
        app_name: String,
        user_id: String,
        session_id: String,
    },

    #[error("Session already exists: {0}")]
    SessionExists(String),

    #[error("Instruction template error: {0}")]
    Template(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Structured output rejected: {0}")]
    OutputValidation(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

/// Result type alias for Recall operations.
pub type Result<T> = std::result::Result<T, RecallError>;
