//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::error::{RecallError, Result};

/// Check that the model can be reached: an OpenAI API key must be configured.
pub fn check_model_access() -> Result<()> {
    check_api_key(std::env::var("OPENAI_API_KEY").ok().as_deref())
}

fn check_api_key(key: Option<&str>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(RecallError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...' or add it to .env"
                .to_string(),
        )),
        None => Err(RecallError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...' or add it to .env"
                .to_string(),
        )),
    }
}
