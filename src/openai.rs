//! OpenAI client configuration with sensible defaults.

use crate::config::ModelSettings;
use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// OpenAI client type used throughout Recall.
pub type OpenAiClient = Client<OpenAIConfig>;

/// Create an OpenAI client from model settings.
///
/// The API key is read from `OPENAI_API_KEY`.
pub fn create_client(settings: &ModelSettings) -> Result<OpenAiClient> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .build()?;

    let mut config = OpenAIConfig::default();
    if let Some(api_base) = settings.api_base.as_deref().filter(|b| !b.is_empty()) {
        config = config.with_api_base(api_base);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
