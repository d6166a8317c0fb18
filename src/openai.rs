//! OpenAI-compatible client construction.

use crate::config::ProviderSettings;
use crate::error::{NeighborlyError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a client for an OpenAI-compatible endpoint with a request timeout.
///
/// The API key is read from the environment variable named in the provider
/// settings; a missing key is left to the endpoint to reject so offline
/// commands (`list`, `history`) keep working.
pub fn create_client(provider: &ProviderSettings, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| NeighborlyError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new();
    if let Ok(key) = std::env::var(&provider.api_key_env) {
        config = config.with_api_key(key);
    }
    if let Some(base) = &provider.api_base {
        config = config.with_api_base(base.trim_end_matches('/'));
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
