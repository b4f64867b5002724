// src/llm/openai.rs

use crate::config::{Config, LlmProvider};
use crate::error::Result;
use crate::llm::openai_compatible as common_client;
use crate::llm::{require_api_key, ChatMessage};
use anyhow::Context;
use reqwest::Client;
use tracing::instrument;

#[instrument(skip(client, config, messages))]
pub async fn chat(client: &Client, config: &Config, messages: &[ChatMessage]) -> Result<String> {
    let api_key = require_api_key(config, LlmProvider::OpenAi)?;
    common_client::chat(
        client,
        api_key,
        &config.openai_api_base_url,
        &config.default_openai_model,
        messages,
    )
    .await
    .context("OpenAI API chat call failed")
}

#[instrument(skip(client, config))]
pub async fn list_models(client: &Client, config: &Config) -> Result<Vec<String>> {
    let api_key = require_api_key(config, LlmProvider::OpenAi)?;
    let models = common_client::list_models(client, api_key, &config.openai_api_base_url)
        .await
        .context("OpenAI API list models call failed")?;
    // The listing also carries embedding, audio and image models
    Ok(models
        .into_iter()
        .filter(|m| m.starts_with("gpt") || m.starts_with('o'))
        .collect())
}

#[instrument(skip(client, config))]
pub async fn check_connection(client: &Client, config: &Config) -> Result<()> {
    let api_key = require_api_key(config, LlmProvider::OpenAi)?;
    common_client::check_connection(client, api_key, &config.openai_api_base_url)
        .await
        .context("OpenAI API connection check failed")
}
