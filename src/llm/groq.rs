// src/llm/groq.rs

use crate::config::{Config, LlmProvider};
use crate::error::Result;
use crate::llm::openai_compatible as common_client; // Use the shared client
use crate::llm::{require_api_key, ChatMessage};
use anyhow::Context;
use reqwest::Client;
use tracing::instrument;

// --- Chat Function (using common client) ---
#[instrument(skip(client, config, messages))]
pub async fn chat(client: &Client, config: &Config, messages: &[ChatMessage]) -> Result<String> {
    let api_key = require_api_key(config, LlmProvider::Groq)?;
    common_client::chat(
        client,
        api_key,
        &config.groq_api_base_url,
        &config.default_groq_model,
        messages,
    )
    .await
    .context("Groq API chat call failed")
}

// --- List Models Function (using common client) ---
#[instrument(skip(client, config))]
pub async fn list_models(client: &Client, config: &Config) -> Result<Vec<String>> {
    let api_key = require_api_key(config, LlmProvider::Groq)?;
    common_client::list_models(client, api_key, &config.groq_api_base_url)
        .await
        .context("Groq API list models call failed")
}

// --- Check Connection Function (using common client) ---
#[instrument(skip(client, config))]
pub async fn check_connection(client: &Client, config: &Config) -> Result<()> {
    let api_key = require_api_key(config, LlmProvider::Groq)?;
    common_client::check_connection(client, api_key, &config.groq_api_base_url)
        .await
        .context("Groq API connection check failed")
}
