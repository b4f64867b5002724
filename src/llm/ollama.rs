// src/llm/ollama.rs

use crate::config::Config;
use crate::error::Result;
use crate::llm::{handle_api_response, ChatMessage};
use anyhow::{anyhow, Context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

// --- Request Structs ---

#[derive(Serialize, Debug)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool, // The agent needs the whole reply before parsing it
}

// --- Response Structs ---

#[derive(Deserialize, Debug)]
struct OllamaChatResponse {
    message: Option<ChatMessage>,
    error: Option<String>,
}

// --- Model Listing Structs ---

#[derive(Deserialize, Debug)]
struct OllamaTag {
    name: String,
}

#[derive(Deserialize, Debug)]
struct OllamaTagsResponse {
    models: Vec<OllamaTag>,
}

// --- Chat Function ---
#[instrument(skip(client, config, messages))]
pub async fn chat(client: &Client, config: &Config, messages: &[ChatMessage]) -> Result<String> {
    let url = format!("{}/api/chat", config.ollama_base_url);
    let request_payload = OllamaChatRequest {
        model: &config.default_ollama_model,
        messages,
        stream: false,
    };

    debug!(model = %config.default_ollama_model, "Sending chat request to Ollama");

    let response = client
        .post(&url)
        .timeout(Duration::from_secs(config.ollama_request_timeout_secs))
        .json(&request_payload)
        .send()
        .await
        .context(format!("Failed to send chat request to Ollama at {}", url))?;

    let chat_response: OllamaChatResponse = handle_api_response(response, "Ollama chat").await?;
    if let Some(err) = chat_response.error {
        return Err(anyhow!("Ollama Error: {}", err));
    }
    chat_response
        .message
        .map(|m| m.content)
        .ok_or_else(|| anyhow!("No message in Ollama chat response"))
}

// --- List Models Function ---
#[instrument(skip(client, config))]
pub async fn list_models(client: &Client, config: &Config) -> Result<Vec<String>> {
    let url = format!("{}/api/tags", config.ollama_base_url);
    debug!("Fetching models list from Ollama: {}", url);

    let response = client
        .get(&url)
        .send()
        .await
        .context(format!("Failed to send list models request to Ollama at {}", url))?;

    let tags_response: OllamaTagsResponse = handle_api_response(response, "Ollama list models").await?;

    let model_names: Vec<String> = tags_response.models.into_iter().map(|tag| tag.name).collect();

    debug!("Found Ollama models: {:?}", model_names);
    Ok(model_names)
}

// --- Check Connection Function ---
#[instrument(skip(client, config))]
pub async fn check_connection(client: &Client, config: &Config) -> Result<()> {
    let url = &config.ollama_base_url;
    debug!("Checking Ollama connection status at {} ...", url);
    let response = client
        .get(url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .context(format!("Failed to connect to Ollama at {}", url))?;

    if response.status().is_success() {
        debug!("Ollama connection check successful (Status: {}).", response.status());
        Ok(())
    } else {
        let status = response.status();
        let error_body = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
        error!("Ollama connection check failed. Status: {}, Body: {:.100}", status, error_body);
        Err(anyhow!("Ollama connection check failed at {}: Status {} - {}", url, status, error_body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_shape() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let request = OllamaChatRequest {
            model: "llama3.1:latest",
            messages: &messages,
            stream: false,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3.1:latest");
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][1]["role"], "user");
    }

    #[test]
    fn chat_response_parsing() {
        let body = r#"{"model":"llama3.1","created_at":"2024-01-01T00:00:00Z","message":{"role":"assistant","content":"Answer: 20"},"done":true}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.unwrap().content, "Answer: 20");
    }
}
