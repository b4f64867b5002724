// src/llm/huggingface.rs
//
// Hugging Face Inference API. The text generation endpoint takes a single prompt, so the
// conversation is flattened into role-tagged turns.

use crate::config::{Config, LlmProvider};
use crate::error::Result;
use crate::llm::{handle_api_response, require_api_key, ChatMessage};
use anyhow::{anyhow, Context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

// --- Request Structs ---

#[derive(Serialize, Debug)]
struct HuggingFaceRequest {
    inputs: String,
    parameters: GenerationParameters,
}

#[derive(Serialize, Debug)]
struct GenerationParameters {
    return_full_text: bool,
    max_new_tokens: u32,
}

// --- Response Structs ---

#[derive(Deserialize, Debug)]
struct GeneratedText {
    generated_text: String,
}

/// The API answers with a list of generations, a single one, or an error object
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum HuggingFaceResponse {
    Many(Vec<GeneratedText>),
    One(GeneratedText),
    Error { error: String },
}

/// Flatten a conversation into a prompt ending with an open assistant turn
pub fn flatten_messages(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        let role = match message.role.as_str() {
            "system" => "System",
            "assistant" => "Assistant",
            _ => "User",
        };
        prompt.push_str(&format!("{}: {}\n\n", role, message.content.trim()));
    }
    prompt.push_str("Assistant:");
    prompt
}

fn model_url(config: &Config) -> String {
    format!(
        "{}/{}",
        config.huggingface_api_base_url.trim_end_matches('/'),
        config.default_huggingface_model
    )
}

// --- Chat Function ---
#[instrument(skip(client, config, messages))]
pub async fn chat(client: &Client, config: &Config, messages: &[ChatMessage]) -> Result<String> {
    let api_key = require_api_key(config, LlmProvider::HuggingFace)?;
    let url = model_url(config);

    let request_payload = HuggingFaceRequest {
        inputs: flatten_messages(messages),
        parameters: GenerationParameters {
            return_full_text: false,
            max_new_tokens: 1024,
        },
    };

    debug!(?url, "Sending generate request to Hugging Face API");

    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&request_payload)
        .send()
        .await
        .context("Failed to send generate request to Hugging Face API")?;

    let huggingface_response: HuggingFaceResponse =
        handle_api_response(response, "Hugging Face generate").await?;
    generated_text(huggingface_response)
}

fn generated_text(response: HuggingFaceResponse) -> Result<String> {
    match response {
        HuggingFaceResponse::Many(generations) => generations
            .into_iter()
            .next()
            .map(|g| g.generated_text.trim().to_string())
            .ok_or_else(|| anyhow!("No generated text in Hugging Face response")),
        HuggingFaceResponse::One(generation) => Ok(generation.generated_text.trim().to_string()),
        HuggingFaceResponse::Error { error } => Err(anyhow!("Hugging Face API Error: {}", error)),
    }
}

// --- List Models Function ---
#[instrument(skip(_client, config))]
pub async fn list_models(_client: &Client, config: &Config) -> Result<Vec<String>> {
    // The Inference API has no per-account listing, offer the configured model
    Ok(vec![config.default_huggingface_model.clone()])
}

// --- Check Connection Function ---
#[instrument(skip(client, config))]
pub async fn check_connection(client: &Client, config: &Config) -> Result<()> {
    debug!("Checking Hugging Face connection status...");
    chat(client, config, &[ChatMessage::user("ping")]).await?;
    debug!("Hugging Face connection check successful.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_prompt() {
        let prompt = flatten_messages(&[
            ChatMessage::system("You are helpful."),
            ChatMessage::user("Load e_coli_core"),
        ]);
        assert_eq!(
            prompt,
            "System: You are helpful.\n\nUser: Load e_coli_core\n\nAssistant:"
        );
    }

    #[test]
    fn response_shapes() {
        let many: HuggingFaceResponse =
            serde_json::from_str(r#"[{"generated_text":" Answer: ok "}]"#).unwrap();
        assert_eq!(generated_text(many).unwrap(), "Answer: ok");
        let one: HuggingFaceResponse =
            serde_json::from_str(r#"{"generated_text":"hello"}"#).unwrap();
        assert_eq!(generated_text(one).unwrap(), "hello");
        let err: HuggingFaceResponse =
            serde_json::from_str(r#"{"error":"Model is currently loading"}"#).unwrap();
        assert!(generated_text(err).is_err());
    }

    #[test]
    fn url_uses_configured_model() {
        let config = Config::default();
        assert_eq!(
            model_url(&config),
            "https://api-inference.huggingface.co/models/meta-llama/Llama-3.1-8B-Instruct"
        );
    }
}
