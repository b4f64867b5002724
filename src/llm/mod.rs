// src/llm/mod.rs
//
// Chat clients for the supported LLM providers. Each provider module exposes `chat`,
// `list_models` and `check_connection`; the functions here dispatch on the active
// provider of a `Config`.

pub mod groq;
pub mod huggingface;
pub mod ollama;
pub mod openai;
pub mod openai_compatible;

use crate::config::{Config, LlmProvider};
use crate::error::Result;
use anyhow::{anyhow, Context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

// --- Messages ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String, // "system", "user", "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

// --- Dispatch ---

/// Send a conversation to the active provider and return the reply text
#[instrument(skip(client, config, messages), fields(provider = %config.active_provider, messages = messages.len()))]
pub async fn chat(client: &Client, config: &Config, messages: &[ChatMessage]) -> Result<String> {
    match config.active_provider {
        LlmProvider::Ollama => ollama::chat(client, config, messages).await,
        LlmProvider::OpenAi => openai::chat(client, config, messages).await,
        LlmProvider::Groq => groq::chat(client, config, messages).await,
        LlmProvider::HuggingFace => huggingface::chat(client, config, messages).await,
    }
}

#[instrument(skip(client, config))]
pub async fn list_models(client: &Client, config: &Config, provider: LlmProvider) -> Result<Vec<String>> {
    match provider {
        LlmProvider::Ollama => ollama::list_models(client, config).await,
        LlmProvider::OpenAi => openai::list_models(client, config).await,
        LlmProvider::Groq => groq::list_models(client, config).await,
        LlmProvider::HuggingFace => huggingface::list_models(client, config).await,
    }
}

#[instrument(skip(client, config))]
pub async fn check_connection(client: &Client, config: &Config, provider: LlmProvider) -> Result<()> {
    match provider {
        LlmProvider::Ollama => ollama::check_connection(client, config).await,
        LlmProvider::OpenAi => openai::check_connection(client, config).await,
        LlmProvider::Groq => groq::check_connection(client, config).await,
        LlmProvider::HuggingFace => huggingface::check_connection(client, config).await,
    }
}

/// API key of a keyed provider, or an error naming the variable to set
pub fn require_api_key<'a>(config: &'a Config, provider: LlmProvider) -> Result<&'a str> {
    let key = match provider {
        LlmProvider::Ollama => return Ok(""),
        LlmProvider::OpenAi => config.openai_api_key.as_deref(),
        LlmProvider::Groq => config.groq_api_key.as_deref(),
        LlmProvider::HuggingFace => config.huggingface_api_key.as_deref(),
    };
    key.ok_or_else(|| {
        anyhow!(
            "{} is not set. Use '/config' or set environment variable.",
            provider.get_provider_api_key_name()
        )
    })
}

// --- Helper function to handle API responses ---
pub(crate) async fn handle_api_response<T: serde::de::DeserializeOwned + std::fmt::Debug>(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<T> {
    let status = response.status();
    let response_bytes = response
        .bytes()
        .await
        .context(format!("Failed to read {} response body", operation_name))?;

    match serde_json::from_slice::<T>(&response_bytes) {
        Ok(parsed_response) => {
            debug!(?parsed_response, "Successfully parsed {} response", operation_name);
            Ok(parsed_response)
        }
        Err(parse_error) => {
            let body_string = String::from_utf8_lossy(&response_bytes);
            error!(
                status = ?status,
                error = ?parse_error,
                response_body = ?body_string,
                "Failed to parse {} response", operation_name
            );
            let base_msg = if status.is_success() {
                format!("Failed to parse successful {} response", operation_name)
            } else {
                format!("API {} request failed", operation_name)
            };
            Err(anyhow!("{} (Status: {}): {}. Body: {}", base_msg, status, parse_error, body_string))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_name_the_variable() {
        let config = Config::default();
        let err = require_api_key(&config, LlmProvider::Groq).unwrap_err();
        assert!(err.to_string().starts_with("GROQ_API_KEY is not set."));
        assert_eq!(require_api_key(&config, LlmProvider::Ollama).unwrap(), "");

        let mut config = Config::default();
        config.set_api_key(&LlmProvider::OpenAi, "sk-test".to_string());
        assert_eq!(require_api_key(&config, LlmProvider::OpenAi).unwrap(), "sk-test");
    }

    #[test]
    fn message_roles() {
        assert_eq!(ChatMessage::system("a").role, "system");
        assert_eq!(ChatMessage::user("b").role, "user");
        assert_eq!(ChatMessage::assistant("c").content, "c");
    }

    #[tokio::test]
    async fn keyed_provider_without_key_fails_before_sending() {
        let mut config = Config::default();
        config.active_provider = LlmProvider::OpenAi;
        let err = chat(&Client::new(), &config, &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("OPENAI_API_KEY is not set."));
    }
}
