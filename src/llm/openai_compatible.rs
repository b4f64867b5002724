// src/llm/openai_compatible.rs
//
// Client for `/chat/completions` style APIs, shared by the OpenAI and Groq modules.

use crate::error::Result;
use crate::llm::{handle_api_response, ChatMessage};
use anyhow::{anyhow, Context};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

// --- Request Structures ---

#[derive(Serialize, Debug)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

// --- Response Structures ---

#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    // Some providers report errors in a 200 body
    pub error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>, // e.g., "stop", "length"
}

#[derive(Deserialize, Debug)]
pub struct ResponseMessage {
    pub role: String,
    pub content: Option<String>, // Content can sometimes be null
}

#[derive(Deserialize, Debug)]
pub struct ApiError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>, // e.g., "invalid_request_error"
    pub code: Option<String>,       // e.g., "invalid_api_key"
}

// --- Model Listing Structures ---

#[derive(Deserialize, Debug)]
pub struct ListModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
    pub error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
pub struct ModelInfo {
    pub id: String,
    pub owned_by: Option<String>,
}

// --- Shared HTTP Client Logic ---

fn build_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut auth_value =
        HeaderValue::from_str(&format!("Bearer {}", api_key)).context("Invalid API key format")?;
    auth_value.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth_value);
    Ok(headers)
}

/// First non-empty reply of a completion
fn extract_reply(parsed_response: ChatCompletionResponse) -> Result<String> {
    if let Some(api_error) = parsed_response.error {
        error!(?api_error, "API returned an error in the response body");
        return Err(anyhow!(
            "API Error: {} (Type: {:?}, Code: {:?})",
            api_error.message,
            api_error.error_type,
            api_error.code
        ));
    }
    let choice = parsed_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Failed to extract text content from response choices"))?;
    if choice.finish_reason.as_deref() == Some("length") {
        debug!("Completion stopped at the token limit");
    }
    choice
        .message
        .content
        .ok_or_else(|| anyhow!("Response message from {} has no content", choice.message.role))
}

#[instrument(skip(client, api_key, base_url, messages))]
pub async fn chat(
    client: &Client,
    api_key: &str,
    base_url: &str,
    model: &str,
    messages: &[ChatMessage],
) -> Result<String> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let headers = build_headers(api_key)?;

    let request_payload = ChatCompletionRequest {
        model,
        messages,
        temperature: Some(0.0),
    };

    debug!(?url, model, "Sending chat completion request"); // Don't log full payload by default

    let response = client
        .post(&url)
        .headers(headers)
        .json(&request_payload)
        .send()
        .await
        .context(format!("Failed to send request to {}", url))?;

    let parsed_response: ChatCompletionResponse = handle_api_response(response, "chat completion").await?;
    extract_reply(parsed_response)
}

#[instrument(skip(client, api_key, base_url))]
pub async fn list_models(client: &Client, api_key: &str, base_url: &str) -> Result<Vec<String>> {
    let url = format!("{}/models", base_url.trim_end_matches('/'));
    let headers = build_headers(api_key)?;

    debug!("Sending list models request to {}", url);

    let response = client
        .get(&url)
        .headers(headers)
        .send()
        .await
        .context(format!("Failed to send list models request to {}", url))?;

    let list_response: ListModelsResponse = handle_api_response(response, "list models").await?;

    if let Some(api_error) = list_response.error {
        error!(?api_error, "API returned an error listing models");
        return Err(anyhow!("API Error listing models: {}", api_error.message));
    }

    Ok(list_response.data.into_iter().map(|m| m.id).collect())
}

#[instrument(skip(client, api_key, base_url))]
pub async fn check_connection(client: &Client, api_key: &str, base_url: &str) -> Result<()> {
    debug!("Checking OpenAI-compatible connection status via list models...");
    let url = format!("{}/models", base_url.trim_end_matches('/'));
    let headers = build_headers(api_key)?;
    let response = client
        .get(&url)
        .headers(headers)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .context(format!("Failed connection check request to {}", url))?;

    if response.status().is_success() {
        debug!("OpenAI-compatible connection check successful (Status: {}).", response.status());
        Ok(())
    } else {
        let status = response.status();
        let error_body = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
        error!("OpenAI-compatible connection check failed. Status: {}, Body: {:.100}", status, error_body);
        Err(anyhow!("Connection check failed at {}: Status {} - {}", url, status, error_body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_from_first_choice() {
        let body = r#"{"id":"x","object":"chat.completion","choices":[{"index":0,"message":{"role":"assistant","content":"Thought: check"},"finish_reason":"stop"}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_reply(parsed).unwrap(), "Thought: check");
    }

    #[test]
    fn error_body_is_reported() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let err = extract_reply(parsed).unwrap_err().to_string();
        assert!(err.starts_with("API Error: Incorrect API key provided"));
    }

    #[test]
    fn temperature_is_optional() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("temperature").is_none());
    }
}
