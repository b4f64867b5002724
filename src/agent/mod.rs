// src/agent/mod.rs
//
// Tool-using chat agent: a ReAct loop over the configured LLM, followed by a second call
// that rewrites the raw tool output for the researcher.

pub mod memory;
pub mod prompts;
pub mod react;

use std::sync::Arc;

use crate::config::{Config, LlmProvider};
use crate::error::Result;
use crate::llm::{self, ChatMessage};
use crate::registry::ModelManager;
use crate::tools::{self, ToolContext};
use anyhow::{anyhow, Context};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub use memory::ChatMemory;
pub use react::{parse_react_output, ReactStep};

pub struct Agent {
    config: Config,
    client: Client,
    tools: ToolContext,
    memory: ChatMemory,
}

impl Agent {
    pub fn new(config: Config, client: Client, manager: Arc<Mutex<ModelManager>>) -> Self {
        let tools = ToolContext::new(manager, config.clone(), client.clone());
        let memory = ChatMemory::new(config.memory_token_limit);
        Self {
            config,
            client,
            tools,
            memory,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Provider settings can be changed in place, tools keep their own copy
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn manager(&self) -> &Arc<Mutex<ModelManager>> {
        &self.tools.manager
    }

    pub fn memory(&self) -> &ChatMemory {
        &self.memory
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    /// Switch provider, model and optionally the API key
    pub fn set_llm(&mut self, provider: &str, model: &str, api_key: Option<String>) -> Result<()> {
        let provider: LlmProvider = provider.parse()?;
        self.config.active_provider = provider;
        if !model.trim().is_empty() {
            self.config.set_provider_model(&provider, model.trim().to_string());
        }
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.config.set_api_key(&provider, key);
        }
        info!(
            provider = %provider,
            model = self.config.get_active_model_name(),
            "LLM updated"
        );
        Ok(())
    }

    /// Answer a user message: run the tool loop, rewrite its result and remember the exchange
    #[instrument(skip(self))]
    pub async fn query(&mut self, input: &str) -> Result<String> {
        let agent_response = self.run_tools(input).await?;
        let rewritten = self
            .rewrite(input, &agent_response)
            .await
            .context("Failed to rewrite the agent response")?;
        self.memory.push_exchange(input, &rewritten);
        Ok(rewritten)
    }

    /// The ReAct loop, returning the raw agent response
    ///
    /// With return-direct tools the first tool result ends the loop. Otherwise the result is
    /// fed back as an observation until the model answers or the step limit is reached.
    pub async fn run_tools(&self, input: &str) -> Result<String> {
        let mut messages = vec![ChatMessage::system(prompts::agent_system_prompt())];
        messages.extend(self.memory.messages().cloned());
        messages.push(ChatMessage::user(input));

        for step in 1..=self.config.max_agent_steps {
            let reply = llm::chat(&self.client, &self.config, &messages)
                .await
                .context("Agent LLM call failed")?;
            debug!(step, reply = %reply, "Agent reply");

            match parse_react_output(&reply) {
                ReactStep::Answer { answer, .. } => return Ok(answer),
                ReactStep::Action { tool, input: args, thought } => {
                    info!(step, tool = %tool, thought = ?thought, "Agent calling tool");
                    let result = tools::call_tool(&self.tools, &tool, args).await;
                    let observation = serde_json::to_string_pretty(&result)
                        .context("Failed to serialize tool result")?;
                    if self.config.return_direct {
                        return Ok(observation);
                    }
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(format!("Observation: {}", observation)));
                }
            }
        }
        warn!(steps = self.config.max_agent_steps, "Agent reached the step limit");
        Err(anyhow!(
            "Agent stopped after {} steps without an answer",
            self.config.max_agent_steps
        ))
    }

    async fn rewrite(&self, input: &str, agent_response: &str) -> Result<String> {
        let messages = [
            ChatMessage::system(prompts::REWRITE_SYSTEM_PROMPT),
            ChatMessage::user(prompts::render_rewrite_prompt(input, agent_response)),
        ];
        llm::chat(&self.client, &self.config, &messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Agent {
        Agent::new(
            Config::default(),
            Client::new(),
            Arc::new(Mutex::new(ModelManager::new())),
        )
    }

    #[test]
    fn set_llm_switches_provider() {
        let mut agent = agent();
        agent
            .set_llm("groq", "llama-3.3-70b-versatile", Some("gsk_test".to_string()))
            .unwrap();
        assert_eq!(agent.config().active_provider, LlmProvider::Groq);
        assert_eq!(agent.config().get_active_model_name(), "llama-3.3-70b-versatile");
        assert_eq!(agent.config().get_active_api_key(), Some("gsk_test"));
    }

    #[test]
    fn set_llm_rejects_unknown_provider() {
        let mut agent = agent();
        let err = agent.set_llm("cohere", "command-r", None).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported LLM provider: cohere");
        assert_eq!(agent.config().active_provider, LlmProvider::Ollama);
    }
}
