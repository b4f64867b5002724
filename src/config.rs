// src/config.rs
use crate::error::Result;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::{env, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    Ollama,
    OpenAi,
    Groq,
    HuggingFace,
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 4] = [
        LlmProvider::Ollama,
        LlmProvider::OpenAi,
        LlmProvider::Groq,
        LlmProvider::HuggingFace,
    ];

    pub fn get_provider_name(&self) -> &str {
        match self {
            LlmProvider::Ollama => "Ollama",
            LlmProvider::OpenAi => "OpenAI",
            LlmProvider::Groq => "Groq",
            LlmProvider::HuggingFace => "HuggingFace",
        }
    }

    pub fn get_provider_config_name(&self) -> &str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Groq => "groq",
            LlmProvider::HuggingFace => "huggingface",
        }
    }

    pub fn get_provider_api_key_name(&self) -> &str {
        match self {
            LlmProvider::Ollama => "",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Groq => "GROQ_API_KEY",
            LlmProvider::HuggingFace => "HUGGINGFACE_API_KEY",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmProvider::Ollama)
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_provider_name())
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" => Ok(LlmProvider::OpenAi),
            "groq" => Ok(LlmProvider::Groq),
            "huggingface" | "hf" | "hf-local" => Ok(LlmProvider::HuggingFace),
            other => Err(anyhow!("Unsupported LLM provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // General
    pub active_provider: LlmProvider,

    // Ollama specific
    pub ollama_base_url: String,
    pub default_ollama_model: String,
    pub ollama_request_timeout_secs: u64,

    // OpenAI specific
    pub openai_api_key: Option<String>,
    pub default_openai_model: String,
    pub openai_api_base_url: String,

    // Groq Specific
    pub groq_api_key: Option<String>,
    pub default_groq_model: String,
    pub groq_api_base_url: String,

    // Hugging Face Specific
    pub huggingface_api_key: Option<String>,
    pub default_huggingface_model: String,
    pub huggingface_api_base_url: String,

    // Server and files
    pub server_addr: String,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,

    // Remote model repositories
    pub bigg_base_url: String,
    pub biomodels_base_url: String,

    // Agent and analysis
    pub memory_token_limit: usize,
    pub max_agent_steps: usize,
    pub solver_tolerance: f64,
    pub preview_rows: usize,
    pub return_direct: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            active_provider: LlmProvider::Ollama,
            // Ollama
            ollama_base_url: "http://localhost:11434".to_string(),
            default_ollama_model: "llama3.1:latest".to_string(),
            ollama_request_timeout_secs: 300,
            // OpenAI
            openai_api_key: None,
            default_openai_model: "gpt-4o-mini".to_string(),
            openai_api_base_url: "https://api.openai.com/v1".to_string(),
            // Groq
            groq_api_key: None,
            default_groq_model: "llama-3.1-8b-instant".to_string(),
            groq_api_base_url: "https://api.groq.com/openai/v1".to_string(),
            // Hugging Face
            huggingface_api_key: None,
            default_huggingface_model: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
            huggingface_api_base_url: "https://api-inference.huggingface.co/models".to_string(),
            // Server
            server_addr: "127.0.0.1:8000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            // Repositories
            bigg_base_url: "http://bigg.ucsd.edu".to_string(),
            biomodels_base_url: "https://www.ebi.ac.uk/biomodels".to_string(),
            // Agent
            memory_token_limit: 40_000,
            max_agent_steps: 5,
            solver_tolerance: 1e-7,
            preview_rows: 5,
            return_direct: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from a variable lookup, unset variables keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(provider) = get("LLM_PROVIDER") {
            config.active_provider = provider.parse()?;
        }

        if let Some(url) = get("OLLAMA_BASE_URL") {
            config.ollama_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            config.default_ollama_model = model;
        }
        if let Some(secs) = get("OLLAMA_REQUEST_TIMEOUT_SECS") {
            config.ollama_request_timeout_secs = secs
                .parse()
                .map_err(|e| anyhow!("Invalid OLLAMA_REQUEST_TIMEOUT_SECS '{}': {}", secs, e))?;
        }

        config.openai_api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("OPENAI_MODEL") {
            config.default_openai_model = model;
        }
        if let Some(url) = get("OPENAI_API_BASE_URL") {
            config.openai_api_base_url = url.trim_end_matches('/').to_string();
        }

        config.groq_api_key = get("GROQ_API_KEY");
        if let Some(model) = get("GROQ_MODEL") {
            config.default_groq_model = model;
        }
        if let Some(url) = get("GROQ_API_BASE_URL") {
            config.groq_api_base_url = url.trim_end_matches('/').to_string();
        }

        config.huggingface_api_key = get("HUGGINGFACE_API_KEY").or_else(|| get("HF_TOKEN"));
        if let Some(model) = get("HUGGINGFACE_MODEL") {
            config.default_huggingface_model = model;
        }

        if let Some(addr) = get("METABOLIC_CHAT_ADDR") {
            config.server_addr = addr;
        }
        if let Some(dir) = get("METABOLIC_CHAT_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("METABOLIC_CHAT_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("BIGG_BASE_URL") {
            config.bigg_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = get("BIOMODELS_BASE_URL") {
            config.biomodels_base_url = url.trim_end_matches('/').to_string();
        }

        if config.active_provider.requires_api_key() && config.get_active_api_key().is_none() {
            eprintln!(
                "Warning: {} environment variable not set.",
                config.active_provider.get_provider_api_key_name()
            );
        }

        Ok(config)
    }

    // Helper to get the currently active model name
    pub fn get_active_model_name(&self) -> &str {
        self.get_model_name(&self.active_provider)
    }

    pub fn get_model_name(&self, provider: &LlmProvider) -> &str {
        match provider {
            LlmProvider::Ollama => &self.default_ollama_model,
            LlmProvider::OpenAi => &self.default_openai_model,
            LlmProvider::Groq => &self.default_groq_model,
            LlmProvider::HuggingFace => &self.default_huggingface_model,
        }
    }

    // Helper to get the API key for the active provider (if applicable)
    pub fn get_active_api_key(&self) -> Option<&str> {
        match self.active_provider {
            LlmProvider::Ollama => None,
            LlmProvider::OpenAi => self.openai_api_key.as_deref(),
            LlmProvider::Groq => self.groq_api_key.as_deref(),
            LlmProvider::HuggingFace => self.huggingface_api_key.as_deref(),
        }
    }

    pub fn set_api_key(&mut self, provider: &LlmProvider, key: String) {
        match provider {
            LlmProvider::Ollama => {}
            LlmProvider::OpenAi => self.openai_api_key = Some(key),
            LlmProvider::Groq => self.groq_api_key = Some(key),
            LlmProvider::HuggingFace => self.huggingface_api_key = Some(key),
        }
    }

    pub fn get_provider_config(&self, provider: &LlmProvider) -> Vec<(&str, String)> {
        let key_state = |key: &Option<String>| {
            let state = if key.is_some() { "set" } else { "not set" };
            state.to_string()
        };
        match provider {
            LlmProvider::Ollama => vec![
                ("ollama_base_url", self.ollama_base_url.clone()),
                ("default_ollama_model", self.default_ollama_model.clone()),
                (
                    "ollama_request_timeout_secs",
                    self.ollama_request_timeout_secs.to_string(),
                ),
            ],
            LlmProvider::OpenAi => vec![
                ("openai_api_base_url", self.openai_api_base_url.clone()),
                ("default_openai_model", self.default_openai_model.clone()),
                ("openai_api_key", key_state(&self.openai_api_key)),
            ],
            LlmProvider::Groq => vec![
                ("groq_api_base_url", self.groq_api_base_url.clone()),
                ("default_groq_model", self.default_groq_model.clone()),
                ("groq_api_key", key_state(&self.groq_api_key)),
            ],
            LlmProvider::HuggingFace => vec![
                ("default_huggingface_model", self.default_huggingface_model.clone()),
                ("huggingface_api_key", key_state(&self.huggingface_api_key)),
            ],
        }
    }

    pub fn set_provider_model(&mut self, provider: &LlmProvider, model: String) {
        match provider {
            LlmProvider::Ollama => self.default_ollama_model = model,
            LlmProvider::OpenAi => self.default_openai_model = model,
            LlmProvider::Groq => self.default_groq_model = model,
            LlmProvider::HuggingFace => self.default_huggingface_model = model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.active_provider, LlmProvider::Ollama);
        assert_eq!(config.get_active_model_name(), "llama3.1:latest");
        assert_eq!(config.memory_token_limit, 40_000);
        assert_eq!(config.max_agent_steps, 5);
        assert_eq!(config.preview_rows, 5);
        assert!(config.return_direct);
    }

    #[test]
    fn environment_overrides() {
        let config = config_from(&[
            ("LLM_PROVIDER", "groq"),
            ("GROQ_API_KEY", "secret"),
            ("GROQ_MODEL", "mixtral"),
            ("OLLAMA_BASE_URL", "http://ollama:11434/"),
            ("OLLAMA_REQUEST_TIMEOUT_SECS", "60"),
            ("HF_TOKEN", "hf_x"),
            ("METABOLIC_CHAT_OUTPUT_DIR", "/tmp/out"),
        ])
        .unwrap();
        assert_eq!(config.active_provider, LlmProvider::Groq);
        assert_eq!(config.get_active_api_key(), Some("secret"));
        assert_eq!(config.get_active_model_name(), "mixtral");
        assert_eq!(config.ollama_base_url, "http://ollama:11434");
        assert_eq!(config.ollama_request_timeout_secs, 60);
        assert_eq!(config.huggingface_api_key.as_deref(), Some("hf_x"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn invalid_values() {
        assert!(config_from(&[("LLM_PROVIDER", "gemini")]).is_err());
        assert!(config_from(&[("OLLAMA_REQUEST_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn provider_names() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!(
            "hf-local".parse::<LlmProvider>().unwrap(),
            LlmProvider::HuggingFace
        );
        for provider in LlmProvider::ALL {
            assert_eq!(
                provider
                    .get_provider_config_name()
                    .parse::<LlmProvider>()
                    .unwrap(),
                provider
            );
        }
    }
}
