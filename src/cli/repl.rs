// src/cli/repl.rs

// --- Imports ---
use crate::agent::Agent;
use crate::cli::helper::ReplHelper;
use crate::config::{Config, LlmProvider};
use crate::error::Result;
use crate::io::read_bounds_csv;
use crate::llm;
use anyhow::Context;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, error, info, warn};

// --- Constants ---
const HISTORY_FILE: &str = "history.txt";
const DISCLAIMER: &str = "Disclaimer: this assistant assumes prior knowledge of constraint-based \
metabolic models. Check every result against your own analysis before relying on it.";

// --- History File Helper ---
fn get_history_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("metabolic-chat");
    std::fs::create_dir_all(&path).ok();
    path.push(HISTORY_FILE);
    path
}

// --- Main REPL Function ---
pub async fn run_interactive(agent: &mut Agent) -> Result<()> {
    info!("Starting interactive metabolic chat session.");

    // --- Setup Rustyline Editor ---
    let mut rl = Editor::<ReplHelper, DefaultHistory>::new()?;
    rl.set_helper(Some(ReplHelper::new()));
    let history_path = get_history_path();
    if let Err(e) = rl.load_history(&history_path) {
        warn!("Failed to load command history from {:?}: {}", history_path, e);
    }

    print_initial_status(agent.config());
    let current = agent.manager().lock().await.current_model_id.clone();
    if let Some(model_id) = current {
        println!("Current metabolic model: {}", model_id);
        println!("---");
    }

    // --- Main Loop ---
    loop {
        let prompt_string = format_prompt(agent.config());

        match rl.readline(&prompt_string) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    warn!("Failed to add line to history: {}", e);
                }
                if is_exit_command(input) {
                    break;
                }

                // --- Dispatch Input ---
                if input.starts_with('/') {
                    if let Err(e) = handle_app_command(input, agent).await {
                        error!("App command failed: {:?}", e);
                        eprintln!("Error executing app command: {:#}", e);
                        eprintln!("---");
                    }
                } else if let Err(e) = handle_agent_prompt(input, agent).await {
                    error!("Agent query failed: {:?}", e);
                    eprintln!("Error generating response: {:#}", e);
                    eprintln!("---");
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                error!("Readline error: {:?}", err);
                eprintln!("Input Error: {}", err);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_path) {
        error!("Failed to save command history to {:?}: {}", history_path, e);
    }

    println!("Exiting interactive session.");
    info!("Exiting interactive metabolic chat session.");
    Ok(())
}

// --- Helper Functions ---

fn print_initial_status(config: &Config) {
    println!("Metabolic Chat");
    println!("{}", DISCLAIMER);
    println!("---");
    println!("Provider: {}", config.active_provider);
    println!("Model: {}", config.get_active_model_name());
    if config.active_provider == LlmProvider::Ollama {
        println!("Ollama Endpoint: {}", config.ollama_base_url);
    } else if config.get_active_api_key().is_none() {
        println!(
            "Warning: {} not set.",
            config.active_provider.get_provider_api_key_name()
        );
    }
    println!("Type '/help' for commands, '/load <model_id>' to fetch a model, or ask a question.");
    println!("---");
}

fn format_prompt(config: &Config) -> String {
    format!(
        "{}:{}> ",
        config.active_provider.get_provider_config_name(),
        config.get_active_model_name()
    )
}

fn is_exit_command(input: &str) -> bool {
    matches!(input, "quit" | "exit" | "/quit" | "/exit")
}

// --- Agent Prompt Handler ---
async fn handle_agent_prompt(input: &str, agent: &mut Agent) -> Result<()> {
    println!("... thinking via {} ...", agent.config().active_provider);
    let response = agent.query(input).await?;
    render_markdown(&response);
    println!("---");
    Ok(())
}

/// Pipe markdown through `glow` when it is installed, plain text otherwise
fn render_markdown(text: &str) {
    match Command::new("glow")
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
    {
        Ok(mut glow_process) => {
            if let Some(mut stdin) = glow_process.stdin.take() {
                if let Err(e) = stdin.write_all(text.as_bytes()) {
                    eprintln!("Error writing to glow's stdin: {}", e);
                }
            }
            if let Err(e) = glow_process.wait() {
                eprintln!("Error waiting for glow to finish: {}", e);
            }
        }
        Err(_) => println!("\n{}", text.trim()),
    }
}

// --- Application Command Handler ---
async fn handle_app_command(input: &str, agent: &mut Agent) -> Result<()> {
    let (command, args_str) = match input[1..].split_once(' ') {
        Some((command, rest)) => (command.trim(), rest.trim()),
        None => (input[1..].trim(), ""),
    };
    debug!("Handling app command: '{}', args: {:?}", command, args_str);

    match command {
        "help" => print_help(),
        "status" => handle_status_command(agent).await?,
        "use" => handle_use_command(agent, args_str),
        "model" => handle_model_command(agent, args_str).await,
        "model_list" => handle_model_list_command(agent).await,
        "select_model" => handle_select_model_command(agent).await?,
        "config" => handle_config_command(agent.config()),
        "load" => handle_load_command(agent, args_str).await,
        "upload" => handle_upload_command(agent, args_str).await,
        "bounds" => handle_bounds_command(agent, args_str).await,
        "stats" => handle_stats_command(agent).await,
        "models" => handle_models_command(agent).await,
        "switch" => handle_switch_command(agent, args_str).await,
        "clear" => {
            agent.clear_memory();
            println!("Chat history cleared.");
            println!("---");
        }
        _ => {
            println!(
                "Unknown command: '/{}'. Type '/help' for available commands.",
                command
            );
            println!("---");
        }
    }
    Ok(())
}

// --- LLM Commands ---

async fn handle_status_command(agent: &Agent) -> Result<()> {
    println!("Checking connection status...");
    let config = agent.config();
    for provider in LlmProvider::ALL {
        print!(" - {}: ", provider.get_provider_name());
        io::stdout().flush()?;
        if provider.requires_api_key() && llm::require_api_key(config, provider).is_err() {
            println!(
                "Not configured ({} not set)",
                provider.get_provider_api_key_name()
            );
            continue;
        }
        match llm::check_connection(agent.client(), config, provider).await {
            Ok(()) => println!("Connected"),
            Err(e) => println!("Error ({})", e),
        }
    }
    println!("---");
    Ok(())
}

fn handle_use_command(agent: &mut Agent, args_str: &str) {
    if args_str.is_empty() || args_str.contains(char::is_whitespace) {
        println!("Usage: /use <provider> (ollama, openai, groq, huggingface)");
        println!("---");
        return;
    }
    match args_str.parse::<LlmProvider>() {
        Ok(provider) => {
            let config = agent.config_mut();
            config.active_provider = provider;
            println!(
                "Switched to {} (Model: {}).",
                provider.get_provider_name(),
                config.get_active_model_name()
            );
            if provider.requires_api_key() && config.get_active_api_key().is_none() {
                println!("Warning: {} not set.", provider.get_provider_api_key_name());
            }
        }
        Err(e) => println!("{}. Available: ollama, openai, groq, huggingface", e),
    }
    println!("---");
}

async fn handle_model_command(agent: &mut Agent, model_name: &str) {
    if model_name.is_empty() {
        println!("Current model: {}", agent.config().get_active_model_name());
        println!("Usage: /model <name>");
        println!("Use /select_model for interactive selection.");
        println!("---");
        return;
    }
    let provider = agent.config().active_provider;
    match llm::list_models(agent.client(), agent.config(), provider).await {
        Ok(models) if !models.iter().any(|m| m == model_name) => {
            warn!("{} model '{}' not found via /model_list.", provider, model_name);
            println!("Warning: Model '{}' not verified.", model_name);
        }
        Ok(_) => {}
        Err(e) => warn!("Could not verify model existence: {}", e),
    }
    agent
        .config_mut()
        .set_provider_model(&provider, model_name.to_string());
    println!("Set default model to: {}", agent.config().get_active_model_name());
    println!("---");
}

async fn handle_model_list_command(agent: &Agent) {
    let provider = agent.config().active_provider;
    println!("Fetching available {} models...", provider.get_provider_name());
    match llm::list_models(agent.client(), agent.config(), provider).await {
        Ok(models) if models.is_empty() => println!("No {} models found.", provider),
        Ok(models) => {
            println!("Available {} models:", provider);
            models.iter().for_each(|m| println!(" - {}", m));
        }
        Err(e) => {
            error!("Failed to list {} models: {:?}", provider, e);
            eprintln!("Error: {}", e);
        }
    }
    println!("---");
}

async fn handle_select_model_command(agent: &mut Agent) -> Result<()> {
    let provider = agent.config().active_provider;
    println!("Fetching available {} models for selection...", provider);
    match llm::list_models(agent.client(), agent.config(), provider).await {
        Ok(models) => {
            let prompt = format!("Available {} models:", provider.get_provider_name());
            if let Some(selected) = select_model(&models, &prompt)? {
                agent.config_mut().set_provider_model(&provider, selected);
                println!(
                    "Selected {} model: {}",
                    provider,
                    agent.config().get_active_model_name()
                );
            }
        }
        Err(e) => {
            error!("Failed to list models: {:?}", e);
            eprintln!("Error: {}", e);
        }
    }
    println!("---");
    Ok(())
}

fn handle_config_command(config: &Config) {
    println!("Current Configuration:");
    println!("  Active Provider: {}", config.active_provider);
    for provider in LlmProvider::ALL {
        println!("--- {} ---", provider.get_provider_name());
        for (key, value) in config.get_provider_config(&provider) {
            println!("  {:<30} {}", key, value);
        }
    }
    println!("--- Agent ---");
    println!("  {:<30} {}", "max_agent_steps", config.max_agent_steps);
    println!("  {:<30} {}", "memory_token_limit", config.memory_token_limit);
    println!("  {:<30} {}", "output_dir", config.output_dir.display());
    println!("---");
}

// --- Model Commands ---

async fn handle_load_command(agent: &Agent, model_id: &str) {
    if model_id.is_empty() {
        println!("Usage: /load <model_id> (e.g. e_coli_core, BIOMD0000000001)");
        println!("---");
        return;
    }
    println!("Fetching model '{}'...", model_id);
    let result = agent
        .manager()
        .lock()
        .await
        .load_model_by_id(agent.client(), agent.config(), model_id)
        .await;
    match result {
        Ok(loaded) => println!("Model '{}' loaded successfully.", loaded),
        Err(e) => {
            error!("Failed to load model {}: {:?}", model_id, e);
            eprintln!("Error loading model: {:#}", e);
        }
    }
    println!("---");
}

async fn handle_upload_command(agent: &Agent, path: &str) {
    if path.is_empty() {
        println!("Usage: /upload <file.xml|file.sbml|file.json>");
        println!("---");
        return;
    }
    match agent.manager().lock().await.load_file(path) {
        Ok(model_id) => println!("Model '{}' loaded from {}.", model_id, path),
        Err(e) => eprintln!("Error loading {}: {}", path, e),
    }
    println!("---");
}

async fn handle_bounds_command(agent: &Agent, path: &str) {
    if path.is_empty() {
        println!("Usage: /bounds <file.csv> (columns: reaction_id,lower_bound,upper_bound)");
        println!("---");
        return;
    }
    match read_bounds_csv(path) {
        Ok(rows) => {
            let count = rows.len();
            agent.manager().lock().await.set_bounds_data(rows);
            println!("Loaded {} reaction bounds from {}.", count, path);
        }
        Err(e) => eprintln!("Error reading bounds from {}: {}", path, e),
    }
    println!("---");
}

async fn handle_stats_command(agent: &Agent) {
    match agent.manager().lock().await.stats() {
        Ok(stats) => print!("{}", stats),
        Err(e) => println!("{}", e),
    }
    println!("---");
}

async fn handle_models_command(agent: &Agent) {
    let manager = agent.manager().lock().await;
    let ids = manager.model_ids();
    if ids.is_empty() {
        println!("No models loaded.");
    } else {
        println!("Loaded models:");
        for id in ids {
            let marker = if manager.current_model_id.as_deref() == Some(id.as_str()) {
                "*"
            } else {
                " "
            };
            println!(" {} {}", marker, id);
        }
    }
    println!("---");
}

async fn handle_switch_command(agent: &Agent, model_id: &str) {
    if model_id.is_empty() {
        println!("Usage: /switch <model_id>");
    } else {
        match agent.manager().lock().await.set_current_model(model_id) {
            Ok(()) => println!("Current model set to '{}'.", model_id),
            Err(e) => println!("{} Loaded models: /models", e),
        }
    }
    println!("---");
}

// --- Helper function for selecting a model from a list ---
fn select_model(models: &[String], prompt: &str) -> Result<Option<String>> {
    if models.is_empty() {
        println!("No models found.");
        return Ok(None);
    }
    println!("{}", prompt);
    models
        .iter()
        .enumerate()
        .for_each(|(i, m)| println!("  {}. {}", i + 1, m));
    loop {
        print!("Enter number (or 0 to cancel): ");
        io::stdout().flush().context("Flush failed")?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).context("Read failed")?;
        match buf.trim().parse::<usize>() {
            Ok(0) => {
                println!("Cancelled.");
                return Ok(None);
            }
            Ok(n) if n <= models.len() => return Ok(Some(models[n - 1].clone())),
            _ => println!("Invalid input. Try again."),
        }
    }
}

// --- Help Command ---
fn print_help() {
    println!("Available Commands:");
    println!(" General:");
    println!("  /help                    - Show this help message.");
    println!("  /config                  - Show current configuration settings.");
    println!("  /clear                   - Forget the chat history of this session.");
    println!("  /quit | /exit            - Exit the application.");
    println!(" LLM:");
    println!("  /status                  - Check connection status for configured providers.");
    println!("  /use <provider>          - Switch provider (ollama, openai, groq, huggingface).");
    println!("  /model <name>            - Set default model for the active provider.");
    println!("  /model_list              - List available models for the active provider.");
    println!("  /select_model            - Interactively select a model for the active provider.");
    println!(" Metabolic models:");
    println!("  /load <model_id>         - Download a model from BioModels or BiGG.");
    println!("  /upload <file>           - Load a local SBML (.xml, .sbml) or COBRA JSON file.");
    println!("  /bounds <file.csv>       - Load reaction bounds used by flux balance analysis.");
    println!("  /stats                   - Summarize the current model.");
    println!("  /models                  - List loaded models.");
    println!("  /switch <model_id>       - Make a loaded model current.");
    println!("Anything else is sent to the assistant.");
    println!("Controls:");
    println!("  Up/Down Arrows           - Navigate command history.");
    println!("  Tab                      - Complete commands and file paths.");
    println!("  Ctrl+C                   - Interrupt.");
    println!("  Ctrl+D                   - Exit.");
    println!("---");
    println!("Note: Set API keys via OPENAI_API_KEY / GROQ_API_KEY / HUGGINGFACE_API_KEY (or .env file).");
    println!("---");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("/quit"));
        assert!(is_exit_command("exit"));
        assert!(!is_exit_command("/exits"));
    }

    #[test]
    fn prompt_shows_provider_and_model() {
        let config = Config::default();
        assert_eq!(
            format_prompt(&config),
            format!("ollama:{}> ", config.default_ollama_model)
        );
    }
}
