// src/main.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use metabolic_chat::agent::Agent;
use metabolic_chat::config::Config;
use metabolic_chat::error::Result;
use metabolic_chat::registry::ModelManager;
use metabolic_chat::{cli, server};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "metabolic-chat", version, about = "Chat with constraint based metabolic models")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive chat in the terminal (default)
    Chat {
        /// SBML or COBRA JSON model to load before the session starts
        #[arg(long)]
        load: Option<PathBuf>,
    },
    /// Serve the REST API
    Serve {
        /// Listen address, overrides METABOLIC_CHAT_ADDR
        #[arg(long)]
        addr: Option<String>,
        /// SBML or COBRA JSON model to load before serving
        #[arg(long)]
        load: Option<PathBuf>,
    },
}

#[cfg(feature = "logging")]
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}

#[cfg(not(feature = "logging"))]
fn init_tracing() {}

fn preload(manager: &mut ModelManager, path: Option<&PathBuf>) -> Result<()> {
    if let Some(path) = path {
        let model_id = manager
            .load_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;
        info!(model_id = %model_id, "Preloaded model");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // API keys may come from a .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;
    let client = Client::new();
    let mut manager = ModelManager::new();

    match args.command.unwrap_or(Commands::Chat { load: None }) {
        Commands::Chat { load } => {
            preload(&mut manager, load.as_ref())?;
            let manager = Arc::new(Mutex::new(manager));
            let mut agent = Agent::new(config, client, manager);
            if let Err(e) = cli::run_interactive(&mut agent).await {
                error!("Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Commands::Serve { addr, load } => {
            preload(&mut manager, load.as_ref())?;
            let addr = addr.unwrap_or_else(|| config.server_addr.clone());
            info!("Starting metabolic-chat API...");
            let state = server::AppState::new(config, client, Arc::new(Mutex::new(manager)));
            server::serve(state, &addr).await?;
        }
    }

    Ok(())
}
