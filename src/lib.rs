//! Conversational front end for constraint based metabolic models.
//!
//! Models are loaded from SBML or COBRA JSON into a [`registry::ModelManager`], analysed
//! with flux balance, flux variability and knockout analyses, and exposed to an LLM
//! agent through a fixed set of tools. The agent is reachable from a terminal REPL and
//! from a small REST API.

pub mod agent;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod llm;
pub mod metabolic;
pub mod optimize;
pub mod registry;
pub mod server;
pub mod tools;
