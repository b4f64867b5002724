// src/error.rs
//
// Application layers (LLM clients, agent, CLI, server) report errors through anyhow.
// Library layers define their own thiserror enums, which convert into this one via `?`.

pub type Result<T> = anyhow::Result<T>;
