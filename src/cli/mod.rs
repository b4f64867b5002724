// src/cli/mod.rs
pub mod helper;
pub mod repl;

pub use repl::run_interactive;
