//! Thinkr - chat with a hosted model from the terminal or a local HTTP API.
//!
//! Architecture:
//! - Conversations live in one JSON document (`store`)
//! - A `Session` holds the active selection and runs every user action
//! - The model, web search and PDF extraction are collaborators behind traits
//! - The CLI and the HTTP server are thin surfaces over the same session

mod cli;
mod collab;
mod config;
mod error;
mod models;
mod server;
mod session;
mod store;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep one-shot commands quiet unless RUST_LOG asks otherwise.
    let default_level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    execute(cli).await
}
