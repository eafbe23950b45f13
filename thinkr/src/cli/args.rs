//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::server::DEFAULT_PORT;

/// Thinkr - chat with a hosted model, with PDF and web context
#[derive(Parser, Debug)]
#[command(name = "thinkr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Conversation store file (defaults to the user data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Model to use for completions
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a new conversation and make it active
    New,

    /// List conversations
    List,

    /// Make a conversation active
    Select {
        /// Conversation ID (a unique prefix is enough)
        id: String,
    },

    /// Rename a conversation
    Rename {
        /// Conversation ID (defaults to the active one)
        #[arg(long)]
        id: Option<String>,

        /// New title
        #[arg(trailing_var_arg = true)]
        title: Vec<String>,
    },

    /// Delete a conversation
    Delete {
        /// Conversation ID (defaults to the active one)
        id: Option<String>,
    },

    /// Show the messages of a conversation
    Show {
        /// Conversation ID (defaults to the active one)
        id: Option<String>,
    },

    /// Send a prompt to the active conversation
    Ask {
        /// Prompt text
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },

    /// Attach the text of a PDF to the active conversation
    Pdf {
        /// Path to the PDF file
        path: PathBuf,
    },

    /// Attach an image to the active conversation
    Image {
        /// Path to a PNG or JPEG file
        path: PathBuf,
    },

    /// Attach web search results to the active conversation
    Search {
        /// Search query
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },

    /// Interactive chat loop on the active conversation
    Chat,

    /// Serve the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}
