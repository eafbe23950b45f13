//! Error types for each layer.
//!
//! Library code returns these; the CLI edge converts them to `anyhow` with context.

use std::path::PathBuf;

/// Failures loading or saving the conversation document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store at {path} is not a valid conversation document: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize conversations: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Failures talking to the hosted model endpoint.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

/// Failures fetching web search results.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search provider returned {0}")]
    Status(u16),
}

/// Failures extracting text from an uploaded document.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("could not extract text from PDF: {0}")]
    Pdf(String),
}

/// Failures of session-level operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("conversation not found: {0}")]
    NotFound(String),
    #[error("no active conversation")]
    NoActiveConversation,
    #[error("prompt cannot be empty")]
    EmptyPrompt,
    #[error("unsupported attachment: {0}")]
    UnsupportedAttachment(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Failures assembling runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing {0}: set it in the environment or a .env file")]
    MissingCredential(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("could not determine a data directory; pass --db")]
    NoDataDir,
}
