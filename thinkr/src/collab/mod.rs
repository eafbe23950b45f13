//! External collaborators: hosted model, web search, PDF text extraction.
//!
//! Each is a trait so the session can be driven by fakes in tests.

mod completion;
#[cfg(test)]
pub mod fake;
mod pdf;
mod search;

use std::sync::Arc;

use async_trait::async_trait;

pub use completion::{ChatCompletionClient, CompletionOptions};
pub use pdf::PdfTextExtractor;
pub use search::DuckDuckGoSearch;

use crate::error::{CompletionError, ExtractionError, SearchError};
use crate::models::Message;

/// Produces one reply for an ordered list of role-tagged messages.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError>;
}

/// Returns result snippets for a free-text query.
#[async_trait]
pub trait Search: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError>;
}

/// Pulls plain text out of a document.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// The collaborators a session dispatches to.
#[derive(Clone)]
pub struct Collaborators {
    pub completion: Arc<dyn Completion>,
    pub search: Arc<dyn Search>,
    pub extractor: Arc<dyn TextExtractor>,
}
