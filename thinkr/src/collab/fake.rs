//! In-process collaborators for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Collaborators, Completion, Search, TextExtractor};
use crate::error::{CompletionError, ExtractionError, SearchError};
use crate::models::{Message, Role};

/// Replies "echo: <last user message>", or a title for title requests.
#[derive(Default)]
pub struct EchoCompletion {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<Vec<Message>>>,
    pub fail: bool,
}

#[async_trait]
impl Completion for EchoCompletion {
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.fail {
            return Err(CompletionError::Status {
                status: 429,
                body: "rate limited".to_string(),
            });
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str());

        if messages.first().is_some_and(|m| m.content.contains("chat title")) {
            Ok(format!("\"Title: {last_user}\"\n"))
        } else {
            Ok(format!("echo: {last_user}"))
        }
    }
}

/// Returns a fixed list of snippets.
pub struct FixedSearch(pub Vec<String>);

#[async_trait]
impl Search for FixedSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        Ok(self.0.iter().take(max_results).cloned().collect())
    }
}

/// Returns fixed text regardless of input.
pub struct FixedExtractor(pub String);

impl TextExtractor for FixedExtractor {
    fn extract_text(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
        Ok(self.0.clone())
    }
}

/// Collaborators backed by the fakes above.
pub fn collaborators(completion: Arc<EchoCompletion>) -> Collaborators {
    Collaborators {
        completion,
        search: Arc::new(FixedSearch(
            (1..=7).map(|i| format!("snippet {i}")).collect(),
        )),
        extractor: Arc::new(FixedExtractor("page text ".repeat(2000))),
    }
}
