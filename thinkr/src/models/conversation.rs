//! Conversation model and the id-keyed mapping persisted by the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Title every conversation starts with.
pub const DEFAULT_TITLE: &str = "New Chat";

/// System message seeded into every new conversation.
pub const SEED_PROMPT: &str = "You are Thinkr, an ultra intelligent AI.";

/// All conversations, keyed by id.
///
/// Ids are `UUIDv7`, so key order is creation order.
pub type Conversations = BTreeMap<String, Conversation>;

/// Generate a conversation id (`UUIDv7`, time-ordered).
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}

/// Creation time encoded in a `UUIDv7` conversation id.
pub fn created_at(id: &str) -> Option<DateTime<Utc>> {
    let (secs, nanos) = Uuid::parse_str(id).ok()?.get_timestamp()?.to_unix();
    DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos)
}

/// A persisted chat thread. The id lives in the map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Display title.
    pub title: String,
    /// Ordered history; index 0 is always the seed system message.
    pub messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create a conversation with the default title and the seed system message.
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            messages: vec![Message::system(SEED_PROMPT)],
        }
    }

    /// Whether the title was never set.
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    /// Messages shown to the user (everything after the seed).
    pub fn display_messages(&self) -> &[Message] {
        self.messages.get(1..).unwrap_or_default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}
