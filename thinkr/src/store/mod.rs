//! Conversation persistence.
//!
//! The whole mapping is loaded at the start of every operation and rewritten
//! after every mutation. There is no partial update.

mod json_file;
#[cfg(test)]
mod memory;

pub use json_file::JsonFileStore;
#[cfg(test)]
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::Conversations;

/// Load/save access to the full conversation mapping.
pub trait ConversationStore: Send + Sync {
    /// Load every conversation. A store that was never written is empty.
    fn load(&self) -> Result<Conversations, StoreError>;

    /// Replace the stored mapping with `conversations`.
    fn save(&self, conversations: &Conversations) -> Result<(), StoreError>;
}
