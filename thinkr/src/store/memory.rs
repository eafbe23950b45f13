//! In-memory store for tests.

use std::sync::Mutex;

use super::ConversationStore;
use crate::error::StoreError;
use crate::models::Conversations;

/// Keeps the mapping in memory and counts saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<(Conversations, usize)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `save` has been called.
    pub fn saves(&self) -> usize {
        self.inner.lock().unwrap().1
    }
}

impl ConversationStore for MemoryStore {
    fn load(&self) -> Result<Conversations, StoreError> {
        Ok(self.inner.lock().unwrap().0.clone())
    }

    fn save(&self, conversations: &Conversations) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.0 = conversations.clone();
        inner.1 += 1;
        Ok(())
    }
}
