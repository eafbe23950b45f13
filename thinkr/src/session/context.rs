//! Context-window policy for completion requests.
//!
//! Stored history is never truncated; only the slice sent to the model is.

use crate::models::{Message, Role};

/// Bounds on the history sent with each completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    /// Maximum total content characters, excluding the leading system seed.
    pub max_chars: usize,
    /// Maximum number of messages, excluding the leading system seed.
    pub max_messages: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            max_chars: 24_000,
            max_messages: 40,
        }
    }
}

impl ContextWindow {
    /// Select the messages to send: the system seed plus the newest suffix
    /// that fits both budgets. The newest message is always included.
    pub fn select(&self, messages: &[Message]) -> Vec<Message> {
        let (seed, rest) = match messages.split_first() {
            Some((first, rest)) if first.role == Role::System => (Some(first), rest),
            _ => (None, messages),
        };

        let mut chars = 0;
        let mut keep = 0;
        for msg in rest.iter().rev() {
            let len = msg.char_len();
            let fits = keep < self.max_messages && chars + len <= self.max_chars;
            if keep > 0 && !fits {
                break;
            }
            chars += len;
            keep += 1;
        }

        let dropped = rest.len() - keep;
        if dropped > 0 {
            tracing::debug!(dropped, kept = keep, chars, "context window trimmed history");
        }

        seed.into_iter()
            .chain(&rest[dropped..])
            .cloned()
            .collect()
    }
}
