//! Data models for thinkr entities.

mod conversation;
mod message;

pub use conversation::{
    created_at, generate_id, Conversation, Conversations, DEFAULT_TITLE, SEED_PROMPT,
};
pub use message::{Message, Role, PDF_LABEL, WEB_LABEL};
