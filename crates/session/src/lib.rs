//! Conversation state
//!
//! Chat messages and their persistence in a pluggable key/value store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod conversation;
pub mod store;

pub use conversation::{ConversationStore, CONVERSATION_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Store errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of the visible conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for tablechat_provider::Message {
    fn from(msg: &ChatMessage) -> Self {
        match msg.role {
            Role::User => tablechat_provider::Message::user(&msg.content),
            Role::Assistant => tablechat_provider::Message::assistant(&msg.content),
        }
    }
}
