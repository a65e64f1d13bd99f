//! Persisted conversation with change notification

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::store::KeyValueStore;
use crate::{ChatMessage, Result};

/// Key the conversation is stored under
pub const CONVERSATION_KEY: &str = "conversation";

const CHANGE_CAPACITY: usize = 16;

/// Conversation history kept in a key/value store.
///
/// Every successful write is broadcast to subscribers as a full snapshot.
pub struct ConversationStore<S: KeyValueStore> {
    store: S,
    key: String,
    changes: broadcast::Sender<Vec<ChatMessage>>,
}

impl<S: KeyValueStore> ConversationStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, CONVERSATION_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            store,
            key: key.into(),
            changes,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored history; a missing or unreadable value is an empty history
    pub async fn load(&self) -> Result<Vec<ChatMessage>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => {
                debug!("Loaded {} message(s) from '{}'", messages.len(), self.key);
                Ok(messages)
            }
            Err(e) => {
                warn!("Discarding unreadable conversation '{}': {}", self.key, e);
                Ok(Vec::new())
            }
        }
    }

    /// Replace the stored history and notify subscribers
    pub async fn save(&self, messages: &[ChatMessage]) -> Result<()> {
        let raw = serde_json::to_string(messages)?;
        self.store.set(&self.key, raw).await?;
        self.notify(messages.to_vec());
        Ok(())
    }

    /// Drop the stored history and notify subscribers with an empty snapshot
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(&self.key).await?;
        self.notify(Vec::new());
        Ok(())
    }

    /// Register for snapshots written after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<ChatMessage>> {
        self.changes.subscribe()
    }

    fn notify(&self, snapshot: Vec<ChatMessage>) {
        // No subscribers is not an error
        let receivers = self.changes.send(snapshot).unwrap_or(0);
        debug!("Conversation '{}' changed, {} subscriber(s)", self.key, receivers);
    }
}
