//! Chat controller for one record page

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use tablechat_airtable::Fields;
use tablechat_provider::Provider;
use tablechat_session::{ChatMessage, ConversationStore, KeyValueStore};

use crate::orchestrator::Orchestrator;
use crate::Result;

/// The record the chat is attached to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub page_type: String,
    pub record_id: String,
    #[serde(default)]
    pub fields: Fields,
}

/// Persisted conversation bound to a page
pub struct ChatSession<P: Provider, S: KeyValueStore> {
    orchestrator: Arc<Orchestrator<P>>,
    store: ConversationStore<S>,
    page: PageContext,
}

impl<P: Provider, S: KeyValueStore> ChatSession<P, S> {
    pub fn new(
        orchestrator: Arc<Orchestrator<P>>,
        store: ConversationStore<S>,
        page: PageContext,
    ) -> Self {
        Self {
            orchestrator,
            store,
            page,
        }
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    /// Replace the record fields shown to the model
    pub fn set_fields(&mut self, fields: Fields) {
        self.page.fields = fields;
    }

    pub fn store(&self) -> &ConversationStore<S> {
        &self.store
    }

    pub async fn history(&self) -> Result<Vec<ChatMessage>> {
        Ok(self.store.load().await?)
    }

    /// Send a user message and persist the resulting history.
    ///
    /// Blank input leaves the conversation untouched.
    pub async fn submit(&self, text: &str) -> Result<Vec<ChatMessage>> {
        if text.trim().is_empty() {
            return self.history().await;
        }

        let mut history = self.store.load().await?;
        history.push(ChatMessage::user(text));

        let result = self
            .orchestrator
            .continue_conversation(
                &history,
                &self.page.page_type,
                &self.page.record_id,
                &self.page.fields,
            )
            .await;

        self.store.save(&result.messages).await?;
        Ok(result.messages)
    }

    pub async fn reset(&self) -> Result<()> {
        self.store.clear().await?;
        info!("Conversation for {} cleared", self.page.record_id);
        Ok(())
    }
}
