//! Shared mocks for agent tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;

use tablechat_airtable::{AirtableError, FieldValue, Fields, RecordUpdater};
use tablechat_provider::{ChatParams, ChatResponse, Provider, ProviderError, ToolCall};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

mock! {
    pub Updater {}

    #[async_trait]
    impl RecordUpdater for Updater {
        async fn update_record(
            &self,
            table_name: &str,
            record_id: &str,
            updates: Fields,
        ) -> Result<Fields, AirtableError>;
    }
}

/// Every `ChatParams` a scripted provider was called with
pub type Calls = Arc<Mutex<Vec<ChatParams>>>;

/// A provider that answers with `responses` in order and records each request
pub fn scripted_provider(responses: Vec<ChatResponse>) -> (MockProvider, Calls) {
    let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();

    let mut provider = MockProvider::new();
    provider
        .expect_default_model()
        .return_const("mock-model".to_string());
    provider.expect_is_configured().return_const(true);
    provider.expect_chat().returning(move |params| {
        recorded.lock().unwrap().push(params);
        queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ProviderError::InvalidResponse)
    });

    (provider, calls)
}

/// An updater that echoes the requested updates back
pub fn echo_updater() -> MockUpdater {
    let mut updater = MockUpdater::new();
    updater
        .expect_update_record()
        .returning(|_, _, updates| Ok(updates));
    updater
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

pub fn fields(pairs: &[(&str, &str)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
        .collect()
}
