//! Tests for the chat session controller

mod common;

use std::sync::Arc;

use common::{echo_updater, fields, scripted_provider, tool_call, MockProvider};
use serde_json::json;
use tablechat_agent::{ChatSession, Orchestrator, PageContext};
use tablechat_provider::ChatResponse;
use tablechat_session::{ChatMessage, ConversationStore, FileStore, MemoryStore};
use tempfile::TempDir;

fn page() -> PageContext {
    PageContext {
        page_type: "record".to_string(),
        record_id: "rec1".to_string(),
        fields: fields(&[("Name", "Current Name")]),
    }
}

#[tokio::test]
async fn test_submit_appends_and_persists() {
    let (provider, _calls) = scripted_provider(vec![
        ChatResponse::tool_calls(vec![tool_call(
            "call_1",
            "modifyRecord",
            json!({"recordId": "rec1", "tableName": "Contacts", "updates": {"Name": "Bob"}}),
        )]),
        ChatResponse::text("Done, renamed to Bob."),
    ]);
    let orchestrator = Arc::new(Orchestrator::new(provider, Arc::new(echo_updater()), "m"));
    let session = ChatSession::new(orchestrator, ConversationStore::new(MemoryStore::new()), page());

    let messages = session.submit("please rename to Bob").await.unwrap();
    assert_eq!(
        messages,
        vec![
            ChatMessage::user("please rename to Bob"),
            ChatMessage::assistant("Done, renamed to Bob."),
        ]
    );
    assert_eq!(session.history().await.unwrap(), messages);
}

#[tokio::test]
async fn test_blank_submit_is_ignored() {
    let mut provider = MockProvider::new();
    provider.expect_chat().never();
    let orchestrator = Arc::new(Orchestrator::new(provider, Arc::new(echo_updater()), "m"));
    let session = ChatSession::new(orchestrator, ConversationStore::new(MemoryStore::new()), page());

    assert!(session.submit("").await.unwrap().is_empty());
    assert!(session.submit("   \n").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_keeps_text_as_typed() {
    let (provider, calls) = scripted_provider(vec![ChatResponse::text("Noted.")]);
    let orchestrator = Arc::new(Orchestrator::new(provider, Arc::new(echo_updater()), "m"));
    let session = ChatSession::new(orchestrator, ConversationStore::new(MemoryStore::new()), page());

    let typed = "  set Seats to 3\n";
    let messages = session.submit(typed).await.unwrap();

    assert_eq!(messages[0], ChatMessage::user(typed));
    assert_eq!(session.history().await.unwrap()[0].content, typed);
    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].messages.last().unwrap().content.as_deref(), Some(typed));
}

#[tokio::test]
async fn test_history_grows_across_turns() {
    let (provider, calls) = scripted_provider(vec![
        ChatResponse::text("Hello!"),
        ChatResponse::text("The name is Current Name."),
    ]);
    let orchestrator = Arc::new(Orchestrator::new(provider, Arc::new(echo_updater()), "m"));
    let session = ChatSession::new(orchestrator, ConversationStore::new(MemoryStore::new()), page());

    session.submit("hi").await.unwrap();
    let messages = session.submit("what is the name?").await.unwrap();

    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2], ChatMessage::user("what is the name?"));
    assert_eq!(messages[3], ChatMessage::assistant("The name is Current Name."));

    // System prompt plus the three visible messages
    assert_eq!(calls.lock().unwrap()[1].messages.len(), 4);
}

#[tokio::test]
async fn test_submit_notifies_subscribers() {
    let (provider, _calls) = scripted_provider(vec![ChatResponse::text("Hello!")]);
    let orchestrator = Arc::new(Orchestrator::new(provider, Arc::new(echo_updater()), "m"));
    let session = ChatSession::new(orchestrator, ConversationStore::new(MemoryStore::new()), page());

    let mut changes = session.store().subscribe();
    session.submit("hi").await.unwrap();

    let snapshot = changes.recv().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1], ChatMessage::assistant("Hello!"));
}

#[tokio::test]
async fn test_failed_turn_is_persisted_with_apology() {
    let (provider, _calls) = scripted_provider(vec![]);
    let orchestrator = Arc::new(Orchestrator::new(provider, Arc::new(echo_updater()), "m"));
    let session = ChatSession::new(orchestrator, ConversationStore::new(MemoryStore::new()), page());

    let messages = session.submit("hi").await.unwrap();
    assert_eq!(messages[1], ChatMessage::assistant(tablechat_agent::APOLOGY));
    assert_eq!(session.history().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_reset_and_file_persistence() {
    let temp_dir = TempDir::new().unwrap();

    let (provider, _calls) = scripted_provider(vec![ChatResponse::text("Hello!")]);
    let orchestrator = Arc::new(Orchestrator::new(provider, Arc::new(echo_updater()), "m"));

    let session = ChatSession::new(
        orchestrator.clone(),
        ConversationStore::new(FileStore::new(temp_dir.path())),
        page(),
    );
    session.submit("hi").await.unwrap();

    // A new session over the same directory sees the conversation
    let reopened = ChatSession::new(
        orchestrator,
        ConversationStore::new(FileStore::new(temp_dir.path())),
        page(),
    );
    assert_eq!(reopened.history().await.unwrap().len(), 2);

    reopened.reset().await.unwrap();
    assert!(session.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_set_fields_updates_prompt() {
    let (provider, calls) = scripted_provider(vec![ChatResponse::text("ok")]);
    let orchestrator = Arc::new(Orchestrator::new(provider, Arc::new(echo_updater()), "m"));
    let mut session =
        ChatSession::new(orchestrator, ConversationStore::new(MemoryStore::new()), page());

    session.set_fields(fields(&[("Name", "Fresh Value")]));
    assert_eq!(session.page().record_id, "rec1");
    session.submit("hi").await.unwrap();

    let system = calls.lock().unwrap()[0].messages[0].content.clone().unwrap();
    assert!(system.contains("Fresh Value"));
}
