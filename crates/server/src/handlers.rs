use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use tablechat_agent::ConversationResult;
use tablechat_airtable::Fields;
use tablechat_provider::Provider;
use tablechat_session::ChatMessage;

use crate::AppState;

pub(crate) async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Body of `POST /api/conversation`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationRequest {
    messages: Vec<ChatMessage>,
    #[serde(default)]
    page_type: String,
    record_id: String,
    #[serde(default)]
    fields: Fields,
}

/// Server action: one orchestrated turn over the posted history
pub(crate) async fn conversation<P: Provider>(
    State(state): State<Arc<AppState<P>>>,
    Json(req): Json<ConversationRequest>,
) -> Json<ConversationResult> {
    debug!(
        "Conversation action for {} with {} message(s)",
        req.record_id,
        req.messages.len()
    );

    let result = state
        .orchestrator
        .continue_conversation(&req.messages, &req.page_type, &req.record_id, &req.fields)
        .await;
    Json(result)
}
