//! Streaming chat relay with CORS for the embedding site

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures_util::{future, StreamExt};
use serde::Deserialize;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, error, warn};

use tablechat_agent::APOLOGY;
use tablechat_provider::{ChatParams, Message, Provider};
use tablechat_session::ChatMessage;

use crate::AppState;

/// Body of `POST /api/chat`
#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
}

/// `OPTIONS /api/chat`
pub(crate) async fn preflight<P: Provider>(State(state): State<Arc<AppState<P>>>) -> Response {
    let mut res = StatusCode::NO_CONTENT.into_response();
    let headers = res.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        state.allowed_origin.clone(),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    res
}

/// `POST /api/chat`: forward model text chunks as they arrive.
///
/// The whole response, including opening the upstream stream, is bounded by
/// `max_duration`.
pub(crate) async fn chat<P: Provider>(
    State(state): State<Arc<AppState<P>>>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Response {
    let deadline = Instant::now() + state.max_duration;

    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("Rejected relay request: {}", rejection.body_text());
            let res = (rejection.status(), rejection.body_text()).into_response();
            return with_origin(res, &state.allowed_origin);
        }
    };

    let orchestrator = &state.orchestrator;
    let params = ChatParams {
        model: orchestrator.model().to_string(),
        messages: req.messages.iter().map(Message::from).collect(),
        max_tokens: orchestrator.max_tokens(),
        temperature: orchestrator.temperature(),
        ..Default::default()
    };
    debug!("Relaying {} message(s) to {}", params.messages.len(), params.model);

    let stream = match timeout_at(deadline, orchestrator.provider().chat_stream(params)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            error!("Relay failed to start: {}", e);
            let res = (StatusCode::BAD_GATEWAY, APOLOGY).into_response();
            return with_origin(res, &state.allowed_origin);
        }
        Err(_) => {
            error!("Relay did not start within {:?}", state.max_duration);
            let res = (StatusCode::GATEWAY_TIMEOUT, APOLOGY).into_response();
            return with_origin(res, &state.allowed_origin);
        }
    };

    // Ends at the first upstream error or when the deadline passes
    let body = stream
        .take_until(sleep_until(deadline))
        .scan((), |_, chunk| {
            future::ready(match chunk {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("Relay stream ended early: {}", e);
                    None
                }
            })
        })
        .map(|text| Ok::<Bytes, Infallible>(Bytes::from(text)));

    let mut res = Response::new(Body::from_stream(body));
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    with_origin(res, &state.allowed_origin)
}

fn with_origin(mut res: Response, origin: &HeaderValue) -> Response {
    res.headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    res
}
