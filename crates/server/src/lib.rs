//! HTTP surface
//!
//! Chat page, the conversation server action and the streaming chat relay.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tracing::info;

use tablechat_agent::Orchestrator;
use tablechat_config::ServerConfig;
use tablechat_provider::Provider;

mod handlers;
mod relay;

pub use relay::RelayRequest;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid allowed origin: {0}")]
    InvalidOrigin(String),

    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Shared handler state
pub struct AppState<P: Provider> {
    pub orchestrator: Arc<Orchestrator<P>>,
    pub allowed_origin: HeaderValue,
    /// Upper bound on how long a relay response stays open
    pub max_duration: Duration,
}

impl<P: Provider> AppState<P> {
    pub fn new(orchestrator: Arc<Orchestrator<P>>, config: &ServerConfig) -> Result<Self> {
        let allowed_origin = HeaderValue::from_str(&config.allowed_origin)
            .map_err(|_| ServerError::InvalidOrigin(config.allowed_origin.clone()))?;

        Ok(Self {
            orchestrator,
            allowed_origin,
            max_duration: Duration::from_secs(config.max_duration_secs),
        })
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }
}

/// All routes over the given state
pub fn router<P: Provider + 'static>(state: Arc<AppState<P>>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/conversation", post(handlers::conversation::<P>))
        .route(
            "/api/chat",
            post(relay::chat::<P>).options(relay::preflight::<P>),
        )
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
}

/// Bind `addr` and serve until the process exits
pub async fn serve<P: Provider + 'static>(state: Arc<AppState<P>>, addr: &str) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("tablechat listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
