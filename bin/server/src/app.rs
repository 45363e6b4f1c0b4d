//! Application state and router assembly.

use crate::channel::ChannelClient;
use crate::routes;
use crate::vault::SecretVault;
use axum::Router;
use axum::routing::{get, post};
use bookline_dialogue::DialogueEngine;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state behind every request handler.
#[derive(Clone)]
pub struct AppState {
    /// The dialogue engine, over whatever providers main wired up.
    pub engine: Arc<DialogueEngine>,
    /// Tenant channel credentials.
    pub vault: Arc<dyn SecretVault>,
    /// Outbound reply delivery.
    pub channel: ChannelClient,
}

/// Builds the webhook router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(routes::health))
        .route("/webhook/{tenant}", post(routes::webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
