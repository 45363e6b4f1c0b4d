//! Webhook and health handlers.
//!
//! One webhook delivery may batch several channel events. Each event runs
//! as its own tokio task: the per-user session gate already serializes
//! turns for the same user, and events for different users should not wait
//! on each other.

use crate::app::AppState;
use crate::error::WebhookError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use bookline_core::{ChannelUserId, TenantId};
use bookline_dialogue::{ChannelEvent, EngineError, EventKind};
use chrono::Local;
use serde::Deserialize;
use std::str::FromStr;

/// Header the channel presents its shared secret in.
const SECRET_HEADER: &str = "x-channel-secret";

/// One event inside a webhook delivery.
#[derive(Debug, Deserialize)]
pub struct IncomingEvent {
    /// Channel-assigned end-user id.
    pub user_id: String,
    /// What happened, in the engine's event vocabulary.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The webhook request body.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    /// Events in delivery order.
    pub events: Vec<IncomingEvent>,
}

/// Liveness probe.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Receives a batch of channel events for one tenant.
pub async fn webhook(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<StatusCode, WebhookError> {
    let tenant_id =
        TenantId::from_str(&tenant).map_err(|_| WebhookError::UnknownTenant { raw: tenant.clone() })?;

    let credentials = state
        .vault
        .channel_credentials(tenant_id)
        .await?
        .ok_or(WebhookError::UnknownTenant { raw: tenant })?;

    let presented = headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::BadSecret)?;
    if presented != credentials.webhook_secret {
        return Err(WebhookError::BadSecret);
    }

    if payload.events.is_empty() {
        return Err(WebhookError::InvalidPayload {
            reason: "no events in delivery".to_string(),
        });
    }

    let mut turns = Vec::with_capacity(payload.events.len());
    for incoming in payload.events {
        let event = ChannelEvent {
            tenant_id,
            user_id: ChannelUserId::new(incoming.user_id),
            kind: incoming.kind,
        };
        let state = state.clone();
        let access_token = credentials.access_token.clone();
        turns.push(tokio::spawn(handle_one(state, access_token, event)));
    }

    let mut failure = None;
    for turn in turns {
        match turn.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => failure = Some(e),
            Err(e) => {
                tracing::error!(error = %e, "webhook event task panicked");
            }
        }
    }
    match failure {
        // A store failure means at least one turn was lost; a non-2xx lets
        // the channel redeliver the batch.
        Some(source) => Err(WebhookError::Engine { source }),
        None => Ok(StatusCode::OK),
    }
}

/// Runs one dialogue turn and delivers the reply. Delivery failures are
/// logged, never propagated: the turn already committed its state.
async fn handle_one(
    state: AppState,
    access_token: String,
    event: ChannelEvent,
) -> Result<(), EngineError> {
    let tenant_id = event.tenant_id;
    let user_id = event.user_id.clone();
    let now = Local::now().naive_local();

    let reply = state.engine.handle_event(event, now).await.map_err(|e| {
        tracing::error!(tenant_id = %tenant_id, error = %e, "dialogue turn failed");
        e
    })?;

    if let Err(e) = state.channel.push_reply(&access_token, &user_id, &reply).await {
        tracing::warn!(tenant_id = %tenant_id, error = %e, "reply delivery failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::channel::ChannelClient;
    use crate::config::ChannelConfig;
    use crate::vault::{ChannelCredentials, MemoryVault};
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use bookline_availability::{BookingSettings, MemorySettings};
    use bookline_catalog::{MemoryCatalog, ServiceItem};
    use bookline_dialogue::{DialogueEngine, EngineConfig};
    use bookline_ledger::{CommitService, MemoryDispatcher, MemoryLedger};
    use bookline_session::{MemorySessionStore, SessionGate, SessionStore};
    use bookline_staffing::MemoryStaffing;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Fixture {
        router: Router,
        store: MemorySessionStore,
        tenant_id: TenantId,
    }

    fn fixture() -> Fixture {
        let tenant_id = TenantId::new();

        let catalog = MemoryCatalog::new();
        catalog.add_service(ServiceItem::new(tenant_id, "Cut", 60, 4500));
        let staffing = MemoryStaffing::new();
        let settings = MemorySettings::new();
        settings.put(tenant_id, BookingSettings::default());
        let ledger = MemoryLedger::new();
        let dispatcher = MemoryDispatcher::new();
        let commit = Arc::new(CommitService::new(
            Arc::new(ledger.clone()),
            Arc::new(catalog.clone()),
            Arc::new(staffing.clone()),
            Arc::new(settings.clone()),
            Arc::new(dispatcher.clone()),
        ));

        let store = MemorySessionStore::new();
        let engine = Arc::new(DialogueEngine::new(
            Arc::new(store.clone()),
            Arc::new(SessionGate::new()),
            Arc::new(catalog),
            Arc::new(staffing),
            Arc::new(settings),
            Arc::new(ledger),
            commit,
            EngineConfig::default(),
        ));

        let vault = MemoryVault::new();
        vault.put(
            tenant_id,
            ChannelCredentials {
                webhook_secret: "whsec".to_string(),
                access_token: "token".to_string(),
            },
        );

        // Delivery target nothing listens on; push failures are logged,
        // not surfaced, so handlers still return 200.
        let channel = ChannelClient::new(&ChannelConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 1,
        })
        .expect("channel client");

        let router = app::router(app::AppState {
            engine,
            vault: Arc::new(vault),
            channel,
        });

        Fixture {
            router,
            store,
            tenant_id,
        }
    }

    fn request(tenant: &str, secret: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/webhook/{tenant}"))
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header(SECRET_HEADER, secret);
        }
        builder
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn follow_body(user: &str) -> serde_json::Value {
        json!({ "events": [ { "user_id": user, "kind": "follow" } ] })
    }

    #[tokio::test]
    async fn valid_delivery_runs_the_turn() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(request(
                &fx.tenant_id.to_string(),
                Some("whsec"),
                follow_body("Uabc"),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let session = fx
            .store
            .get(fx.tenant_id, &ChannelUserId::new("Uabc"))
            .await
            .expect("get");
        assert!(session.is_some());
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthorized() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(request(
                &fx.tenant_id.to_string(),
                Some("nope"),
                follow_body("Uabc"),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_secret_is_unauthorized() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(request(&fx.tenant_id.to_string(), None, follow_body("Uabc")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(request(
                &TenantId::new().to_string(),
                Some("whsec"),
                follow_body("Uabc"),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_tenant_segment_is_not_found() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(request("not-a-tenant", Some("whsec"), follow_body("Uabc")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_delivery_is_bad_request() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(request(
                &fx.tenant_id.to_string(),
                Some("whsec"),
                json!({ "events": [] }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let fx = fixture();
        let response = fx
            .router
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
