//! Webhook-level error types.
//!
//! Everything the dialogue kernel can absorb is absorbed there; what
//! reaches this module is mapped to an HTTP status with a body that leaks
//! nothing about internals.

use crate::vault::VaultError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookline_dialogue::EngineError;
use std::fmt;

/// Errors produced while handling one webhook delivery.
#[derive(Debug)]
pub enum WebhookError {
    /// The tenant path segment is not a valid tenant id, or no such tenant
    /// has a channel connected.
    UnknownTenant { raw: String },
    /// The delivery's channel secret does not match the tenant's.
    BadSecret,
    /// The request body is not a valid event payload.
    InvalidPayload { reason: String },
    /// The credential vault failed.
    Vault { source: VaultError },
    /// The dialogue engine failed in a way it could not absorb.
    Engine { source: EngineError },
}

impl fmt::Display for WebhookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTenant { raw } => write!(f, "unknown tenant '{raw}'"),
            Self::BadSecret => write!(f, "channel secret mismatch"),
            Self::InvalidPayload { reason } => write!(f, "invalid event payload: {reason}"),
            Self::Vault { source } => write!(f, "vault failure: {source}"),
            Self::Engine { source } => write!(f, "engine failure: {source}"),
        }
    }
}

impl std::error::Error for WebhookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Vault { source } => Some(source),
            Self::Engine { source } => Some(source),
            _ => None,
        }
    }
}

impl From<VaultError> for WebhookError {
    fn from(source: VaultError) -> Self {
        Self::Vault { source }
    }
}

impl From<EngineError> for WebhookError {
    fn from(source: EngineError) -> Self {
        Self::Engine { source }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::UnknownTenant { .. } => (StatusCode::NOT_FOUND, "unknown tenant"),
            Self::BadSecret => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::InvalidPayload { .. } => (StatusCode::BAD_REQUEST, "invalid payload"),
            Self::Vault { .. } | Self::Engine { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        };
        tracing::warn!(error = %self, status = %status, "webhook request rejected");
        (status, body).into_response()
    }
}
