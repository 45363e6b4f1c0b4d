//! Tenant channel-credential vault.
//!
//! Each tenant connects its own messaging-channel account, so every tenant
//! has its own webhook secret and push-API access token. The vault is the
//! only component that sees them; how the backing store protects the
//! values at rest is the store's concern, not the callers'.

use async_trait::async_trait;
use bookline_core::TenantId;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// One tenant's channel credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCredentials {
    /// Shared secret presented by the channel on webhook delivery.
    pub webhook_secret: String,
    /// Bearer token for the channel's push API.
    pub access_token: String,
}

/// Vault access failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// The backing store failed.
    StorageFailed { reason: String },
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => {
                write!(f, "credential vault storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for VaultError {}

/// Read access to tenant channel credentials.
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Gets the channel credentials for a tenant, if the tenant exists and
    /// has a channel connected.
    async fn channel_credentials(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<ChannelCredentials>, VaultError>;
}

#[derive(FromRow)]
struct CredentialsRow {
    channel_webhook_secret: String,
    channel_access_token: String,
}

/// Vault backed by the tenants table.
pub struct PgVault {
    pool: PgPool,
}

impl PgVault {
    /// Creates a vault over the connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecretVault for PgVault {
    async fn channel_credentials(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<ChannelCredentials>, VaultError> {
        let row: Option<CredentialsRow> = sqlx::query_as(
            r#"
            SELECT channel_webhook_secret, channel_access_token
            FROM tenants
            WHERE id = $1 AND active
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VaultError::StorageFailed {
            reason: e.to_string(),
        })?;

        Ok(row.map(|r| ChannelCredentials {
            webhook_secret: r.channel_webhook_secret,
            access_token: r.channel_access_token,
        }))
    }
}

/// In-memory vault for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryVault {
    credentials: Arc<RwLock<HashMap<TenantId, ChannelCredentials>>>,
}

impl MemoryVault {
    /// Creates an empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores credentials for a tenant.
    pub fn put(&self, tenant_id: TenantId, credentials: ChannelCredentials) {
        self.credentials
            .write()
            .unwrap()
            .insert(tenant_id, credentials);
    }
}

impl Clone for MemoryVault {
    fn clone(&self) -> Self {
        Self {
            credentials: Arc::clone(&self.credentials),
        }
    }
}

#[async_trait]
impl SecretVault for MemoryVault {
    async fn channel_credentials(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<ChannelCredentials>, VaultError> {
        Ok(self.credentials.read().unwrap().get(&tenant_id).cloned())
    }
}
