//! Postgres session store.
//!
//! Sessions are one JSONB document per (tenant, user) plus a version
//! column for compare-and-swap and an expiry timestamp. Expiry is enforced
//! in every read's WHERE clause; the periodic sweep only reclaims rows.

use super::decode_error;
use async_trait::async_trait;
use bookline_core::{ChannelUserId, TenantId};
use bookline_session::{Session, SessionError, SessionStore};
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};

#[derive(FromRow)]
struct SessionRow {
    data: serde_json::Value,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, sqlx::Error> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| decode_error("session document", &self.data.to_string(), e))
    }
}

fn storage_failed(e: impl std::fmt::Display) -> SessionError {
    SessionError::StorageFailed {
        reason: e.to_string(),
    }
}

/// Session store over Postgres.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a store over the connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(
        &self,
        tenant_id: TenantId,
        user_id: &ChannelUserId,
    ) -> Result<Option<Session>, SessionError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT data
            FROM sessions
            WHERE tenant_id = $1 AND user_id = $2 AND expires_at > now()
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        match row {
            Some(r) => Ok(Some(r.try_into_session().map_err(storage_failed)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, session: Session, ttl: Duration) -> Result<Session, SessionError> {
        let mut session = session;
        let found = session.version;
        session.version += 1;

        let data = serde_json::to_value(&session).map_err(storage_failed)?;
        let expires_at = Utc::now() + ttl;

        // The CAS: an existing live row only accepts the write when its
        // version matches; an expired row matches any incoming version.
        let written: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO sessions (tenant_id, user_id, data, version, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id, user_id) DO UPDATE
            SET data = EXCLUDED.data,
                version = EXCLUDED.version,
                expires_at = EXCLUDED.expires_at
            WHERE sessions.version = $6 OR sessions.expires_at <= now()
            RETURNING version
            "#,
        )
        .bind(session.tenant_id.to_string())
        .bind(session.user_id.as_str())
        .bind(&data)
        .bind(i64::try_from(session.version).map_err(storage_failed)?)
        .bind(expires_at)
        .bind(i64::try_from(found).map_err(storage_failed)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        if written.is_some() {
            return Ok(session);
        }

        let stored: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM sessions WHERE tenant_id = $1 AND user_id = $2")
                .bind(session.tenant_id.to_string())
                .bind(session.user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_failed)?;
        let expected = stored
            .map(|(v,)| u64::try_from(v).unwrap_or_default())
            .unwrap_or_default();
        Err(SessionError::VersionConflict { expected, found })
    }

    async fn clear(
        &self,
        tenant_id: TenantId,
        user_id: &ChannelUserId,
    ) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE tenant_id = $1 AND user_id = $2")
            .bind(tenant_id.to_string())
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_failed)?;
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(storage_failed)?;
        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }
}
