//! Session storage.
//!
//! The store is the only shared mutable state the dialogue engine touches.
//! Reads treat expired sessions as absent, so a session left idle past its
//! TTL self-repairs on the next event without any sweeper involvement.
//! Writes are compare-and-swap on the session's version counter.

use crate::error::SessionError;
use crate::session::Session;
use async_trait::async_trait;
use bookline_core::{ChannelUserId, TenantId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Persistent session state keyed by (tenant, user).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Gets the live session for a user, if any. Expired sessions are
    /// reported as absent and may be deleted on the way out.
    async fn get(
        &self,
        tenant_id: TenantId,
        user_id: &ChannelUserId,
    ) -> Result<Option<Session>, SessionError>;

    /// Persists a session with a fresh TTL.
    ///
    /// The write succeeds only when `session.version` matches the stored
    /// version (a missing or expired stored session matches any incoming
    /// version). Returns the stored session with its version bumped; hold
    /// on to it for the next write.
    async fn put(&self, session: Session, ttl: Duration) -> Result<Session, SessionError>;

    /// Removes the session for a user. Removing an absent session is not an
    /// error.
    async fn clear(
        &self,
        tenant_id: TenantId,
        user_id: &ChannelUserId,
    ) -> Result<(), SessionError>;

    /// Deletes sessions that expired at or before `now`. Advisory cleanup;
    /// returns how many were removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError>;
}

#[derive(Debug, Clone)]
struct StoredSession {
    session: Session,
    expires_at: DateTime<Utc>,
}

/// In-memory session store for tests and local development.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<(TenantId, ChannelUserId), StoredSession>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clone for MemorySessionStore {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(
        &self,
        tenant_id: TenantId,
        user_id: &ChannelUserId,
    ) -> Result<Option<Session>, SessionError> {
        let key = (tenant_id, user_id.clone());
        let mut sessions = self.sessions.lock().unwrap();

        match sessions.get(&key) {
            Some(stored) if stored.expires_at <= Utc::now() => {
                sessions.remove(&key);
                Ok(None)
            }
            Some(stored) => Ok(Some(stored.session.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, session: Session, ttl: Duration) -> Result<Session, SessionError> {
        let key = (session.tenant_id, session.user_id.clone());
        let now = Utc::now();
        let mut sessions = self.sessions.lock().unwrap();

        if let Some(stored) = sessions.get(&key) {
            let live = stored.expires_at > now;
            if live && stored.session.version != session.version {
                return Err(SessionError::VersionConflict {
                    expected: stored.session.version,
                    found: session.version,
                });
            }
        }

        let mut session = session;
        session.version += 1;
        sessions.insert(
            key,
            StoredSession {
                session: session.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(session)
    }

    async fn clear(
        &self,
        tenant_id: TenantId,
        user_id: &ChannelUserId,
    ) -> Result<(), SessionError> {
        let key = (tenant_id, user_id.clone());
        self.sessions.lock().unwrap().remove(&key);
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, stored| stored.expires_at > now);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DialogueState;

    fn new_session() -> Session {
        Session::new(TenantId::new(), ChannelUserId::new("Uabc"))
    }

    #[tokio::test]
    async fn put_bumps_version_and_get_returns_it() {
        let store = MemorySessionStore::new();
        let session = new_session();
        let tenant_id = session.tenant_id;
        let user_id = session.user_id.clone();

        let stored = store
            .put(session, Duration::minutes(30))
            .await
            .expect("put");
        assert_eq!(stored.version, 1);

        let fetched = store.get(tenant_id, &user_id).await.expect("get");
        assert_eq!(fetched, Some(stored));
    }

    #[tokio::test]
    async fn absent_session_reads_as_none() {
        let store = MemorySessionStore::new();
        let fetched = store
            .get(TenantId::new(), &ChannelUserId::new("Unobody"))
            .await
            .expect("get");
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn expired_session_reads_as_absent() {
        let store = MemorySessionStore::new();
        let session = new_session();
        let tenant_id = session.tenant_id;
        let user_id = session.user_id.clone();

        store
            .put(session, Duration::zero())
            .await
            .expect("put");

        let fetched = store.get(tenant_id, &user_id).await.expect("get");
        assert!(fetched.is_none());

        // A fresh session can be written over the expired one.
        let fresh = Session::new(tenant_id, user_id.clone());
        let stored = store
            .put(fresh, Duration::minutes(30))
            .await
            .expect("put");
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn stale_version_write_is_refused() {
        let store = MemorySessionStore::new();
        let session = new_session();
        let ttl = Duration::minutes(30);

        // Two handlers read the same version.
        let first = store.put(session, ttl).await.expect("put");
        let mut from_a = first.clone();
        let mut from_b = first;

        from_a.state = DialogueState::BrowsingProducts;
        let _stored = store.put(from_a, ttl).await.expect("first write wins");

        from_b.state = DialogueState::BrowsingCoupons;
        let result = store.put(from_b, ttl).await;
        assert!(matches!(
            result,
            Err(SessionError::VersionConflict {
                expected: 2,
                found: 1
            })
        ));
    }

    #[tokio::test]
    async fn clear_removes_session() {
        let store = MemorySessionStore::new();
        let session = new_session();
        let tenant_id = session.tenant_id;
        let user_id = session.user_id.clone();

        store
            .put(session, Duration::minutes(30))
            .await
            .expect("put");
        store.clear(tenant_id, &user_id).await.expect("clear");

        let fetched = store.get(tenant_id, &user_id).await.expect("get");
        assert!(fetched.is_none());

        // Clearing again is fine.
        store.clear(tenant_id, &user_id).await.expect("clear");
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let store = MemorySessionStore::new();
        let expired = new_session();
        let live = new_session();
        let live_tenant = live.tenant_id;
        let live_user = live.user_id.clone();

        store.put(expired, Duration::zero()).await.expect("put");
        store
            .put(live, Duration::minutes(30))
            .await
            .expect("put");

        let removed = store.sweep_expired(Utc::now()).await.expect("sweep");
        assert_eq!(removed, 1);

        let fetched = store.get(live_tenant, &live_user).await.expect("get");
        assert!(fetched.is_some());
    }
}
