//! Per-key serialization of session access.
//!
//! The engine must never run two dialogue turns for the same (tenant, user)
//! pair at once. The gate hands out at-most-one permit per key; a second
//! event for the same key waits until the first turn finishes. Distinct
//! keys never contend.

use bookline_core::{ChannelUserId, TenantId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type GateKey = (TenantId, ChannelUserId);

/// Keyed async mutex over (tenant, user) pairs.
#[derive(Debug, Default)]
pub struct SessionGate {
    locks: Mutex<HashMap<GateKey, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one dialogue turn; dropping it releases the key.
#[derive(Debug)]
pub struct SessionPermit {
    _guard: OwnedMutexGuard<()>,
}

impl SessionGate {
    /// Creates an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and takes the permit for one (tenant, user) key.
    pub async fn acquire(&self, tenant_id: TenantId, user_id: &ChannelUserId) -> SessionPermit {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            Arc::clone(
                locks
                    .entry((tenant_id, user_id.clone()))
                    .or_default(),
            )
        };
        SessionPermit {
            _guard: lock.lock_owned().await,
        }
    }

    /// Drops gate entries nobody is holding or waiting on. Advisory; safe
    /// because acquiring always goes through the map lock first. Returns
    /// how many entries were removed.
    pub fn compact(&self) -> usize {
        let mut locks = self.locks.lock().unwrap();
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn same_key_turns_are_serialized() {
        let gate = Arc::new(SessionGate::new());
        let tenant_id = TenantId::new();
        let user_id = ChannelUserId::new("Uabc");
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let gate = Arc::clone(&gate);
            let user_id = user_id.clone();
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _permit = gate.acquire(tenant_id, &user_id).await;
                log.lock().unwrap().push("first_in");
                tokio::time::sleep(Duration::from_millis(50)).await;
                log.lock().unwrap().push("first_out");
            })
        };

        // Give the first task time to take the permit.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = {
            let gate = Arc::clone(&gate);
            let user_id = user_id.clone();
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _permit = gate.acquire(tenant_id, &user_id).await;
                log.lock().unwrap().push("second_in");
            })
        };

        first.await.expect("first task");
        second.await.expect("second task");

        let log = log.lock().unwrap();
        assert_eq!(*log, vec!["first_in", "first_out", "second_in"]);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let gate = SessionGate::new();
        let tenant_id = TenantId::new();
        let alice = ChannelUserId::new("Ualice");
        let bob = ChannelUserId::new("Ubob");

        let _held = gate.acquire(tenant_id, &alice).await;

        let acquired = timeout(Duration::from_millis(100), gate.acquire(tenant_id, &bob)).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn compact_drops_idle_entries_only() {
        let gate = SessionGate::new();
        let tenant_id = TenantId::new();
        let alice = ChannelUserId::new("Ualice");
        let bob = ChannelUserId::new("Ubob");

        {
            let _permit = gate.acquire(tenant_id, &alice).await;
        }
        let _held = gate.acquire(tenant_id, &bob).await;

        assert_eq!(gate.compact(), 1);

        // The held key survives and still serializes.
        let blocked = timeout(Duration::from_millis(50), gate.acquire(tenant_id, &bob)).await;
        assert!(blocked.is_err());
    }
}
