//! Per-session state of a password reset, keyed by an opaque session id.

use std::collections::HashMap;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    /// A code was sent; waiting for the user to enter it.
    Issued,
    /// The code matched; a new password may be set once.
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetSession {
    pub user_id: Uuid,
    pub email: String,
    pub step: ResetStep,
    pub started_at: OffsetDateTime,
}

#[async_trait]
pub trait ResetSessionStore: Send + Sync {
    async fn put(&self, id: Uuid, session: ResetSession);
    async fn get(&self, id: Uuid, now: OffsetDateTime) -> Option<ResetSession>;
    /// Moves an `Issued` session to `Verified`. Returns false if the session is gone.
    async fn mark_verified(&self, id: Uuid, now: OffsetDateTime) -> bool;
    /// Removes and returns the session only if it is `Verified`.
    async fn take_verified(&self, id: Uuid, now: OffsetDateTime) -> Option<ResetSession>;
    async fn remove(&self, id: Uuid) -> Option<ResetSession>;
}

/// Process-local session store. Entries older than `ttl` behave as absent.
pub struct InMemoryResetSessions {
    ttl: Duration,
    inner: Mutex<HashMap<Uuid, ResetSession>>,
}

impl InMemoryResetSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn live(&self, session: &ResetSession, now: OffsetDateTime) -> bool {
        now - session.started_at < self.ttl
    }
}

#[async_trait]
impl ResetSessionStore for InMemoryResetSessions {
    async fn put(&self, id: Uuid, session: ResetSession) {
        let mut map = self.inner.lock().await;
        let now = session.started_at;
        map.retain(|_, s| self.live(s, now));
        map.insert(id, session);
    }

    async fn get(&self, id: Uuid, now: OffsetDateTime) -> Option<ResetSession> {
        let map = self.inner.lock().await;
        map.get(&id).filter(|s| self.live(s, now)).cloned()
    }

    async fn mark_verified(&self, id: Uuid, now: OffsetDateTime) -> bool {
        let mut map = self.inner.lock().await;
        match map.get_mut(&id) {
            Some(s) if self.live(s, now) => {
                s.step = ResetStep::Verified;
                true
            }
            _ => false,
        }
    }

    async fn take_verified(&self, id: Uuid, now: OffsetDateTime) -> Option<ResetSession> {
        let mut map = self.inner.lock().await;
        let ready = map
            .get(&id)
            .map(|s| s.step == ResetStep::Verified && self.live(s, now))
            .unwrap_or(false);
        if ready {
            map.remove(&id)
        } else {
            None
        }
    }

    async fn remove(&self, id: Uuid) -> Option<ResetSession> {
        self.inner.lock().await.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(started_at: OffsetDateTime) -> ResetSession {
        ResetSession {
            user_id: Uuid::new_v4(),
            email: "a@b.test".into(),
            step: ResetStep::Issued,
            started_at,
        }
    }

    #[tokio::test]
    async fn verified_session_can_be_taken_once() {
        let store = InMemoryResetSessions::new(Duration::minutes(30));
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        store.put(id, session(now)).await;

        assert!(store.take_verified(id, now).await.is_none());
        assert!(store.mark_verified(id, now).await);
        assert_eq!(store.get(id, now).await.unwrap().step, ResetStep::Verified);
        assert!(store.take_verified(id, now).await.is_some());
        assert!(store.take_verified(id, now).await.is_none());
        assert!(store.get(id, now).await.is_none());
    }

    #[tokio::test]
    async fn stale_sessions_are_absent() {
        let store = InMemoryResetSessions::new(Duration::minutes(30));
        let t0 = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        store.put(id, session(t0)).await;

        let later = t0 + Duration::minutes(31);
        assert!(store.get(id, later).await.is_none());
        assert!(!store.mark_verified(id, later).await);

        // a later put sweeps it out entirely
        store.put(Uuid::new_v4(), session(later)).await;
        assert!(store.remove(id).await.is_none());
    }
}
