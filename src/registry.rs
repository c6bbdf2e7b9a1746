//! Session registry
//!
//! Process-wide set of live sessions, independent of room membership.
//! Used by the operator console to list and kick users.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::session::Session;
use crate::types::SessionId;

/// All connected sessions: SessionId -> Session
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session
    pub async fn register(&self, session: Arc<Session>) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.id, session);
        debug!("Total sessions: {}", sessions.len());
    }

    /// Remove a session
    ///
    /// Returns false if the session was already gone.
    pub async fn unregister(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.lock().await;
        let removed = sessions.remove(&id).is_some();
        debug!("Total sessions: {}", sessions.len());
        removed
    }

    /// All sessions with the given username
    pub async fn find(&self, username: &str) -> Vec<Arc<Session>> {
        let sessions = self.sessions.lock().await;
        let mut found: Vec<_> = sessions
            .values()
            .filter(|s| s.username == username)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.connected_at);
        found
    }

    /// Copy of all sessions, oldest connection first
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        let sessions = self.sessions.lock().await;
        let mut all: Vec<_> = sessions.values().cloned().collect();
        all.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        all
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(name: &str) -> Arc<Session> {
        Session::new(name, "test", tokio::io::sink())
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let registry = SessionRegistry::new();
        let alice = session("alice");

        registry.register(alice.clone()).await;
        assert_eq!(registry.len().await, 1);

        assert!(registry.unregister(alice.id).await);
        assert!(!registry.unregister(alice.id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_find_returns_duplicates() {
        let registry = SessionRegistry::new();
        let first = session("alice");
        let second = session("alice");
        registry.register(first.clone()).await;
        registry.register(second.clone()).await;
        registry.register(session("bob")).await;

        let found = registry.find("alice").await;
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|s| s.id == first.id));
        assert!(found.iter().any(|s| s.id == second.id));
        assert!(registry.find("carol").await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = SessionRegistry::new();
        let alice = session("alice");
        registry.register(alice.clone()).await;
        registry.register(session("bob")).await;

        let snapshot = registry.snapshot().await;
        registry.unregister(alice.id).await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].username, "alice");
        assert_eq!(registry.len().await, 1);
    }
}
