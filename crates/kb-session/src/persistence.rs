//! Durable storage capability for sessions.
//!
//! The [`SessionStore`](crate::SessionStore) depends only on this narrow
//! trait, so any backend that can insert, fetch and delete a session by
//! token can sit behind the cache.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::session::Session;

/// Trait for durable session backends.
///
/// Implementations report backend failures as
/// [`Error::StoreUnavailable`](crate::Error::StoreUnavailable). Absence is
/// not an error: `get_session` returns `Ok(None)` for an unknown token.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Persist a newly started session.
    async fn insert_session(&self, session: &Session) -> Result<()>;

    /// Load a session by token.
    async fn get_session(&self, token: &str) -> Result<Option<Session>>;

    /// Delete a session by token. Deleting an unknown token succeeds.
    async fn delete_session(&self, token: &str) -> Result<()>;
}

/// Process-local backend, for tests and single-node development.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionPersistence for InMemoryPersistence {
    async fn insert_session(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.sessions.write().remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryPersistence::new();
        let session = Session::new("tok-1", "alice", Duration::from_secs(60));

        store.insert_session(&session).await.unwrap();
        assert_eq!(store.len(), 1);

        let loaded = store.get_session("tok-1").await.unwrap();
        assert_eq!(loaded, Some(session));

        store.delete_session("tok-1").await.unwrap();
        assert!(store.get_session("tok-1").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_token_succeeds() {
        let store = InMemoryPersistence::new();
        assert!(store.delete_session("missing").await.is_ok());
    }
}
