//! Cache-aside session store.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::cache::SessionCache;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::persistence::SessionPersistence;
use crate::session::Session;
use crate::token::generate_token;

/// Token-level session store.
///
/// Reads check the in-process [`SessionCache`] first and fall through to the
/// durable [`SessionPersistence`] on a miss, repopulating the cache with what
/// was found. Absent tokens are never cached, and a durable-store failure is
/// reported as [`Error::StoreUnavailable`], never as a hit or as
/// [`Error::NotFound`].
///
/// Two requests racing to populate the same token both write the same value,
/// so last-write-wins needs no extra locking. A durable read that overlaps a
/// destroy is still answered, but its result is not cached, so the token
/// stays destroyed for every later lookup.
pub struct SessionStore {
    cache: SessionCache,
    persistence: Arc<dyn SessionPersistence>,
    config: SessionConfig,
}

impl SessionStore {
    /// Create a store over the given durable backend.
    pub fn new(config: SessionConfig, persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            cache: SessionCache::new(config.max_cached_sessions),
            persistence,
            config,
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Access the in-process cache.
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Resolve a token to its session.
    pub async fn get_session(&self, token: &str) -> Result<Session> {
        if let Some(session) = self.cache.get(token) {
            if self.is_live(&session) {
                trace!(username = %session.username, "Session found in cache");
                return Ok(session);
            }

            debug!(username = %session.username, "Cached session expired, evicting");
            self.cache.remove(token);
            self.evict_durable(token).await;
            return Err(Error::NotFound);
        }

        debug!("Session cache miss, loading from durable store");

        let generation = self.cache.generation();
        match self.bounded(self.persistence.get_session(token)).await? {
            Some(session) if !self.is_live(&session) => {
                debug!(username = %session.username, "Stored session expired, evicting");
                self.evict_durable(token).await;
                Err(Error::NotFound)
            }
            Some(session) => {
                if !self.cache.insert_if_current(session.clone(), generation) {
                    debug!(username = %session.username, "Session destroyed during load, not caching");
                    return Ok(session);
                }
                debug!(
                    username = %session.username,
                    cache_size = self.cache.len(),
                    "Session loaded from durable store"
                );
                Ok(session)
            }
            None => Err(Error::NotFound),
        }
    }

    /// Mint a new session for `username`.
    ///
    /// The session is written to the durable store before it is cached, so a
    /// failed insert leaves no trace.
    pub async fn create_session(&self, username: &str) -> Result<Session> {
        let token = generate_token()?;
        let session = Session::new(token, username, self.config.lifetime);

        self.bounded(self.persistence.insert_session(&session))
            .await?;
        self.cache.insert(session.clone());

        debug!(username = %username, "Session created");
        Ok(session)
    }

    /// Remove a session from the cache and the durable store.
    ///
    /// The cache entry is dropped first; if the durable delete then fails the
    /// error is returned so the caller knows the token may still resolve.
    /// The cache is invalidated again once the delete settles, which discards
    /// any copy a concurrent read loaded while the delete was in flight.
    pub async fn destroy_session(&self, token: &str) -> Result<()> {
        if let Some(session) = self.cache.invalidate(token) {
            debug!(username = %session.username, "Session removed from cache");
        }

        let result = self.bounded(self.persistence.delete_session(token)).await;
        self.cache.invalidate(token);
        result
    }

    /// Evict expired sessions from the cache. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        if !self.config.enforce_expiry {
            return 0;
        }
        self.cache.cleanup_expired(Utc::now())
    }

    /// Spawn the periodic cache sweep, if configured.
    ///
    /// The task holds a weak reference and exits once the store is dropped.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let interval = self.config.cleanup_interval?;
        if !self.config.enforce_expiry {
            return None;
        }

        let store = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.cleanup_expired();
            }
        }))
    }

    fn is_live(&self, session: &Session) -> bool {
        !self.config.enforce_expiry || !session.is_expired()
    }

    /// Best-effort delete of an expired session from the durable store.
    async fn evict_durable(&self, token: &str) {
        if let Err(e) = self.bounded(self.persistence.delete_session(token)).await {
            warn!(error = %e, "Failed to delete expired session from durable store");
        }
    }

    /// Run a durable-store call under the configured timeout.
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::StoreUnavailable(format!(
                "durable store did not respond within {:?}",
                self.config.store_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryPersistence;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Persistence wrapper that counts calls and can be switched off.
    #[derive(Default)]
    struct CountingPersistence {
        inner: InMemoryPersistence,
        inserts: AtomicUsize,
        gets: AtomicUsize,
        deletes: AtomicUsize,
        offline: parking_lot::Mutex<bool>,
    }

    impl CountingPersistence {
        fn set_offline(&self, offline: bool) {
            *self.offline.lock() = offline;
        }

        fn check(&self) -> Result<()> {
            if *self.offline.lock() {
                return Err(Error::StoreUnavailable("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SessionPersistence for CountingPersistence {
        async fn insert_session(&self, session: &Session) -> Result<()> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.inner.insert_session(session).await
        }

        async fn get_session(&self, token: &str) -> Result<Option<Session>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.inner.get_session(token).await
        }

        async fn delete_session(&self, token: &str) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.inner.delete_session(token).await
        }
    }

    /// Persistence that never answers.
    struct HangingPersistence;

    #[async_trait]
    impl SessionPersistence for HangingPersistence {
        async fn insert_session(&self, _session: &Session) -> Result<()> {
            std::future::pending().await
        }

        async fn get_session(&self, _token: &str) -> Result<Option<Session>> {
            std::future::pending().await
        }

        async fn delete_session(&self, _token: &str) -> Result<()> {
            std::future::pending().await
        }
    }

    /// Persistence whose next read pauses after loading, until released.
    struct StallingReads {
        inner: InMemoryPersistence,
        stall: AtomicBool,
        loaded: Notify,
        release: Notify,
    }

    impl StallingReads {
        fn new() -> Self {
            Self {
                inner: InMemoryPersistence::new(),
                stall: AtomicBool::new(true),
                loaded: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl SessionPersistence for StallingReads {
        async fn insert_session(&self, session: &Session) -> Result<()> {
            self.inner.insert_session(session).await
        }

        async fn get_session(&self, token: &str) -> Result<Option<Session>> {
            let found = self.inner.get_session(token).await;
            if self.stall.swap(false, Ordering::SeqCst) {
                self.loaded.notify_one();
                self.release.notified().await;
            }
            found
        }

        async fn delete_session(&self, token: &str) -> Result<()> {
            self.inner.delete_session(token).await
        }
    }

    fn store_with(persistence: Arc<dyn SessionPersistence>) -> SessionStore {
        SessionStore::new(SessionConfig::new().without_cleanup_task(), persistence)
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let store = store_with(Arc::new(InMemoryPersistence::new()));

        for username in ["alice", "bob", "carol"] {
            let session = store.create_session(username).await.unwrap();
            let resolved = store.get_session(&session.token).await.unwrap();
            assert_eq!(resolved.username, username);
            assert_eq!(resolved, session);
        }
    }

    #[tokio::test]
    async fn test_unknown_token_not_found() {
        let persistence = Arc::new(CountingPersistence::default());
        let store = store_with(persistence.clone());

        let result = store.get_session("nonexistent").await;
        assert_eq!(result, Err(Error::NotFound));

        // Absence is not cached: a second lookup goes back to the store.
        let _ = store.get_session("nonexistent").await;
        assert_eq!(persistence.gets.load(Ordering::SeqCst), 2);
        assert!(store.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cache_miss_reads_through_once() {
        let persistence = Arc::new(CountingPersistence::default());
        let store = store_with(persistence.clone());

        let session = Session::new("stored-only", "alice", Duration::from_secs(3600));
        persistence.inner.insert_session(&session).await.unwrap();

        let first = store.get_session("stored-only").await.unwrap();
        let direct = persistence.inner.get_session("stored-only").await.unwrap();
        assert_eq!(Some(first.clone()), direct);
        assert_eq!(persistence.gets.load(Ordering::SeqCst), 1);

        let second = store.get_session("stored-only").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(persistence.gets.load(Ordering::SeqCst), 1);
        assert_eq!(store.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_destroy_is_terminal() {
        let persistence = Arc::new(CountingPersistence::default());
        let store = store_with(persistence.clone());

        let session = store.create_session("alice").await.unwrap();
        store.destroy_session(&session.token).await.unwrap();

        assert_eq!(store.get_session(&session.token).await, Err(Error::NotFound));
        assert!(persistence.inner.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_destroy_during_durable_read_stays_destroyed() {
        let persistence = Arc::new(StallingReads::new());
        let store = Arc::new(store_with(persistence.clone()));

        let session = Session::new("raced", "alice", Duration::from_secs(3600));
        persistence.inner.insert_session(&session).await.unwrap();

        let reader = {
            let store = store.clone();
            tokio::spawn(async move { store.get_session("raced").await })
        };

        // The read has its copy in hand; log out before it returns.
        persistence.loaded.notified().await;
        store.destroy_session("raced").await.unwrap();
        persistence.release.notify_one();

        assert_eq!(reader.await.unwrap(), Ok(session));
        assert!(!store.cache().contains("raced"));
        assert_eq!(store.get_session("raced").await, Err(Error::NotFound));
        assert!(persistence.inner.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_population() {
        let persistence = Arc::new(CountingPersistence::default());
        let store = Arc::new(store_with(persistence.clone()));

        let session = Session::new("shared", "alice", Duration::from_secs(3600));
        persistence.inner.insert_session(&session).await.unwrap();

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get_session("shared").await })
            })
            .collect();

        for task in tasks {
            let resolved = task.await.unwrap().unwrap();
            assert_eq!(resolved, session);
        }
        assert_eq!(store.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_store_outage_is_distinct_from_not_found() {
        let persistence = Arc::new(CountingPersistence::default());
        let store = store_with(persistence.clone());

        let cached = store.create_session("alice").await.unwrap();
        let uncached = Session::new("uncached", "bob", Duration::from_secs(3600));
        persistence.inner.insert_session(&uncached).await.unwrap();

        persistence.set_offline(true);

        // Already-cached sessions stay visible.
        assert_eq!(store.get_session(&cached.token).await.unwrap(), cached);

        let result = store.get_session("uncached").await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert!(!store.cache().contains("uncached"));
    }

    #[tokio::test]
    async fn test_failed_insert_is_not_cached() {
        let persistence = Arc::new(CountingPersistence::default());
        persistence.set_offline(true);
        let store = store_with(persistence.clone());

        let result = store.create_session("alice").await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert_eq!(persistence.inserts.load(Ordering::SeqCst), 1);
        assert!(store.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        let store = SessionStore::new(
            SessionConfig::new()
                .with_store_timeout(Duration::from_millis(50))
                .without_cleanup_task(),
            Arc::new(HangingPersistence),
        );

        let result = store.get_session("anything").await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted() {
        let persistence = Arc::new(CountingPersistence::default());
        let store = store_with(persistence.clone());

        let stale = Session::new("stale", "alice", Duration::ZERO);
        persistence.inner.insert_session(&stale).await.unwrap();
        store.cache().insert(stale);

        assert_eq!(store.get_session("stale").await, Err(Error::NotFound));
        assert!(!store.cache().contains("stale"));
        assert!(persistence.inner.is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_in_durable_store_is_not_cached() {
        let persistence = Arc::new(CountingPersistence::default());
        let store = store_with(persistence.clone());

        let stale = Session::new("stale", "alice", Duration::ZERO);
        persistence.inner.insert_session(&stale).await.unwrap();

        assert_eq!(store.get_session("stale").await, Err(Error::NotFound));
        assert!(store.cache().is_empty());
        assert_eq!(persistence.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiry_not_enforced_when_disabled() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = SessionStore::new(
            SessionConfig::new()
                .with_lifetime(Duration::ZERO)
                .with_enforce_expiry(false)
                .without_cleanup_task(),
            persistence,
        );

        let session = store.create_session("alice").await.unwrap();
        assert_eq!(store.get_session(&session.token).await.unwrap(), session);
        assert_eq!(store.cleanup_expired(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_expired_sweeps_cache() {
        let store = SessionStore::new(
            SessionConfig::new()
                .with_lifetime(Duration::ZERO)
                .without_cleanup_task(),
            Arc::new(InMemoryPersistence::new()),
        );

        store.create_session("alice").await.unwrap();
        store.create_session("bob").await.unwrap();
        assert_eq!(store.cache().len(), 2);

        assert_eq!(store.cleanup_expired(), 2);
        assert!(store.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_task_disabled_without_interval() {
        let store = Arc::new(store_with(Arc::new(InMemoryPersistence::new())));
        assert!(store.spawn_cleanup_task().is_none());
    }
}
