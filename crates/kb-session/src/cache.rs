//! In-process session cache with LRU eviction.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::session::Session;

/// Thread-safe token → session cache.
///
/// The map lives behind a `parking_lot::Mutex` that is only held for the
/// duration of a single map operation, never across an `.await`. Entries are
/// inserted, overwritten or removed whole; a cached session is never mutated
/// in place.
///
/// A generation counter, bumped under the map lock by every invalidation,
/// lets a reader that fetched a session from the durable store refuse to
/// cache it if the session may have been destroyed in the meantime.
pub struct SessionCache {
    lru: Mutex<LruCache<String, Session>>,
    generation: AtomicU64,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SessionCache {
    /// Create a cache holding at most `capacity` sessions (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            lru: Mutex::new(LruCache::new(cap)),
            generation: AtomicU64::new(0),
            capacity: cap.get(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a session, marking it most recently used.
    pub fn get(&self, token: &str) -> Option<Session> {
        let found = self.lru.lock().get(token).cloned();
        match found {
            Some(session) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(session)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite a session.
    ///
    /// If the cache is at capacity the least recently used session is evicted.
    pub fn insert(&self, session: Session) {
        let token = session.token.clone();
        let mut lru = self.lru.lock();
        // push hands back the old entry on overwrite; only a different key is an eviction
        if let Some((evicted, _)) = lru.push(token.clone(), session)
            && evicted != token
        {
            debug!("Evicting LRU session to make room");
        }
        trace!(cache_size = lru.len(), "Session inserted into cache");
    }

    /// Current invalidation generation. Take it before a durable read and
    /// pass it to [`insert_if_current`](Self::insert_if_current).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Insert a session only if no invalidation happened since `generation`
    /// was taken. Returns whether the session was cached.
    pub fn insert_if_current(&self, session: Session, generation: u64) -> bool {
        let mut lru = self.lru.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            trace!("Skipping cache fill after concurrent invalidation");
            return false;
        }
        let token = session.token.clone();
        if let Some((evicted, _)) = lru.push(token.clone(), session)
            && evicted != token
        {
            debug!("Evicting LRU session to make room");
        }
        true
    }

    /// Remove a session, returning it if it was cached.
    pub fn remove(&self, token: &str) -> Option<Session> {
        self.lru.lock().pop(token)
    }

    /// Remove a session and bump the generation, so reads already in flight
    /// cannot put it back.
    pub fn invalidate(&self, token: &str) -> Option<Session> {
        let mut lru = self.lru.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        lru.pop(token)
    }

    /// Check if a session is cached, without touching LRU order.
    pub fn contains(&self, token: &str) -> bool {
        self.lru.lock().contains(token)
    }

    /// Get the current number of cached sessions.
    pub fn len(&self) -> usize {
        self.lru.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.lock().is_empty()
    }

    /// Remove every session that has expired at `now`. Returns the count removed.
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let mut lru = self.lru.lock();
        let expired: Vec<String> = lru
            .iter()
            .filter(|(_, session)| session.is_expired_at(now))
            .map(|(token, _)| token.clone())
            .collect();

        for token in &expired {
            lru.pop(token);
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "Cleaned up expired sessions");
        }

        expired.len()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached sessions.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Lookups served from the cache.
    pub hits: u64,

    /// Lookups that fell through to the durable store.
    pub misses: u64,
}
