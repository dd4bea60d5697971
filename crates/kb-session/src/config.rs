//! Configuration for the session store.

use std::time::Duration;

/// Default maximum number of sessions to cache.
pub const DEFAULT_MAX_CACHED_SESSIONS: usize = 10_000;

/// Default session lifetime (one year, matching the cookie Max-Age).
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600 * 24 * 365);

/// Default upper bound on a single durable-store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a newly started session stays valid.
    pub lifetime: Duration,

    /// Maximum number of sessions to cache before LRU eviction.
    pub max_cached_sessions: usize,

    /// Timeout applied to every durable-store call.
    pub store_timeout: Duration,

    /// Reject and evict sessions whose `expires_on` has passed.
    ///
    /// When false, sessions live server-side until explicit logout and the
    /// cookie Max-Age is the only expiry.
    pub enforce_expiry: bool,

    /// Interval for the background sweep of expired cache entries.
    /// `None` disables the sweep; expired sessions are then only evicted on access.
    pub cleanup_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_LIFETIME,
            max_cached_sessions: DEFAULT_MAX_CACHED_SESSIONS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            enforce_expiry: true,
            cleanup_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session lifetime.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the maximum number of sessions to cache.
    pub fn with_max_cached_sessions(mut self, max: usize) -> Self {
        self.max_cached_sessions = max;
        self
    }

    /// Set the durable-store timeout.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Enable or disable server-side expiry.
    pub fn with_enforce_expiry(mut self, enabled: bool) -> Self {
        self.enforce_expiry = enabled;
        self
    }

    /// Set the cleanup interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Disable the background cleanup task.
    pub fn without_cleanup_task(mut self) -> Self {
        self.cleanup_interval = None;
        self
    }
}
