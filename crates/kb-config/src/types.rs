//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]                 # listener, CORS, request logging
//! [session]                # cookies, lifetime, cache sizing
//! [storage]                # durable backend
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3001";

/// Default name of the private (HttpOnly) token cookie.
pub const DEFAULT_COOKIE_NAME: &str = "knowledge_base";

/// Default name of the public (script-readable) username cookie.
pub const DEFAULT_PUBLIC_COOKIE_NAME: &str = "kb-public";

/// Default session lifetime: one year.
pub const DEFAULT_LIFETIME_SECS: u64 = 3600 * 24 * 365;

/// Default bound on cached sessions.
pub const DEFAULT_MAX_CACHED_SESSIONS: usize = 10_000;

/// Default bound on a single durable-store or roster call.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Default interval of the background expiry sweep.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Default SQLite database path.
pub const DEFAULT_DB_PATH: &str = "kb.db";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    pub server: Option<ServerConfig>,
    pub session: Option<SessionConfig>,
    pub storage: Option<StorageConfig>,
}

impl KbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections replace wholesale; fields missing from a present section
    /// take their defaults.
    pub fn merge(&mut self, other: KbConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
        if other.storage.is_some() {
            self.storage = other.storage;
        }
    }

    /// The server section, or defaults.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// The session section, or defaults.
    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// The storage section, or defaults.
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// Fill every absent section with its defaults, for display.
    pub fn resolved(&self) -> Self {
        Self {
            server: Some(self.server()),
            session: Some(self.session()),
            storage: Some(self.storage()),
        }
    }

    /// Reject values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        let server = self.server();
        server.bind_addr()?;

        let session = self.session();
        if session.cookie_name.is_empty() {
            return Err(invalid("session.cookie_name", "must not be empty"));
        }
        if session.public_cookie_name.is_empty() {
            return Err(invalid("session.public_cookie_name", "must not be empty"));
        }
        if session.cookie_name == session.public_cookie_name {
            return Err(invalid(
                "session.public_cookie_name",
                "must differ from session.cookie_name",
            ));
        }
        if session.lifetime_secs == 0 {
            return Err(invalid("session.lifetime_secs", "must be at least 1"));
        }
        if session.max_cached_sessions == 0 {
            return Err(invalid("session.max_cached_sessions", "must be at least 1"));
        }
        if session.store_timeout_ms == 0 {
            return Err(invalid("session.store_timeout_ms", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to, `host:port`.
    pub bind: String,
    /// Whether unauthenticated visitors may browse public questions.
    pub allow_public_questions: bool,
    /// Enable per-request logging.
    pub request_logging: bool,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            allow_public_questions: false,
            request_logging: true,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("server.bind", &e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session and cookie configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub public_cookie_name: String,
    /// Session and cookie lifetime in seconds.
    pub lifetime_secs: u64,
    pub max_cached_sessions: usize,
    pub store_timeout_ms: u64,
    /// Treat sessions past their expiry as absent.
    pub enforce_expiry: bool,
    /// Background sweep interval; `0` disables the sweep.
    pub cleanup_interval_secs: u64,
    /// Mark both cookies `Secure`.
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            public_cookie_name: DEFAULT_PUBLIC_COOKIE_NAME.to_string(),
            lifetime_secs: DEFAULT_LIFETIME_SECS,
            max_cached_sessions: DEFAULT_MAX_CACHED_SESSIONS,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            enforce_expiry: true,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            secure_cookies: false,
        }
    }
}

impl SessionConfig {
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Durable storage backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite database file at `storage.path`.
    #[default]
    Sqlite,
    /// In-memory SQLite; contents are lost on exit.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
