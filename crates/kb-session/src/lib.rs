//! Session store with an LRU cache in front of a durable backend.
//!
//! This crate provides the token-level half of cookie sessions:
//! - Cryptographically random, URL-safe session tokens
//! - A bounded in-process cache shared by every request
//! - Cache-aside reads through a [`SessionPersistence`] backend
//! - Server-side expiry of sessions past their `expires_on`
//!
//! # Example
//!
//! ```rust,ignore
//! use kb_session::{InMemoryPersistence, SessionConfig, SessionStore};
//!
//! let config = SessionConfig::default()
//!     .with_max_cached_sessions(1000)
//!     .with_lifetime(Duration::from_secs(3600));
//!
//! let store = SessionStore::new(config, Arc::new(InMemoryPersistence::new()));
//! let session = store.create_session("alice").await?;
//! ```

mod cache;
mod config;
mod error;
mod persistence;
mod session;
mod store;
mod token;

pub use cache::{CacheStats, SessionCache};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use persistence::{InMemoryPersistence, SessionPersistence};
pub use session::Session;
pub use store::SessionStore;
pub use token::{TOKEN_BYTES, generate_token};
