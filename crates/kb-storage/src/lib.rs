//! SQLite storage for the knowledge base.
//!
//! [`SqliteStore`] owns the `users`, `sessions`, `organizations` and `teams`
//! tables and implements the three narrow collaborator traits the server
//! consumes:
//!
//! - [`kb_session::SessionPersistence`] for the durable session tier
//! - [`kb_types::RosterLookup`] for the authorization guards
//! - [`kb_types::CredentialVerifier`] for the login route
//!
//! Passwords are stored as argon2 PHC strings.

mod adapters;
pub mod error;
pub mod password;
pub mod store;

pub use error::{Result, StorageError};
pub use store::SqliteStore;
