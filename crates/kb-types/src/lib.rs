//! Shared collaborator traits for the knowledge base.
//!
//! Each trait is a narrow capability owned by the storage layer and consumed
//! by exactly one part of the server, so no consumer depends on more of the
//! storage surface than it uses.

pub mod credentials;
pub mod error;
pub mod roster;

pub use credentials::{CredentialVerifier, SharedCredentialVerifier};
pub use error::{LookupError, Result};
pub use roster::{InMemoryRoster, RosterLookup, SharedRosterLookup};
