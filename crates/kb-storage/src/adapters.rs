//! Async collaborator implementations over [`SqliteStore`].
//!
//! Every call runs on the blocking pool so SQLite I/O and password hashing
//! never stall the runtime's worker threads.

use async_trait::async_trait;
use kb_session::{Session, SessionPersistence};
use kb_types::{CredentialVerifier, LookupError, RosterLookup};

use crate::error::{Result, StorageError};
use crate::store::SqliteStore;

impl SqliteStore {
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

fn unavailable(err: StorageError) -> kb_session::Error {
    kb_session::Error::StoreUnavailable(err.to_string())
}

fn lookup_failed(err: StorageError) -> LookupError {
    LookupError::Unavailable(err.to_string())
}

#[async_trait]
impl SessionPersistence for SqliteStore {
    async fn insert_session(&self, session: &Session) -> kb_session::Result<()> {
        let session = session.clone();
        self.blocking(move |s| s.insert_session(&session))
            .await
            .map_err(unavailable)
    }

    async fn get_session(&self, token: &str) -> kb_session::Result<Option<Session>> {
        let token = token.to_string();
        self.blocking(move |s| s.get_session(&token))
            .await
            .map_err(unavailable)
    }

    async fn delete_session(&self, token: &str) -> kb_session::Result<()> {
        let token = token.to_string();
        self.blocking(move |s| s.delete_session(&token))
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl RosterLookup for SqliteStore {
    async fn organization_members(
        &self,
        organization: &str,
        admins_only: bool,
    ) -> kb_types::Result<Vec<String>> {
        let organization = organization.to_string();
        self.blocking(move |s| s.organization_members(&organization, admins_only))
            .await
            .map_err(lookup_failed)
    }

    async fn team_members(
        &self,
        organization: &str,
        team: &str,
        admins_only: bool,
    ) -> kb_types::Result<Vec<String>> {
        let organization = organization.to_string();
        let team = team.to_string();
        self.blocking(move |s| s.team_members(&organization, &team, admins_only))
            .await
            .map_err(lookup_failed)
    }
}

#[async_trait]
impl CredentialVerifier for SqliteStore {
    async fn verify_credentials(&self, username: &str, password: &str) -> kb_types::Result<bool> {
        let username = username.to_string();
        let password = password.to_string();
        self.blocking(move |s| s.verify_credentials(&username, &password))
            .await
            .map_err(lookup_failed)
    }
}
