//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use kb_session::{
    Error, InMemoryPersistence, Result, Session, SessionConfig, SessionPersistence, SessionStore,
};
use kb_types::{CredentialVerifier, InMemoryRoster};

use crate::config::ServerConfig;
use crate::cookies::CookieConfig;
use crate::state::AppState;

/// Durable store double that counts inserts and can be switched offline.
#[derive(Default)]
pub(crate) struct CountingPersistence {
    inner: InMemoryPersistence,
    pub inserts: AtomicUsize,
    offline: AtomicBool,
}

impl CountingPersistence {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionPersistence for CountingPersistence {
    async fn insert_session(&self, session: &Session) -> Result<()> {
        self.check()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_session(session).await
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        self.check()?;
        self.inner.get_session(token).await
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.check()?;
        self.inner.delete_session(token).await
    }
}

/// Plaintext credential table.
#[derive(Default)]
pub(crate) struct StaticCredentials(HashMap<String, String>);

impl StaticCredentials {
    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.0.insert(username.to_string(), password.to_string());
        self
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify_credentials(&self, username: &str, password: &str) -> kb_types::Result<bool> {
        Ok(self.0.get(username).is_some_and(|p| p == password))
    }
}

pub(crate) struct TestState {
    pub state: AppState,
    pub persistence: Arc<CountingPersistence>,
}

/// State for the `acme` fixture: members {alice, bob}, admins {alice};
/// team `platform` with members {bob, carol}, admins {carol}.
/// Every user's password is `password`.
pub(crate) fn acme_state() -> TestState {
    let persistence = Arc::new(CountingPersistence::default());
    let store = Arc::new(SessionStore::new(
        SessionConfig::default().without_cleanup_task(),
        persistence.clone(),
    ));
    let roster = InMemoryRoster::new()
        .with_organization_member("acme", "alice", true)
        .with_organization_member("acme", "bob", false)
        .with_team_member("acme", "platform", "carol", true)
        .with_team_member("acme", "platform", "bob", false);
    let credentials = StaticCredentials::default()
        .with_user("alice", "password")
        .with_user("bob", "password")
        .with_user("carol", "password");

    let state = AppState::new(
        ServerConfig::default(),
        store,
        CookieConfig::default(),
        Arc::new(roster),
        Arc::new(credentials),
    );
    TestState { state, persistence }
}

/// A `Cookie` request header value carrying a fresh session for `username`.
pub(crate) async fn login_cookie(state: &AppState, username: &str) -> String {
    let session = state
        .sessions
        .store()
        .create_session(username)
        .await
        .unwrap();
    format!(
        "{}={}",
        state.sessions.cookies().name,
        session.token.replace('=', "%3D")
    )
}
