//! Cookie-aware session management.
//!
//! [`SessionManager`] binds the token-level [`SessionStore`] to the cookie
//! protocol: it reads the token from a request's [`CookieJar`] and records
//! cookie changes in the same jar for the response.

use std::sync::Arc;

use cookie::CookieJar;
use kb_session::{Error, Result, Session, SessionStore};
use tracing::{debug, info};

use crate::cookies::CookieConfig;

pub struct SessionManager {
    store: Arc<SessionStore>,
    cookies: CookieConfig,
}

impl SessionManager {
    pub fn new(store: Arc<SessionStore>, cookies: CookieConfig) -> Self {
        Self { store, cookies }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn cookies(&self) -> &CookieConfig {
        &self.cookies
    }

    /// The session token carried by the private cookie, if non-empty.
    pub fn token<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(&self.cookies.name)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
    }

    /// Whether the request carries a session cookie.
    ///
    /// Presence only; the token is not validated.
    pub fn has_session(&self, jar: &CookieJar) -> bool {
        self.token(jar).is_some()
    }

    /// Resolve the request's session.
    pub async fn get_session(&self, jar: &CookieJar) -> Result<Session> {
        let token = self.token(jar).ok_or(Error::NotFound)?;
        self.store.get_session(token).await
    }

    /// Start a session for `username`, or return the one the request already has.
    ///
    /// A cookie whose token no longer resolves is replaced by a fresh
    /// session. On success both cookies are added to `jar`.
    pub async fn session_start(&self, jar: &mut CookieJar, username: &str) -> Result<Session> {
        if self.has_session(jar) {
            match self.get_session(jar).await {
                Ok(existing) => return Ok(existing),
                Err(Error::NotFound) => debug!("Replacing stale session cookie"),
                Err(e) => return Err(e),
            }
        }

        let session = self.store.create_session(username).await?;
        jar.add(self.cookies.token_cookie(&session.token));
        jar.add(self.cookies.public_cookie(&session.username));

        info!(username = %session.username, "Session started");
        Ok(session)
    }

    /// Destroy the request's session and clear both cookies.
    ///
    /// Without a session cookie this is a no-op.
    pub async fn session_destroy(&self, jar: &mut CookieJar) -> Result<()> {
        let Some(token) = self.token(jar).map(str::to_owned) else {
            return Ok(());
        };

        self.store.destroy_session(&token).await?;
        jar.add(self.cookies.expired_token_cookie());
        jar.add(self.cookies.expired_public_cookie());

        info!("Session destroyed");
        Ok(())
    }
}
