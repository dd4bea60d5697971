//! Application state shared across handlers.

use std::sync::Arc;

use kb_session::SessionStore;
use kb_types::{SharedCredentialVerifier, SharedRosterLookup};

use crate::config::ServerConfig;
use crate::cookies::CookieConfig;
use crate::policy::PolicyEvaluator;
use crate::session::SessionManager;

/// Application state shared across all handlers.
///
/// Built once at startup; every field is ready to use.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Cookie-aware session manager.
    pub sessions: Arc<SessionManager>,

    /// Route guard evaluator.
    pub policy: Arc<PolicyEvaluator>,

    /// Membership rosters, for the roster routes.
    pub roster: SharedRosterLookup,

    /// Credential check for `POST /login`.
    pub credentials: SharedCredentialVerifier,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        store: Arc<SessionStore>,
        cookies: CookieConfig,
        roster: SharedRosterLookup,
        credentials: SharedCredentialVerifier,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(store, cookies));
        let policy = Arc::new(PolicyEvaluator::new(sessions.clone(), roster.clone()));
        Self {
            config: Arc::new(config),
            sessions,
            policy,
            roster,
            credentials,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
