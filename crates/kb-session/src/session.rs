use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A logged-in user's session, identified by an opaque token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Session {
    #[serde(rename = "sid")]
    pub token: String,
    pub username: String,
    pub created_on: DateTime<Utc>,
    pub expires_on: DateTime<Utc>,
}

impl Session {
    /// Build a session starting now and valid for `lifetime`.
    pub fn new(token: impl Into<String>, username: impl Into<String>, lifetime: Duration) -> Self {
        let created_on = Utc::now();
        let expires_on = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|d| created_on.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            token: token.into(),
            username: username.into(),
            created_on,
            expires_on,
        }
    }

    /// Whether the session has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_on
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
