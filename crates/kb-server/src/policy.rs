//! Authorization policy evaluation.
//!
//! One algorithm backs every guard:
//! 1. identify the entity from the path parameters
//! 2. resolve the caller's session
//! 3. fetch the entity's roster, admins only when required
//! 4. allow if the caller is on the roster
//!
//! `LoggedIn` stops after step 2; `IsUser` replaces steps 3-4 with a
//! comparison against the `{username}` path parameter.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cookie::CookieJar;
use kb_session::Session;
use kb_types::SharedRosterLookup;
use tracing::debug;

use crate::session::SessionManager;

/// Path parameter naming an organization.
pub const ORGANIZATION_PARAM: &str = "organization";

/// Older spelling of [`ORGANIZATION_PARAM`] still used by some routes.
pub const LEGACY_ORGANIZATION_PARAM: &str = "org";

/// Path parameter naming a team within an organization.
pub const TEAM_PARAM: &str = "team";

/// Path parameter naming a user.
pub const USERNAME_PARAM: &str = "username";

/// Generic denial message.
pub const UNAUTHORIZED_MESSAGE: &str = "unauthorized";

/// Denial message for requests without a usable session.
pub const LOGIN_REQUIRED_MESSAGE: &str = "must be logged in to perform this action";

/// Which roster a membership check consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterScope {
    Organization,
    Team,
}

impl RosterScope {
    fn noun(self) -> &'static str {
        match self {
            RosterScope::Organization => "organization",
            RosterScope::Team => "team",
        }
    }
}

/// Role a membership check demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Member,
    Admin,
}

impl Requirement {
    fn admins_only(self) -> bool {
        matches!(self, Requirement::Admin)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Member => write!(f, "member"),
            Requirement::Admin => write!(f, "admin"),
        }
    }
}

/// The check a route is guarded by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    LoggedIn,
    IsUser,
    Membership {
        scope: RosterScope,
        requirement: Requirement,
    },
}

impl Guard {
    pub const ORG_MEMBER: Guard = Guard::Membership {
        scope: RosterScope::Organization,
        requirement: Requirement::Member,
    };
    pub const ORG_ADMIN: Guard = Guard::Membership {
        scope: RosterScope::Organization,
        requirement: Requirement::Admin,
    };
    pub const TEAM_MEMBER: Guard = Guard::Membership {
        scope: RosterScope::Team,
        requirement: Requirement::Member,
    };
    pub const TEAM_ADMIN: Guard = Guard::Membership {
        scope: RosterScope::Team,
        requirement: Requirement::Admin,
    };
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Caller is not allowed; the message is safe to show.
    Unauthorized(String),
    /// A lookup failed; the detail is for logs only.
    Internal(String),
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Session),
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Decision::Deny(Denial::Unauthorized(message.into()))
    }
}

/// Evaluates route guards against sessions and membership rosters.
pub struct PolicyEvaluator {
    sessions: Arc<SessionManager>,
    roster: SharedRosterLookup,
    lookup_timeout: Duration,
}

impl PolicyEvaluator {
    pub fn new(sessions: Arc<SessionManager>, roster: SharedRosterLookup) -> Self {
        let lookup_timeout = sessions.store().config().store_timeout;
        Self {
            sessions,
            roster,
            lookup_timeout,
        }
    }

    /// Bound roster lookups by `timeout` instead of the session store's timeout.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub async fn evaluate(
        &self,
        guard: Guard,
        jar: &CookieJar,
        params: &HashMap<String, String>,
    ) -> Decision {
        match guard {
            Guard::LoggedIn => self.logged_in(jar).await,
            Guard::IsUser => self.is_user(jar, params).await,
            Guard::Membership { scope, requirement } => {
                self.assert_member(jar, params, scope, requirement).await
            }
        }
    }

    /// Allow any request with a valid session.
    pub async fn logged_in(&self, jar: &CookieJar) -> Decision {
        match self.resolve(jar, UNAUTHORIZED_MESSAGE).await {
            Ok(session) => Decision::Allow(session),
            Err(denial) => Decision::Deny(denial),
        }
    }

    /// Allow only the user named by the `{username}` path parameter.
    pub async fn is_user(&self, jar: &CookieJar, params: &HashMap<String, String>) -> Decision {
        let Some(username) = params.get(USERNAME_PARAM) else {
            return Decision::unauthorized(UNAUTHORIZED_MESSAGE);
        };

        let session = match self.resolve(jar, LOGIN_REQUIRED_MESSAGE).await {
            Ok(session) => session,
            Err(denial) => return Decision::Deny(denial),
        };

        if &session.username == username {
            Decision::Allow(session)
        } else {
            debug!(caller = %session.username, target = %username, "Identity mismatch");
            Decision::unauthorized(UNAUTHORIZED_MESSAGE)
        }
    }

    /// Allow callers on the roster of the organization or team in the path.
    pub async fn assert_member(
        &self,
        jar: &CookieJar,
        params: &HashMap<String, String>,
        scope: RosterScope,
        requirement: Requirement,
    ) -> Decision {
        let organization = params
            .get(ORGANIZATION_PARAM)
            .or_else(|| params.get(LEGACY_ORGANIZATION_PARAM));
        let Some(organization) = organization else {
            return Decision::unauthorized(UNAUTHORIZED_MESSAGE);
        };
        let team = match scope {
            RosterScope::Organization => None,
            RosterScope::Team => match params.get(TEAM_PARAM) {
                Some(team) => Some(team),
                None => return Decision::unauthorized(UNAUTHORIZED_MESSAGE),
            },
        };

        let session = match self.resolve(jar, LOGIN_REQUIRED_MESSAGE).await {
            Ok(session) => session,
            Err(denial) => return Decision::Deny(denial),
        };

        let admins_only = requirement.admins_only();
        let lookup = async {
            match team {
                Some(team) => {
                    self.roster
                        .team_members(organization, team, admins_only)
                        .await
                }
                None => {
                    self.roster
                        .organization_members(organization, admins_only)
                        .await
                }
            }
        };
        let roster = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(roster)) => roster,
            Ok(Err(e)) => return Decision::Deny(Denial::Internal(e.to_string())),
            Err(_) => {
                return Decision::Deny(Denial::Internal(format!(
                    "roster lookup timed out after {:?}",
                    self.lookup_timeout
                )));
            }
        };

        if roster.iter().any(|member| member == &session.username) {
            return Decision::Allow(session);
        }

        let entity = team.unwrap_or(organization);
        debug!(
            caller = %session.username,
            entity = %entity,
            scope = scope.noun(),
            %requirement,
            "Caller not on roster"
        );
        Decision::unauthorized(format!(
            "you must be a {requirement} of the {entity} {} to perform this action",
            scope.noun()
        ))
    }

    /// Resolve the session; `NotFound` becomes `Unauthorized(not_found_message)`.
    async fn resolve(&self, jar: &CookieJar, not_found_message: &str) -> Result<Session, Denial> {
        match self.sessions.get_session(jar).await {
            Ok(session) => Ok(session),
            Err(e) if e.is_not_found() => Err(Denial::Unauthorized(not_found_message.to_string())),
            Err(e) => Err(Denial::Internal(e.to_string())),
        }
    }
}
