//! Membership roster capability used by the authorization guards.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;

/// Read-only access to organization and team membership.
///
/// An unknown organization or team yields an empty roster, not an error.
#[async_trait]
pub trait RosterLookup: Send + Sync {
    /// Usernames belonging to `organization`, restricted to admins if `admins_only`.
    async fn organization_members(
        &self,
        organization: &str,
        admins_only: bool,
    ) -> Result<Vec<String>>;

    /// Usernames belonging to `team` within `organization`, restricted to admins if `admins_only`.
    async fn team_members(
        &self,
        organization: &str,
        team: &str,
        admins_only: bool,
    ) -> Result<Vec<String>>;
}

/// Thread-safe shared roster lookup.
pub type SharedRosterLookup = Arc<dyn RosterLookup>;

#[derive(Debug, Default, Clone)]
struct Roster {
    members: BTreeSet<String>,
    admins: BTreeSet<String>,
}

impl Roster {
    /// Insert or update a member; the latest `admin` flag wins.
    fn add(&mut self, username: &str, admin: bool) {
        self.members.insert(username.to_string());
        if admin {
            self.admins.insert(username.to_string());
        } else {
            self.admins.remove(username);
        }
    }

    fn list(&self, admins_only: bool) -> Vec<String> {
        let set = if admins_only {
            &self.admins
        } else {
            &self.members
        };
        set.iter().cloned().collect()
    }
}

/// In-process roster, for tests and the in-memory storage backend.
///
/// Adding an admin also adds them as a member, so admins are always a subset
/// of members. Re-adding an existing member updates their admin flag.
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    organizations: RwLock<HashMap<String, Roster>>,
    teams: RwLock<HashMap<(String, String), Roster>>,
}

impl InMemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user to an organization.
    pub fn add_organization_member(&self, organization: &str, username: &str, admin: bool) {
        self.organizations
            .write()
            .entry(organization.to_string())
            .or_default()
            .add(username, admin);
    }

    /// Add a user to a team.
    pub fn add_team_member(&self, organization: &str, team: &str, username: &str, admin: bool) {
        self.teams
            .write()
            .entry((organization.to_string(), team.to_string()))
            .or_default()
            .add(username, admin);
    }

    /// Builder-style [`add_organization_member`](Self::add_organization_member).
    pub fn with_organization_member(self, organization: &str, username: &str, admin: bool) -> Self {
        self.add_organization_member(organization, username, admin);
        self
    }

    /// Builder-style [`add_team_member`](Self::add_team_member).
    pub fn with_team_member(self, organization: &str, team: &str, username: &str, admin: bool) -> Self {
        self.add_team_member(organization, team, username, admin);
        self
    }
}

#[async_trait]
impl RosterLookup for InMemoryRoster {
    async fn organization_members(
        &self,
        organization: &str,
        admins_only: bool,
    ) -> Result<Vec<String>> {
        Ok(self
            .organizations
            .read()
            .get(organization)
            .map(|r| r.list(admins_only))
            .unwrap_or_default())
    }

    async fn team_members(
        &self,
        organization: &str,
        team: &str,
        admins_only: bool,
    ) -> Result<Vec<String>> {
        Ok(self
            .teams
            .read()
            .get(&(organization.to_string(), team.to_string()))
            .map(|r| r.list(admins_only))
            .unwrap_or_default())
    }
}
