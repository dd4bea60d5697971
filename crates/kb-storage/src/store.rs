use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kb_session::Session;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::password;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Thin repository over SQLite for users, sessions and membership rosters.
///
/// Cloning is cheap; clones share one connection behind a non-poisoning
/// mutex, which lets async callers move a handle into `spawn_blocking`.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let store = Self::from_connection(conn)?;
        info!("Storage opened at {:?}", path);
        Ok(store)
    }

    /// Open an in-memory database. Contents are lost on drop.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let store = Self::from_connection(conn)?;
        debug!("In-memory storage created");
        Ok(store)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        embedded::migrations::runner()
            .run(&mut conn)
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    // ── Users ───────────────────────────────────────────────────────

    /// Create a user with an argon2-hashed password.
    pub fn create_user(&self, username: &str, password: &str) -> Result<()> {
        let hash = password::hash_password(password)?;
        self.conn()
            .execute(
                "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
                params![username, hash, Utc::now().to_rfc3339()],
            )
            .map_err(|e| StorageError::from_constraint(e, format!("user {username}")))?;
        debug!(username, "User created");
        Ok(())
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE username = ?1",
                params![username],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Check a username/password pair. Unknown users verify as `false`.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<bool> {
        let hash: Option<String> = self
            .conn()
            .query_row(
                "SELECT password_hash FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;

        // The connection lock is released before the deliberately slow hash check.
        Ok(hash.is_some_and(|h| password::verify_password(&h, password)))
    }

    // ── Sessions ────────────────────────────────────────────────────

    pub fn insert_session(&self, session: &Session) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO sessions (token, username, created_on, expires_on)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    session.token,
                    session.username,
                    session.created_on.timestamp_millis(),
                    session.expires_on.timestamp_millis(),
                ],
            )
            .map_err(|e| {
                StorageError::from_constraint(e, format!("session for {}", session.username))
            })?;
        Ok(())
    }

    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let row: Option<(String, String, i64, i64)> = self
            .conn()
            .query_row(
                "SELECT token, username, created_on, expires_on FROM sessions WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(|(token, username, created_on, expires_on)| {
            Ok(Session {
                token,
                username,
                created_on: from_millis(created_on)?,
                expires_on: from_millis(expires_on)?,
            })
        })
        .transpose()
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    /// Delete every session that expired at or before `now`. Returns the count.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let removed = self.conn().execute(
            "DELETE FROM sessions WHERE expires_on <= ?1",
            params![now.timestamp_millis()],
        )?;
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
        Ok(removed)
    }

    // ── Organizations & teams ───────────────────────────────────────

    pub fn create_organization(&self, name: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO organizations (name, created_at) VALUES (?1, ?2)",
                params![name, Utc::now().to_rfc3339()],
            )
            .map_err(|e| StorageError::from_constraint(e, format!("organization {name}")))?;
        Ok(())
    }

    /// Add (or re-grade) a user's membership in an organization.
    pub fn add_organization_member(
        &self,
        organization: &str,
        username: &str,
        admin: bool,
    ) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO organization_members (organization, username, admin)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(organization, username) DO UPDATE SET admin = excluded.admin",
                params![organization, username, admin as i32],
            )
            .map_err(|e| {
                StorageError::from_constraint(e, format!("organization {organization} or user {username}"))
            })?;
        Ok(())
    }

    pub fn create_team(&self, organization: &str, team: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO teams (organization, name, created_at) VALUES (?1, ?2, ?3)",
                params![organization, team, Utc::now().to_rfc3339()],
            )
            .map_err(|e| {
                StorageError::from_constraint(e, format!("team {team} in organization {organization}"))
            })?;
        Ok(())
    }

    /// Add (or re-grade) a user's membership in a team.
    pub fn add_team_member(
        &self,
        organization: &str,
        team: &str,
        username: &str,
        admin: bool,
    ) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO team_members (organization, team, username, admin)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(organization, team, username) DO UPDATE SET admin = excluded.admin",
                params![organization, team, username, admin as i32],
            )
            .map_err(|e| {
                StorageError::from_constraint(e, format!("team {organization}/{team} or user {username}"))
            })?;
        Ok(())
    }

    /// Usernames in an organization, admins only if `admins_only`. Sorted.
    pub fn organization_members(&self, organization: &str, admins_only: bool) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT username FROM organization_members
             WHERE organization = ?1 AND (?2 = 0 OR admin = 1)
             ORDER BY username",
        )?;
        let rows = stmt.query_map(params![organization, admins_only as i32], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Usernames in a team, admins only if `admins_only`. Sorted.
    pub fn team_members(
        &self,
        organization: &str,
        team: &str,
        admins_only: bool,
    ) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT username FROM team_members
             WHERE organization = ?1 AND team = ?2 AND (?3 = 0 OR admin = 1)
             ORDER BY username",
        )?;
        let rows = stmt.query_map(params![organization, team, admins_only as i32], |row| {
            row.get(0)
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::InvalidData(format!("timestamp out of range: {millis}")))
}
