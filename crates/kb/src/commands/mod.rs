//! CLI command handlers.

pub mod config;
pub mod org;
pub mod serve;
pub mod team;
pub mod user;

use std::path::PathBuf;

use anyhow::{Result, bail};
use kb_config::{KbConfig, LoadedConfig, StorageBackend, StorageConfig};
use kb_storage::SqliteStore;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file from `--config`.
    pub config_path: Option<PathBuf>,
    /// Database path from `--db`.
    pub db_path: Option<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Discover, merge and validate configuration.
    pub fn load(&self) -> Result<LoadedConfig> {
        let mut loaded = kb_config::load_config(None)?;
        if let Some(path) = &self.config_path {
            loaded = loaded.with_file(path)?;
        }
        for warning in &loaded.warnings {
            eprintln!("warning: {}", warning);
        }
        loaded.config.validate()?;
        Ok(loaded)
    }

    /// The storage section with `--db` applied.
    ///
    /// `--db` selects the SQLite backend even if config says `memory`.
    pub fn storage(&self, config: &KbConfig) -> StorageConfig {
        let mut storage = config.storage();
        if let Some(path) = &self.db_path {
            storage.backend = StorageBackend::Sqlite;
            storage.path = path.clone();
        }
        storage
    }

    /// Open the configured store for an administration command.
    pub fn admin_store(&self) -> Result<SqliteStore> {
        let loaded = self.load()?;
        let storage = self.storage(&loaded.config);
        if storage.backend == StorageBackend::Memory {
            bail!(
                "the memory backend has nothing to administer; pass --db, or start the server with --seed-user"
            );
        }
        Ok(SqliteStore::open(&storage.path)?)
    }
}
