//! Configuration system for the knowledge base server.
//!
//! Provides TOML-based configuration with:
//! - `[server]`, `[session]` and `[storage]` sections, each optional
//! - Config file layering (user config + project-local overrides)
//! - Validation of values that parse but cannot be used

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_with_options, user_config_dir, user_config_path,
    ConfigSource, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use types::*;
