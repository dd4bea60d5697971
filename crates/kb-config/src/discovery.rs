//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/kb/config.toml` (user config, or `$KB_CONFIG_DIR/config.toml`)
//! 2. `./kb.toml` (project-local)
//! 3. An explicit `--config` file and CLI flags (handled by the binary)

use std::path::{Path, PathBuf};

use crate::{ConfigError, KbConfig, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "kb.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for user directory resolution.
const APP_NAME: &str = "kb";

/// Environment variable to override the user config directory.
const CONFIG_DIR_ENV: &str = "KB_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: KbConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Files that existed but could not be parsed.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }

    /// Merge an explicitly named file on top of the discovered layers.
    ///
    /// Unlike discovered layers, an explicit file must exist and parse.
    pub fn with_file(mut self, path: &Path) -> Result<Self> {
        let layer = load_config_file(path)?;
        self.config.merge(layer);
        self.sources.push(ConfigSource {
            path: path.to_path_buf(),
            loaded: true,
        });
        Ok(self)
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `KB_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = KbConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<KbConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    KbConfig::from_toml(&contents)
}

/// Path of the user config file.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory.
///
/// Checks `KB_CONFIG_DIR` first, then falls back to the platform default.
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a config file and merge it into the existing config.
///
/// A missing file is skipped silently; an unreadable one becomes a warning.
fn load_layer(config: &mut KbConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    let loaded = path.is_file()
        && match load_config_file(path) {
            Ok(layer) => {
                config.merge(layer);
                true
            }
            Err(e) => {
                warnings.push(format!("Failed to load {}: {}", path.display(), e));
                false
            }
        };

    ConfigSource {
        path: path.to_path_buf(),
        loaded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/kb.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_project_overrides_user() {
        let user_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        fs::write(
            user_dir.path().join("config.toml"),
            r#"
[server]
bind = "0.0.0.0:4000"

[session]
lifetime_secs = 120
"#,
        )
        .unwrap();
        fs::write(
            project_dir.path().join("kb.toml"),
            r#"
[server]
bind = "127.0.0.1:5000"
"#,
        )
        .unwrap();

        let loaded =
            load_config_with_options(Some(project_dir.path()), Some(user_dir.path())).unwrap();
        assert_eq!(loaded.config.server().bind, "127.0.0.1:5000");
        assert_eq!(loaded.config.session().lifetime_secs, 120);
        assert_eq!(loaded.loaded_from().len(), 2);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_missing_layers_are_skipped() {
        let empty = TempDir::new().unwrap();
        let loaded = load_config_with_options(Some(empty.path()), Some(empty.path())).unwrap();
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.config, KbConfig::default());
    }

    #[test]
    fn test_broken_layer_becomes_warning() {
        let project_dir = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        fs::write(project_dir.path().join("kb.toml"), "[server\n").unwrap();

        let loaded =
            load_config_with_options(Some(project_dir.path()), Some(empty.path())).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.loaded_from().is_empty());
    }

    #[test]
    fn test_with_file_layers_on_top() {
        let empty = TempDir::new().unwrap();
        let explicit = empty.path().join("custom.toml");
        fs::write(&explicit, "[storage]\nbackend = \"memory\"\n").unwrap();

        let loaded = load_config_with_options(Some(empty.path()), Some(empty.path()))
            .unwrap()
            .with_file(&explicit)
            .unwrap();
        assert_eq!(loaded.config.storage().backend, crate::StorageBackend::Memory);
    }

    #[test]
    fn test_with_missing_file_is_error() {
        let empty = TempDir::new().unwrap();
        let result = load_config_with_options(Some(empty.path()), Some(empty.path()))
            .unwrap()
            .with_file(&empty.path().join("absent.toml"));
        assert!(result.is_err());
    }
}
