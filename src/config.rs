//! Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.yaml";
pub const ENV_DB_PATH: &str = "TASKFLOW_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKFLOW_LOG_LEVEL";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// File the settings were read from; `None` means built-in defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Where records are persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".taskflow/taskflow.db")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info", "taskflow=debug").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Candidate config locations, highest priority first.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory ($CWD/taskflow)
    pub project_dir: Option<PathBuf>,
    /// User-level config directory (~/.taskflow)
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    pub fn discover() -> Self {
        Self {
            project_dir: Some(PathBuf::from("taskflow")),
            user_dir: dirs::home_dir().map(|home| home.join(".taskflow")),
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    /// Existing config files in lookup order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        [&self.project_dir, &self.user_dir]
            .into_iter()
            .flatten()
            .map(|dir| dir.join(CONFIG_FILE))
            .filter(|path| path.is_file())
            .collect()
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load the explicit file if given, else the first discovered one, else
    /// defaults. Environment overrides are applied on top.
    ///
    /// An explicit path that cannot be read is an error; discovered files are
    /// only used when they exist. The chosen file is recorded in `source` so
    /// it can be logged once logging is up.
    pub fn resolve(explicit: Option<&Path>, paths: &ConfigPaths) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => paths.candidates().into_iter().next(),
        };
        let mut config = match &path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.source = path;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `TASKFLOW_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
            self.store.db_path = PathBuf::from(db_path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.store.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.db_path, PathBuf::from(".taskflow/taskflow.db"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("store:\n  db_path: /tmp/x.db\n").unwrap();
        assert_eq!(config.store.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_DB_PATH, "env.db"), (ENV_LOG_LEVEL, "debug")].into();
        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.store.db_path, PathBuf::from("env.db"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_project_config_wins_over_user() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        std::fs::write(project.path().join(CONFIG_FILE), "store:\n  db_path: project.db\n").unwrap();
        std::fs::write(user.path().join(CONFIG_FILE), "store:\n  db_path: user.db\n").unwrap();

        let paths = ConfigPaths::with_dirs(
            Some(project.path().to_path_buf()),
            Some(user.path().to_path_buf()),
        );
        let candidates = paths.candidates();
        assert_eq!(candidates.len(), 2);

        let config = Config::load(&candidates[0]).unwrap();
        assert_eq!(config.store.db_path, PathBuf::from("project.db"));
    }

    #[test]
    fn test_missing_dirs_yield_no_candidates() {
        let empty = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(Some(empty.path().join("nope")), None);
        assert!(paths.candidates().is_empty());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(None, None);
        assert!(Config::resolve(Some(&dir.path().join("missing.yaml")), &paths).is_err());
    }

    #[test]
    fn test_resolve_records_discovered_source() {
        let project = TempDir::new().unwrap();
        let file = project.path().join(CONFIG_FILE);
        std::fs::write(&file, "logging:\n  level: warn\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project.path().to_path_buf()), None);
        let config = Config::resolve(None, &paths).unwrap();
        assert_eq!(config.source, Some(file));
    }

    #[test]
    fn test_resolve_without_files_has_no_source() {
        let paths = ConfigPaths::with_dirs(None, None);
        let config = Config::resolve(None, &paths).unwrap();
        assert_eq!(config.source, None);
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.store.db_path = dir.path().join("nested/deeper/taskflow.db");
        config.ensure_db_dir().unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
    }
}
