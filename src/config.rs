use crate::core::db::ConnectionOptions;
use crate::core::{OrmError, Result};
use crate::service::DatabaseRegistry;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Base directory for relative database paths.
    pub data_dir: Option<PathBuf>,
    /// Logical database names mapped to file paths.
    #[serde(default)]
    pub databases: BTreeMap<String, PathBuf>,
    pub sqlite: Option<SqliteConfig>,
}

/// SQLite-related configuration.
#[derive(Debug, Default, Deserialize)]
pub struct SqliteConfig {
    pub journal_mode: Option<String>,
    pub foreign_keys: Option<bool>,
    pub busy_timeout_ms: Option<u64>,
}

impl Config {
    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| OrmError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(name) = self.databases.keys().find(|name| name.trim().is_empty()) {
            return Err(OrmError::Config(format!(
                "database name {:?} must not be empty",
                name
            )));
        }
        Ok(())
    }

    /// Builds the path registry, resolving relative paths against `data_dir`.
    pub fn registry(&self) -> DatabaseRegistry {
        let mut registry = DatabaseRegistry::new();
        for (name, path) in &self.databases {
            let resolved = match &self.data_dir {
                Some(base) if path.is_relative() => base.join(path),
                _ => path.clone(),
            };
            registry.register(name.clone(), resolved);
        }
        registry
    }

    /// Connection pragmas from the `[sqlite]` section.
    pub fn connection_options(&self) -> ConnectionOptions {
        match &self.sqlite {
            Some(sqlite) => ConnectionOptions {
                journal_mode: sqlite.journal_mode.clone(),
                foreign_keys: sqlite.foreign_keys,
                busy_timeout: sqlite.busy_timeout_ms.map(Duration::from_millis),
            },
            None => ConnectionOptions::default(),
        }
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = liteorm::config::load_config("liteorm.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Config::from_toml_str(&content)
}

/// Default configuration location, `<config dir>/liteorm/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("liteorm").join("config.toml"))
}
