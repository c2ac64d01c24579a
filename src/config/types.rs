//! Configuration types.

use crate::clock::DEFAULT_UTC_OFFSET_HOURS;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// HTTP server and database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address to bind the HTTP listener to.
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ops-dashboard/operations.db")
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// SQLite contention and seeding behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long SQLite waits on a locked database before reporting busy.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Transaction retries after a busy error before giving up.
    #[serde(default = "default_busy_retries")]
    pub busy_retries: u32,

    /// Insert the system templates when the template table is empty.
    #[serde(default = "default_seed_defaults")]
    pub seed_defaults: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            busy_retries: default_busy_retries(),
            seed_defaults: default_seed_defaults(),
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_busy_retries() -> u32 {
    3
}

fn default_seed_defaults() -> bool {
    true
}

/// Civil timezone all date keys are computed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

fn default_utc_offset_hours() -> i32 {
    DEFAULT_UTC_OFFSET_HOURS
}

/// Admin gate for template mutations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    /// Bearer token. When unset every admin request is refused.
    #[serde(default)]
    pub token: Option<String>,
}

impl Config {
    /// Load a single configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Empty or comment-only files parse as null
        let config: Option<Config> = serde_yaml::from_str(&content)?;
        Ok(config.unwrap_or_default())
    }

    /// Ensure the database's parent directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.store.busy_retries, 3);
        assert!(config.store.seed_defaults);
        assert_eq!(config.clock.utc_offset_hours, 8);
        assert!(config.admin.token.is_none());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
store:
  busy_retries: 7
admin:
  token: s3cret
"#,
        )
        .unwrap();
        assert_eq!(config.store.busy_retries, 7);
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.admin.token.as_deref(), Some("s3cret"));
        assert_eq!(config.server.port, 5000);
    }
}
