//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File-backed configuration tier, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Project-level config ($CWD/ops-dashboard/)
    Project,
    /// User-level config (~/.ops-dashboard/)
    User,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
        }
    }
}

/// Where each tier is read from.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Single file replacing the project and user tiers.
    pub explicit: Option<PathBuf>,
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        let explicit = std::env::var("OPS_DASHBOARD_CONFIG_PATH")
            .ok()
            .map(PathBuf::from);

        // User dir: OPS_DASHBOARD_USER_DIR or ~/.ops-dashboard
        let user_dir = std::env::var("OPS_DASHBOARD_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".ops-dashboard")));

        // Project dir: OPS_DASHBOARD_PROJECT_DIR or $CWD/ops-dashboard
        let project_dir = std::env::var("OPS_DASHBOARD_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("ops-dashboard")));

        Self {
            explicit,
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            explicit: None,
            project_dir,
            user_dir,
        }
    }

    /// Use a single config file instead of the directory tiers.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }
}

/// Read `dir/config.yaml` as a merge tier, if present and parseable.
fn read_tier(dir: &Path, tier: ConfigTier) -> Option<(Value, PathBuf)> {
    let file = dir.join("config.yaml");
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(&file) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %file.display(), %tier, error = %e, "Cannot read config file, skipping");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => {
            debug!(path = %file.display(), %tier, "Loaded config tier");
            Some((value, file))
        }
        Err(e) => {
            warn!(path = %file.display(), %tier, error = %e, "Invalid YAML, skipping config file");
            None
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: Config,
    /// Highest-priority config file that was used, if any
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        Self::load_with_env(paths, |key| std::env::var(key).ok())
    }

    /// Load with a custom environment lookup.
    pub fn load_with_env(paths: ConfigPaths, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let (mut config, config_path) = match &paths.explicit {
            Some(path) => {
                let config = Config::load(path)
                    .with_context(|| format!("loading config file {}", path.display()))?;
                (config, Some(path.clone()))
            }
            None => Self::merge_tiers(&paths)?,
        };

        Self::apply_env_overrides(&mut config, env);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    fn merge_tiers(paths: &ConfigPaths) -> Result<(Config, Option<PathBuf>)> {
        let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut used = None;

        if let Some(dir) = &paths.project_dir
            && let Some((value, file)) = read_tier(dir, ConfigTier::Project)
        {
            tiers.push(value);
            used = Some(file);
        }

        if let Some(dir) = &paths.user_dir
            && let Some((value, file)) = read_tier(dir, ConfigTier::User)
        {
            tiers.push(value);
            used = Some(file);
        }

        let config: Config = serde_json::from_value(deep_merge_all(tiers))?;
        Ok((config, used))
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
        if let Some(db_path) = env("OPS_DASHBOARD_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Some(port) = env("OPS_DASHBOARD_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid OPS_DASHBOARD_PORT"),
            }
        }

        if let Some(token) = env("OPS_DASHBOARD_ADMIN_TOKEN")
            && !token.is_empty()
        {
            config.admin.token = Some(token);
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Get the config file path that was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_tier_order_and_labels() {
        assert!(ConfigTier::Project < ConfigTier::User);
        assert_eq!(ConfigTier::Project.to_string(), "project");
        assert_eq!(ConfigTier::User.to_string(), "user");
    }

    #[test]
    fn test_config_paths_discover() {
        let paths = ConfigPaths::discover();
        assert!(paths.project_dir.is_some());
    }

    #[test]
    fn test_load_defaults_only() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = ConfigLoader::load_with_env(paths, no_env).unwrap();
        let config = loader.config();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.store.busy_retries, 3);
        assert!(loader.config_path().is_none());
    }

    #[test]
    fn test_user_config_overrides_project() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("ops-dashboard");
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&user_dir).unwrap();

        std::fs::write(
            project_dir.join("config.yaml"),
            "server:\n  port: 6000\nstore:\n  busy_retries: 1\n",
        )
        .unwrap();
        std::fs::write(user_dir.join("config.yaml"), "server:\n  port: 7000\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(user_dir.clone()));
        let loader = ConfigLoader::load_with_env(paths, no_env).unwrap();
        let config = loader.config();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.store.busy_retries, 1);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(loader.config_path(), Some(user_dir.join("config.yaml").as_path()));
    }

    #[test]
    fn test_invalid_yaml_tier_is_skipped() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("ops-dashboard");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "server: [unclosed").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        let loader = ConfigLoader::load_with_env(paths, no_env).unwrap();
        assert_eq!(loader.config().server.port, 5000);
    }

    #[test]
    fn test_explicit_file_replaces_tiers() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("ops-dashboard");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "server:\n  port: 6000\n").unwrap();

        let explicit = temp.path().join("custom.yaml");
        std::fs::write(&explicit, "clock:\n  utc_offset_hours: 0\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None).with_explicit(&explicit);
        let loader = ConfigLoader::load_with_env(paths, no_env).unwrap();

        assert_eq!(loader.config().clock.utc_offset_hours, 0);
        assert_eq!(loader.config().server.port, 5000);
        assert_eq!(loader.config_path(), Some(explicit.as_path()));
    }

    #[test]
    fn test_env_overrides_files() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(Some(temp.path().join("none")), None);

        let loader = ConfigLoader::load_with_env(paths, |key| match key {
            "OPS_DASHBOARD_DB_PATH" => Some("/tmp/ops.db".to_string()),
            "OPS_DASHBOARD_PORT" => Some("8088".to_string()),
            "OPS_DASHBOARD_ADMIN_TOKEN" => Some("tok".to_string()),
            _ => None,
        })
        .unwrap();
        let config = loader.config();

        assert_eq!(config.server.db_path, PathBuf::from("/tmp/ops.db"));
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.admin.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_bad_env_port_ignored() {
        let paths = ConfigPaths::with_dirs(None, None);
        let loader = ConfigLoader::load_with_env(paths, |key| {
            (key == "OPS_DASHBOARD_PORT").then(|| "not-a-port".to_string())
        })
        .unwrap();
        assert_eq!(loader.config().server.port, 5000);
    }
}
