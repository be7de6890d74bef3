use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::client::{ClientConfig, DEFAULT_BASE_URL};

/// Environment variable that takes precedence over the configured API key.
pub const API_KEY_ENV: &str = "WEATHERSTACK_API_KEY";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// cache_timeout_secs = 300
/// storage_file = "/home/me/.local/share/zipweather/locations.json"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub base_url: String,
    pub cache_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub min_request_interval_secs: f64,

    /// Where saved locations live; the platform data directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_timeout_secs: 300,
            request_timeout_secs: 10,
            min_request_interval_secs: 1.0,
            storage_file: None,
        }
    }
}

impl Config {
    /// Load config from the platform location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "zipweather", "zipweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Configured storage file, or `locations.json` in the platform data directory.
    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("locations.json")),
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Result<String> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `zipweather configure` or set {API_KEY_ENV}."
                )
            })
    }

    fn resolve_api_key(&self, from_env: Option<String>) -> Option<String> {
        from_env
            .into_iter()
            .chain(self.api_key.clone())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let min_request_interval = Duration::try_from_secs_f64(self.min_request_interval_secs)
            .with_context(|| {
                format!(
                    "Invalid min_request_interval_secs: {}",
                    self.min_request_interval_secs
                )
            })?;

        Ok(ClientConfig {
            base_url: self.base_url.clone(),
            cache_timeout: Duration::from_secs(self.cache_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            min_request_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.client_config().unwrap(), ClientConfig::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("  OPEN_KEY  ".into());
        cfg.cache_timeout_secs = 60;
        cfg.storage_file = Some(dir.path().join("locations.json"));
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.api_key.as_deref(), Some("OPEN_KEY"));
        assert_eq!(loaded.storage_path().unwrap(), dir.path().join("locations.json"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "request_timeout_secs = 3\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.request_timeout_secs, 3);
        assert_eq!(cfg.cache_timeout_secs, 300);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "cache_timeout_secs = \"soon\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn env_key_takes_precedence() {
        let mut cfg = Config::default();
        cfg.set_api_key("FROM_FILE".into());

        assert_eq!(cfg.resolve_api_key(Some("FROM_ENV".into())).as_deref(), Some("FROM_ENV"));
        assert_eq!(cfg.resolve_api_key(Some("   ".into())).as_deref(), Some("FROM_FILE"));
        assert_eq!(cfg.resolve_api_key(None).as_deref(), Some("FROM_FILE"));
        assert_eq!(Config::default().resolve_api_key(None), None);
    }

    #[test]
    fn negative_interval_is_rejected() {
        let cfg = Config { min_request_interval_secs: -1.0, ..Config::default() };
        let err = cfg.client_config().unwrap_err();

        assert!(err.to_string().contains("min_request_interval_secs"));
    }

    #[test]
    fn client_config_converts_units() {
        let cfg = Config {
            cache_timeout_secs: 120,
            request_timeout_secs: 5,
            min_request_interval_secs: 0.25,
            ..Config::default()
        };

        let client = cfg.client_config().unwrap();
        assert_eq!(client.cache_timeout, Duration::from_secs(120));
        assert_eq!(client.request_timeout, Duration::from_secs(5));
        assert_eq!(client.min_request_interval, Duration::from_millis(250));
    }
}
