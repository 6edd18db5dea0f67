//! Application configuration backed by the `config` crate.
//!
//! Values are layered: built-in defaults, then `~/.config/gamedb/config.toml`,
//! then `GAMEDB_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Base URL of the catalog API used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";
/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Directory name used under the platform config/data roots.
pub const APP_DIR: &str = "gamedb";

/// Runtime settings for the admin client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Scheme and authority of the REST API, without the `/api` suffix.
    pub api_base_url: String,
    /// Directory holding the persisted session token and log files.
    pub state_dir: PathBuf,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            state_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path` (optional) layered over the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = AppConfig::default();
        let settings = Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default(
                "state_dir",
                defaults.state_dir.to_string_lossy().to_string(),
            )?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("GAMEDB").try_parsing(true))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration values")?;
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Location of the durable session token.
    pub fn token_path(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }

    /// Directory for log files.
    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Path of the user configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Write a default configuration file when none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

/// Write the default configuration to `path` unless the file already exists.
///
/// Returns `true` when a new file was created.
pub fn write_default_config(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }

    let defaults = AppConfig::default();
    let contents = format!(
        "# gamedb admin client\napi_base_url = \"{}\"\nrequest_timeout_secs = {}\n# state_dir = \"{}\"\n",
        defaults.api_base_url,
        defaults.request_timeout_secs,
        defaults.state_dir.display()
    );
    fs::write(path, contents)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            format!(
                "api_base_url = \"https://catalog.example.com/\"\nstate_dir = \"{}\"\n",
                dir.path().join("state").display()
            ),
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.api_base_url, "https://catalog.example.com");
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(
            config.token_path(),
            dir.path().join("state").join("session.json")
        );
        Ok(())
    }

    #[test]
    fn default_config_is_written_once() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        assert!(write_default_config(&path)?);
        assert!(!write_default_config(&path)?);

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        Ok(())
    }
}
