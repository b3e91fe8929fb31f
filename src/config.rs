//! Configuration management for replay-deck

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Switcher control endpoint
    #[serde(default)]
    pub switcher: SwitcherConfig,

    /// Where the event list and replay settings are persisted
    #[serde(default)]
    pub storage: StorageConfig,

    /// Event playback fallback behaviour
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitcherConfig {
    /// Switcher host name or IP address
    #[serde(default = "default_host")]
    pub host: String,

    /// Switcher web controller port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the control API on the switcher
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// Timeout for the connectivity probe (ms)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Timeout for a single command (ms)
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding replay_events.json and replay_config.json.
    /// When unset, the platform data directory is used.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Retry a failed event playback with the newest-first index (N - 1 - i)
    #[serde(default = "default_true")]
    pub mirrored_index_fallback: bool,

    /// As a last resort, play the most recent buffer instead of the event
    #[serde(default = "default_true")]
    pub play_last_fallback: bool,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8088
}

fn default_api_path() -> String {
    "/api/".to_string()
}

fn default_probe_timeout() -> u64 {
    2000
}

fn default_command_timeout() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for SwitcherConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_path: default_api_path(),
            probe_timeout_ms: default_probe_timeout(),
            command_timeout_ms: default_command_timeout(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            mirrored_index_fallback: true,
            play_last_fallback: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            switcher: SwitcherConfig::default(),
            storage: StorageConfig::default(),
            playback: PlaybackConfig::default(),
            config_path: None,
        }
    }
}

impl SwitcherConfig {
    /// Full URL of the control API, e.g. `http://127.0.0.1:8088/api/`
    pub fn base_url(&self) -> String {
        let path = self.api_path.trim_start_matches('/');
        format!("http://{}:{}/{}", self.host, self.port, path)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating it with defaults if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let mut config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            config.config_path = Some(config_path.to_path_buf());
            Ok(config)
        } else {
            // Create default config
            let config = Config {
                config_path: Some(config_path.to_path_buf()),
                ..Config::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// Directory where replay state files live
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }

        let proj_dirs = project_dirs()?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = project_dirs()?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

/// Platform directories for config, data and state files
pub(crate) fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "replay-deck", "replay-deck")
        .context("Failed to determine project directories")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.switcher.port, 8088);
        assert_eq!(config.switcher.base_url(), "http://127.0.0.1:8088/api/");
        assert_eq!(config.switcher.probe_timeout(), Duration::from_secs(2));
        assert!(config.playback.mirrored_index_fallback);
        assert!(config.playback.play_last_fallback);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_path().unwrap(), path);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[switcher]\nhost = \"10.0.0.5\"\n\n[playback]\nmirrored_index_fallback = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.switcher.host, "10.0.0.5");
        assert_eq!(config.switcher.port, 8088);
        assert!(!config.playback.mirrored_index_fallback);
        assert!(config.playback.play_last_fallback);
        assert!(config.storage.data_dir.is_none());
    }
}
