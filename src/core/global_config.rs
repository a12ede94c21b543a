//! Global configuration management
//!
//! Reads settings from `config.toml` in the config directory: extra package
//! index URLs, directory overrides, network settings and install behavior.

use crate::config::{defaults, urls};
use crate::infra::dirs::PlatmanDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Global configuration error types
#[derive(Error, Debug)]
pub enum GlobalConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },
}

/// Global configuration for platman
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Package index sources
    #[serde(default)]
    pub board_manager: BoardManagerConfig,

    /// Directory overrides
    #[serde(default)]
    pub directories: DirectoriesConfig,

    /// HTTP settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Install/uninstall behavior
    #[serde(default)]
    pub install: InstallConfig,
}

/// Package index sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardManagerConfig {
    /// Third-party index URLs fetched in addition to the official one
    #[serde(default)]
    pub additional_urls: Vec<String>,
}

/// Directory overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoriesConfig {
    /// Data directory (packages root, index cache)
    pub data: Option<PathBuf>,

    /// Download staging directory
    pub downloads: Option<PathBuf>,
}

/// HTTP settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

/// Install/uninstall behavior
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallConfig {
    pub skip_post_install: Option<bool>,
    pub skip_pre_uninstall: Option<bool>,
    /// Replace an installed version of the same platform
    pub allow_overwrite: Option<bool>,
    /// Concurrent tool downloads within one platform install
    pub parallel_downloads: Option<usize>,
    /// Fail when a hook exits non-zero instead of warning
    pub hooks_mandatory: Option<bool>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `GlobalConfigError::ParseError` if the config file exists but
    /// contains invalid TOML.
    pub fn load(dirs: &PlatmanDirs) -> Result<Self, GlobalConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, GlobalConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Save global configuration to a specific path
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to_path(&self, path: &Path) -> Result<(), GlobalConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GlobalConfigError::ReadError {
                path: parent.display().to_string(),
                error: e.to_string(),
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        fs::write(path, content).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Official index followed by the configured additional ones
    #[must_use]
    pub fn index_urls(&self) -> Vec<String> {
        let mut urls = vec![urls::DEFAULT_INDEX_URL.to_string()];
        for url in &self.board_manager.additional_urls {
            if !urls.contains(url) {
                urls.push(url.clone());
            }
        }
        urls
    }

    /// Apply the `[directories]` overrides
    #[must_use]
    pub fn apply_directories(&self, dirs: PlatmanDirs) -> PlatmanDirs {
        let mut dirs = match &self.directories.data {
            Some(data) => dirs.with_data_dir(data.clone()),
            None => dirs,
        };
        if let Some(downloads) = &self.directories.downloads {
            dirs = dirs.with_staging_dir(downloads.clone());
        }
        dirs
    }

    #[must_use]
    pub fn connect_timeout_secs(&self) -> u64 {
        self.network
            .connect_timeout_secs
            .unwrap_or(defaults::CONNECT_TIMEOUT_SECS)
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.network
            .user_agent
            .as_deref()
            .unwrap_or(defaults::USER_AGENT)
    }

    #[must_use]
    pub fn parallel_downloads(&self) -> usize {
        self.install
            .parallel_downloads
            .filter(|n| *n > 0)
            .unwrap_or(defaults::DEFAULT_PARALLEL_DOWNLOADS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GlobalConfig::default();
        assert!(config.board_manager.additional_urls.is_empty());
        assert!(config.install.allow_overwrite.is_none());
        assert_eq!(config.index_urls(), vec![urls::DEFAULT_INDEX_URL.to_string()]);
        assert_eq!(config.parallel_downloads(), defaults::DEFAULT_PARALLEL_DOWNLOADS);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config = GlobalConfig::load_from_path(&config_path).unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn test_load_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let content = r#"
[board_manager]
additional_urls = ["https://example.com/package_esp32_index.json"]

[directories]
data = "/opt/platman"

[install]
skip_post_install = true
parallel_downloads = 2
"#;
        fs::write(&config_path, content).unwrap();

        let config = GlobalConfig::load_from_path(&config_path).unwrap();
        assert_eq!(config.index_urls().len(), 2);
        assert_eq!(config.install.skip_post_install, Some(true));
        assert_eq!(config.parallel_downloads(), 2);

        let dirs = config.apply_directories(PlatmanDirs::with_root(Path::new("/x")));
        assert_eq!(dirs.packages_dir(), PathBuf::from("/opt/platman/packages"));
    }

    #[test]
    fn test_duplicate_index_urls_are_dropped() {
        let config = GlobalConfig {
            board_manager: BoardManagerConfig {
                additional_urls: vec![
                    urls::DEFAULT_INDEX_URL.to_string(),
                    "https://a/index.json".to_string(),
                    "https://a/index.json".to_string(),
                ],
            },
            ..GlobalConfig::default()
        };
        assert_eq!(config.index_urls().len(), 2);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&config_path, "invalid toml [[[").unwrap();

        let result = GlobalConfig::load_from_path(&config_path);
        assert!(matches!(result, Err(GlobalConfigError::ParseError { .. })));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/config.toml");

        let config = GlobalConfig {
            board_manager: BoardManagerConfig {
                additional_urls: vec!["https://test.com/index.json".to_string()],
            },
            directories: DirectoriesConfig {
                data: Some(PathBuf::from("/data")),
                downloads: None,
            },
            network: NetworkConfig {
                connect_timeout_secs: Some(5),
                user_agent: Some("agent".to_string()),
            },
            install: InstallConfig {
                hooks_mandatory: Some(true),
                ..InstallConfig::default()
            },
        };

        config.save_to_path(&config_path).unwrap();
        let loaded = GlobalConfig::load_from_path(&config_path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.user_agent(), "agent");
        assert_eq!(loaded.connect_timeout_secs(), 5);
    }
}
