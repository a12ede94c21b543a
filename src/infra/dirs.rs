//! Platform-specific directory management
//!
//! Provides platform-specific paths for the config and data directories.
//! Follows XDG Base Directory Specification on Linux and standard locations on macOS.
//!
//! Environment variables can override default directories:
//! - `PLATMAN_CONFIG_DIR` - Override config directory
//! - `PLATMAN_DATA_DIR` - Override data directory

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable names for directory overrides
pub const ENV_CONFIG_DIR: &str = "PLATMAN_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "PLATMAN_DATA_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "platman";

/// Subdirectory names
const PACKAGES_SUBDIR: &str = "packages";
const STAGING_SUBDIR: &str = "staging";
const TMP_SUBDIR: &str = "tmp";

/// Platform-specific directory provider for platman
///
/// Provides paths to the config and data directories following
/// platform conventions (XDG on Linux, Library on macOS).
#[derive(Debug, Clone)]
pub struct PlatmanDirs {
    config_dir: PathBuf,
    data_dir: PathBuf,
    /// Download staging root, overridable from the global config
    staging_dir: PathBuf,
}

impl PlatmanDirs {
    /// Create a new `PlatmanDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        let data_dir = Self::resolve_data_dir();
        Self {
            config_dir: Self::resolve_config_dir(),
            staging_dir: data_dir.join(STAGING_SUBDIR),
            data_dir,
        }
    }

    /// All directories rooted under one path
    #[must_use]
    pub fn with_root(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            staging_dir: root.join("data").join(STAGING_SUBDIR),
        }
    }

    /// Override the data directory (and the staging directory under it)
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.staging_dir = data_dir.join(STAGING_SUBDIR);
        self.data_dir = data_dir;
        self
    }

    /// Override the download staging directory
    #[must_use]
    pub fn with_staging_dir(mut self, staging_dir: PathBuf) -> Self {
        self.staging_dir = staging_dir;
        self
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/platman` or `~/.config/platman`
    /// - macOS: `~/Library/Application Support/platman`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Get the data directory path
    ///
    /// Holds the packages root, the index cache and download staging.
    /// - Linux: `$XDG_DATA_HOME/platman` or `~/.local/share/platman`
    /// - macOS: `~/Library/Application Support/platman`
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// Installed platforms and tools
    #[must_use]
    pub fn packages_dir(&self) -> PathBuf {
        self.data_dir.join(PACKAGES_SUBDIR)
    }

    /// Downloaded archives
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone()
    }

    /// Extraction scratch space, on the same filesystem as the packages root
    #[must_use]
    pub fn tmp_dir(&self) -> PathBuf {
        self.data_dir.join(TMP_SUBDIR)
    }

    /// Cached package index files
    #[must_use]
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// Get the global config file path
    ///
    /// Returns the path to `config.toml` in the config directory.
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Resolve config directory from environment or platform default
    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        Self::platform_config_dir()
    }

    /// Resolve data directory from environment or platform default
    fn resolve_data_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_DATA_DIR) {
            return PathBuf::from(path);
        }

        Self::platform_data_dir()
    }

    /// Get platform-specific config directory
    fn platform_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                // Fallback to home directory
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }

    /// Get platform-specific data directory
    fn platform_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".local").join("share").join(APP_NAME))
                    .unwrap_or_else(|| {
                        PathBuf::from(".")
                            .join(".local")
                            .join("share")
                            .join(APP_NAME)
                    })
            })
    }
}

impl Default for PlatmanDirs {
    fn default() -> Self {
        Self::new()
    }
}
