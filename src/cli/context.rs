//! Command context
//!
//! Directories and global configuration shared by every command, plus the
//! wiring of catalog, downloader and installer.

use anyhow::{Context as _, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::global_config::GlobalConfig;
use crate::core::install::{InstallOptions, Installer};
use crate::core::manager::PackageManager;
use crate::error::LoadError;
use crate::infra::dirs::PlatmanDirs;
use crate::infra::download::DownloadManager;
use crate::infra::extract::ArchiveExtractor;
use crate::infra::host::detect_host_platform;
use crate::infra::process::TokioProcessRunner;
use crate::registry::{IndexCache, IndexClient};

/// Everything a command needs before it touches the catalog
#[derive(Debug, Clone)]
pub struct Context {
    pub config: GlobalConfig,
    pub dirs: PlatmanDirs,
    pub quiet: bool,
}

impl Context {
    /// Read the global configuration and apply its directory overrides
    ///
    /// `config_path` defaults to `config.toml` in the configuration directory.
    pub fn load(config_path: Option<&Path>, quiet: bool) -> Result<Self> {
        let dirs = PlatmanDirs::new();
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dirs.global_config_path());
        let config = GlobalConfig::load_from_path(&path)?;
        let dirs = config.apply_directories(dirs);
        tracing::debug!(
            config = %path.display(),
            data = %dirs.data_dir().display(),
            "Context loaded"
        );
        Ok(Self {
            config,
            dirs,
            quiet,
        })
    }

    pub fn index_urls(&self) -> Vec<String> {
        self.config.index_urls()
    }

    pub fn index_cache(&self) -> IndexCache {
        IndexCache::new(self.dirs.index_dir())
    }

    pub fn downloader(&self) -> Arc<DownloadManager> {
        Arc::new(
            DownloadManager::new()
                .with_network(self.config.connect_timeout_secs(), self.config.user_agent()),
        )
    }

    pub fn index_client(&self) -> IndexClient {
        IndexClient::new(self.downloader(), self.index_cache())
    }

    /// Catalog loaded from the cached indexes and the packages directory
    pub async fn load_manager(&self) -> Result<PackageManager> {
        let manager = PackageManager::new(self.dirs.clone(), detect_host_platform());
        let files = self.index_cache().existing_files(&self.index_urls());
        match manager.load_all(&files).await {
            Ok(warnings) => {
                for warning in warnings {
                    tracing::warn!("{warning}");
                }
                Ok(manager)
            }
            Err(e @ LoadError::NothingToLoad { .. }) => {
                Err(e).context("No package index available, run 'platman update-index' first")
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Installer over `manager`, cancelled on Ctrl-C
    pub fn installer(&self, manager: PackageManager, options: InstallOptions) -> Installer {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping");
                on_interrupt.cancel();
            }
        });

        Installer::new(
            manager,
            self.downloader(),
            Arc::new(ArchiveExtractor::new()),
            Arc::new(TokioProcessRunner::new()),
        )
        .with_options(options)
        .with_cancellation(cancel)
    }

    /// Options from the configuration file
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions::from(&self.config)
    }
}
