//! Package index client
//!
//! Refreshes cached package indexes from their URLs. A fetched index replaces
//! the cached copy only once it parses, so a broken download never clobbers a
//! good index.

use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::index::IndexDocument;
use crate::core::progress::{DownloadProgress, Progress};
use crate::error::{FilesystemError, IndexError, RegistryError};
use crate::infra::download::Downloader;
use crate::infra::filesystem;
use crate::registry::cache::{index_file_name, local_index_path, IndexCache};

/// Outcome of refreshing a set of index URLs
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Indexes written to the cache
    pub updated: Vec<PathBuf>,
    /// `file://` indexes, read in place
    pub local: Vec<PathBuf>,
    /// URLs that failed, with the error message
    pub failed: Vec<(String, String)>,
}

impl UpdateReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetches package indexes into an [`IndexCache`]
pub struct IndexClient {
    downloader: Arc<dyn Downloader>,
    cache: IndexCache,
}

impl IndexClient {
    pub fn new(downloader: Arc<dyn Downloader>, cache: IndexCache) -> Self {
        Self { downloader, cache }
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Refresh every URL in order; a failing URL does not stop the others
    pub async fn update_indexes(&self, urls: &[String], progress: &Progress) -> UpdateReport {
        let mut report = UpdateReport::default();
        for url in urls {
            if let Some(path) = local_index_path(url) {
                match IndexDocument::load(&path) {
                    Ok(_) => report.local.push(path),
                    Err(e) => {
                        warn!(url, error = %e, "Local index unusable");
                        report.failed.push((url.clone(), e.to_string()));
                    }
                }
                continue;
            }
            match self.update_index(url, progress).await {
                Ok(path) => {
                    info!(url, path = %path.display(), "Index updated");
                    report.updated.push(path);
                }
                Err(e) => {
                    warn!(url, error = %e, "Index update failed");
                    report.failed.push((url.clone(), e.to_string()));
                }
            }
        }
        report
    }

    /// Download one index into the cache
    pub async fn update_index(&self, url: &str, progress: &Progress) -> Result<PathBuf, RegistryError> {
        let name = index_file_name(url).ok_or_else(|| RegistryError::InvalidUrl {
            url: url.to_string(),
        })?;
        let cache_dir = self.cache.cache_dir();
        filesystem::create_dir_all(cache_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix(".index-")
            .tempdir_in(cache_dir)
            .map_err(|e| FilesystemError::CreateDir {
                path: cache_dir.to_path_buf(),
                error: e.to_string(),
            })?;

        let compressed = url.ends_with(".gz");
        let download_path = scratch
            .path()
            .join(if compressed { format!("{name}.gz") } else { name.clone() });

        progress.download(&DownloadProgress::Start {
            label: name.clone(),
            url: url.to_string(),
        });
        let downloaded = self
            .downloader
            .download(url, &download_path, "", progress.byte_callback(&name))
            .await;
        progress.download(&DownloadProgress::End {
            label: name.clone(),
            success: downloaded.is_ok(),
            message: match &downloaded {
                Ok(_) => format!("{name} downloaded"),
                Err(e) => e.to_string(),
            },
        });
        let downloaded = downloaded.map_err(|source| RegistryError::Download {
            url: url.to_string(),
            source,
        })?;

        let content = read_index(&downloaded, compressed).map_err(|error| {
            if compressed {
                RegistryError::Decompress {
                    url: url.to_string(),
                    error,
                }
            } else {
                RegistryError::Index(IndexError::IoError {
                    path: downloaded.clone(),
                    error,
                })
            }
        })?;
        IndexDocument::from_json(&content, Path::new(url))?;

        let staged = scratch.path().join(&name);
        filesystem::write_file(&staged, &content)?;
        let target = cache_dir.join(&name);
        filesystem::rename(&staged, &target)?;
        debug!(url, path = %target.display(), "Index stored");
        Ok(target)
    }
}

fn read_index(path: &Path, compressed: bool) -> Result<String, String> {
    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut content = String::new();
    if compressed {
        GzDecoder::new(file)
            .read_to_string(&mut content)
            .map_err(|e| e.to_string())?;
    } else {
        std::io::BufReader::new(file)
            .read_to_string(&mut content)
            .map_err(|e| e.to_string())?;
    }
    Ok(content)
}
