//! Index cache
//!
//! Maps package index URLs to their cached files in the index directory.
//! `file://` URLs are read in place and never cached.

use std::path::{Path, PathBuf};

use reqwest::Url;

/// Local cache of downloaded package indexes
#[derive(Debug, Clone)]
pub struct IndexCache {
    /// Cache directory path
    cache_dir: PathBuf,
}

/// Cached file name for an index URL: the last path segment, minus `.gz`
pub fn index_file_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed.path_segments()?.next_back()?.to_string();
    if name.is_empty() {
        return None;
    }
    Some(name.strip_suffix(".gz").unwrap_or(&name).to_string())
}

/// Local path of a `file://` index URL
pub fn local_index_path(url: &str) -> Option<PathBuf> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "file" {
        return None;
    }
    parsed.to_file_path().ok()
}

impl IndexCache {
    /// Create a new index cache
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the index for `url` lives on disk
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        if let Some(local) = local_index_path(url) {
            return Some(local);
        }
        index_file_name(url).map(|name| self.cache_dir.join(name))
    }

    /// Existing index files for `urls`, in the same order
    pub fn existing_files(&self, urls: &[String]) -> Vec<PathBuf> {
        urls.iter()
            .filter_map(|url| self.path_for_url(url))
            .filter(|path| path.exists())
            .collect()
    }
}
