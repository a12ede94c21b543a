//! Archive extraction
//!
//! Unpacks `.tar.gz`, `.tar.bz2`, `.tar.xz`, `.tar` and `.zip` archives. When an archive
//! holds a single top-level directory, that directory's contents become the
//! destination, which is how vendor archives are usually packed.

use async_trait::async_trait;
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use xz2::read::XzDecoder;

use crate::error::ExtractError;

/// Unpacks an archive into a directory that must not exist yet
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    TarGz,
    TarBz2,
    TarXz,
    Tar,
    Zip,
}

impl ArchiveFormat {
    fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Extractor backed by the `tar`, `zip` and compression crates
#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for ArchiveExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError> {
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        // tar and zip are synchronous
        tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
            .await
            .map_err(|e| ExtractError::IoError {
                path: PathBuf::new(),
                error: e.to_string(),
            })?
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExtractError + '_ {
    move |e| ExtractError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}

/// Synchronous extraction (runs in `spawn_blocking`)
pub fn extract_blocking(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    let format = ArchiveFormat::detect(archive).ok_or_else(|| ExtractError::UnsupportedFormat {
        path: archive.to_path_buf(),
    })?;
    if dest.exists() {
        return Err(ExtractError::DestinationExists {
            path: dest.to_path_buf(),
        });
    }
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(io_error(parent))?;

    // Unpack next to the destination so the final move is a rename
    let scratch = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)
        .map_err(io_error(parent))?;

    let archive_error = |e: &dyn std::fmt::Display| ExtractError::Archive {
        path: archive.to_path_buf(),
        error: e.to_string(),
    };
    let file = File::open(archive).map_err(io_error(archive))?;
    match format {
        ArchiveFormat::TarGz => tar::Archive::new(GzDecoder::new(file))
            .unpack(scratch.path())
            .map_err(|e| archive_error(&e))?,
        ArchiveFormat::TarBz2 => tar::Archive::new(BzDecoder::new(file))
            .unpack(scratch.path())
            .map_err(|e| archive_error(&e))?,
        ArchiveFormat::TarXz => tar::Archive::new(XzDecoder::new(file))
            .unpack(scratch.path())
            .map_err(|e| archive_error(&e))?,
        ArchiveFormat::Tar => tar::Archive::new(file)
            .unpack(scratch.path())
            .map_err(|e| archive_error(&e))?,
        ArchiveFormat::Zip => zip::ZipArchive::new(file)
            .and_then(|mut zip| zip.extract(scratch.path()))
            .map_err(|e| archive_error(&e))?,
    }

    let root = single_root(scratch.path()).map_err(io_error(scratch.path()))?;
    let source = root.unwrap_or_else(|| scratch.path().to_path_buf());
    std::fs::rename(&source, dest).map_err(io_error(dest))?;
    tracing::debug!(archive = %archive.display(), dest = %dest.display(), "Extracted archive");
    Ok(())
}

/// The only entry of `dir`, when it is a directory
fn single_root(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    match entries.as_slice() {
        [only] if only.file_type()?.is_dir() => Ok(Some(only.path())),
        _ => Ok(None),
    }
}
