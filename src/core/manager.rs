//! Catalog access coordination
//!
//! The catalog is published as an immutable snapshot behind an atomically
//! swapped handle:
//!
//! - an [`Explorer`] pins the snapshot current at acquisition and can be held
//!   for as long as needed (a whole compile, say);
//! - a [`Builder`] works on a private copy and publishes it on
//!   [`Builder::commit`]. Dropping a builder without committing discards it.
//!
//! Only one builder is open at a time. Explorers are unbounded.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::core::catalog::{Catalog, PlatformReleaseId};
use crate::core::loader;
use crate::error::{CoordinatorError, LoadError};
use crate::infra::dirs::PlatmanDirs;
use crate::infra::host::HostPlatform;

/// Lifecycle state of a platform release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallState {
    NotInstalled,
    Installing,
    Installed,
    Uninstalling,
}

#[derive(Debug)]
struct Shared {
    dirs: PlatmanDirs,
    host: HostPlatform,
    current: RwLock<Arc<Catalog>>,
    /// Bumped on every commit
    generation: AtomicU64,
    builder_lock: Arc<tokio::sync::Mutex<()>>,
    /// Transient states of releases with an operation in flight
    transient: Mutex<HashMap<PlatformReleaseId, InstallState>>,
    /// Serializes install/uninstall/upgrade requests
    lifecycle_lock: tokio::sync::Mutex<()>,
}

/// Handle to the shared catalog; cheap to clone
#[derive(Debug, Clone)]
pub struct PackageManager {
    shared: Arc<Shared>,
}

impl PackageManager {
    /// Manager with an empty catalog (only the builtin package)
    pub fn new(dirs: PlatmanDirs, host: HostPlatform) -> Self {
        Self {
            shared: Arc::new(Shared {
                dirs,
                host,
                current: RwLock::new(Arc::new(Catalog::new())),
                generation: AtomicU64::new(0),
                builder_lock: Arc::new(tokio::sync::Mutex::new(())),
                transient: Mutex::new(HashMap::new()),
                lifecycle_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn dirs(&self) -> &PlatmanDirs {
        &self.shared.dirs
    }

    pub fn host(&self) -> &HostPlatform {
        &self.shared.host
    }

    /// Read-only view of the current snapshot
    pub fn new_explorer(&self) -> Explorer {
        Explorer {
            catalog: self.shared.current.read().clone(),
            shared: self.shared.clone(),
        }
    }

    /// Open the exclusive builder session, waiting for any other one to end
    pub async fn new_builder(&self) -> Builder {
        let guard = self.shared.builder_lock.clone().lock_owned().await;
        self.open_builder(guard)
    }

    /// Open the builder session unless another one is open
    pub fn try_new_builder(&self) -> Result<Builder, CoordinatorError> {
        let guard = self
            .shared
            .builder_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| CoordinatorError::BuilderBusy)?;
        Ok(self.open_builder(guard))
    }

    fn open_builder(&self, guard: OwnedMutexGuard<()>) -> Builder {
        let current = self.shared.current.read();
        debug!(generation = self.generation(), "Builder session opened");
        Builder {
            catalog: Catalog::clone(&current),
            base_generation: self.generation(),
            shared: self.shared.clone(),
            _guard: guard,
        }
    }

    /// Number of commits so far
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Mark a release as having an operation in flight until the guard drops
    pub(crate) fn enter_state(&self, id: &PlatformReleaseId, state: InstallState) -> StateGuard {
        self.shared.transient.lock().insert(id.clone(), state);
        StateGuard {
            id: id.clone(),
            shared: self.shared.clone(),
        }
    }

    pub(crate) async fn lifecycle_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.shared.lifecycle_lock.lock().await
    }

    /// Rebuild the catalog from index files and the packages root
    ///
    /// Index files load in order. Problems with individual files are returned
    /// as warnings; a missing packages root fails only when no index loaded.
    pub async fn load_all(&self, index_files: &[PathBuf]) -> Result<Vec<LoadError>, LoadError> {
        let mut builder = self.new_builder().await;
        builder.clear();
        let warnings = builder.load_all(index_files)?;
        builder.commit();
        Ok(warnings)
    }
}

/// Clears a transient state when dropped
#[derive(Debug)]
pub(crate) struct StateGuard {
    id: PlatformReleaseId,
    shared: Arc<Shared>,
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        self.shared.transient.lock().remove(&self.id);
    }
}

/// Pinned read-only snapshot
#[derive(Debug, Clone)]
pub struct Explorer {
    catalog: Arc<Catalog>,
    shared: Arc<Shared>,
}

impl Explorer {
    /// Live lifecycle state; transient states override the snapshot
    pub fn install_state(&self, id: &PlatformReleaseId) -> InstallState {
        if let Some(state) = self.shared.transient.lock().get(id) {
            return *state;
        }
        match self.catalog.platform_release(id) {
            Some(release) if release.is_installed() => InstallState::Installed,
            _ => InstallState::NotInstalled,
        }
    }

    pub fn host(&self) -> &HostPlatform {
        &self.shared.host
    }

    pub fn dirs(&self) -> &PlatmanDirs {
        &self.shared.dirs
    }
}

impl Deref for Explorer {
    type Target = Catalog;

    fn deref(&self) -> &Catalog {
        &self.catalog
    }
}

/// Exclusive session staging changes on a private copy of the catalog
#[derive(Debug)]
pub struct Builder {
    catalog: Catalog,
    base_generation: u64,
    shared: Arc<Shared>,
    _guard: OwnedMutexGuard<()>,
}

impl Builder {
    /// Start over from an empty catalog
    pub fn clear(&mut self) {
        self.catalog = Catalog::new();
    }

    /// Load index files in order, then scan the packages root
    pub fn load_all(&mut self, index_files: &[PathBuf]) -> Result<Vec<LoadError>, LoadError> {
        let mut warnings = Vec::new();
        let mut indexes_loaded = 0;
        for file in index_files {
            match loader::load_package_index_from_file(&mut self.catalog, file) {
                Ok(()) => indexes_loaded += 1,
                Err(e) => {
                    warn!(index = %file.display(), error = %e, "Skipping package index");
                    warnings.push(LoadError::Index(e));
                }
            }
        }

        let packages_dir = self.shared.dirs.packages_dir();
        if !packages_dir.exists() {
            if indexes_loaded == 0 {
                return Err(LoadError::NothingToLoad { path: packages_dir });
            }
            return Ok(warnings);
        }

        for error in loader::load_hardware_from_directory(&mut self.catalog, &packages_dir) {
            warn!(error = %error, "Problem loading installed hardware");
            warnings.push(error);
        }
        Ok(warnings)
    }

    /// Publish the staged catalog
    ///
    /// # Panics
    ///
    /// If another commit happened since this session opened.
    pub fn commit(mut self) {
        self.catalog.calculate_compatible_releases(&self.shared.host);
        let mut current = self.shared.current.write();
        let generation = self.shared.generation.load(Ordering::SeqCst);
        assert_eq!(
            generation, self.base_generation,
            "catalog committed by another builder while this one was open"
        );
        *current = Arc::new(self.catalog);
        self.shared.generation.store(generation + 1, Ordering::SeqCst);
        info!(generation = generation + 1, "Catalog committed");
    }
}

impl Deref for Builder {
    type Target = Catalog;

    fn deref(&self) -> &Catalog {
        &self.catalog
    }
}

impl DerefMut for Builder {
    fn deref_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }
}
