//! Platform lifecycle
//!
//! Install, uninstall and upgrade of platform releases together with the tool
//! releases they need. Disk work happens outside builder sessions; the catalog
//! is only touched to commit the result.
//!
//! A release is unpacked in a scratch directory, marked with the in-progress
//! marker, moved into place and unmarked once its post-install hook ran and
//! its `installed.json` is written. A failed install removes every release
//! directory it created.
//!
//! Operations are serialized: two platform installs sharing a tool never race
//! on it, the second one finds the tool installed.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::defaults::{
    self, INSTALLED_JSON, INSTALLING_MARKER, POST_INSTALL_HOOK, PRE_UNINSTALL_HOOK,
};
use crate::core::catalog::{
    Catalog, DownloadResource, PlatformRelease, PlatformReleaseId, ToolReleaseId,
};
use crate::core::global_config::GlobalConfig;
use crate::core::index::IndexDocument;
use crate::core::loader;
use crate::core::manager::{Explorer, InstallState, PackageManager};
use crate::core::progress::{DownloadProgress, Progress, TaskProgress};
use crate::core::resolver::PlatformReference;
use crate::error::{
    DependencyError, FilesystemError, HookError, InstallError, UninstallError, UpgradeError,
};
use crate::infra::download::{verify_checksum, Downloader};
use crate::infra::extract::Extractor;
use crate::infra::filesystem;
use crate::infra::process::{hook_command_line, hook_script, ProcessRunner};

/// Lifecycle behavior switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    pub skip_post_install: bool,
    pub skip_pre_uninstall: bool,
    /// Replace another installed version of the same platform
    pub allow_overwrite: bool,
    /// Fail instead of warning when a hook exits non-zero
    pub hooks_mandatory: bool,
    /// Tool archives fetched and unpacked concurrently
    pub parallel_downloads: usize,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            skip_post_install: false,
            skip_pre_uninstall: false,
            allow_overwrite: true,
            hooks_mandatory: false,
            parallel_downloads: defaults::DEFAULT_PARALLEL_DOWNLOADS,
        }
    }
}

impl From<&GlobalConfig> for InstallOptions {
    fn from(config: &GlobalConfig) -> Self {
        let install = &config.install;
        Self {
            skip_post_install: install.skip_post_install.unwrap_or(false),
            skip_pre_uninstall: install.skip_pre_uninstall.unwrap_or(false),
            allow_overwrite: install.allow_overwrite.unwrap_or(true),
            hooks_mandatory: install.hooks_mandatory.unwrap_or(false),
            parallel_downloads: config.parallel_downloads(),
        }
    }
}

/// Result of [`Installer::install`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Nothing to do; no archive was fetched
    AlreadyInstalled(PlatformReleaseId),
    Installed {
        release: PlatformReleaseId,
        /// Tool releases installed along with it
        tools: Vec<ToolReleaseId>,
        /// Version removed because overwrite was allowed
        replaced: Option<PlatformReleaseId>,
    },
}

/// Result of [`Installer::uninstall`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    NotInstalled,
    Uninstalled {
        release: PlatformReleaseId,
        /// Tool releases no other installed platform needed
        removed_tools: Vec<ToolReleaseId>,
    },
}

/// Result of [`Installer::upgrade`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    AlreadyLatest(PlatformReleaseId),
    Upgraded {
        from: PlatformReleaseId,
        to: PlatformReleaseId,
    },
}

/// One archive and the release directory it becomes
#[derive(Debug, Clone)]
struct Unit {
    label: String,
    resource: DownloadResource,
    archive: PathBuf,
    dest: PathBuf,
}

/// Everything an install does, computed before touching disk
struct InstallPlan {
    release: PlatformReleaseId,
    platform: Unit,
    installed_json: IndexDocument,
    tools: Vec<(ToolReleaseId, Unit)>,
    previous: Option<PlatformReleaseId>,
}

enum Planned {
    AlreadyInstalled(PlatformReleaseId),
    Ready(InstallPlan),
}

fn platform_dir(packages_dir: &Path, id: &PlatformReleaseId) -> PathBuf {
    packages_dir
        .join(&id.package)
        .join("hardware")
        .join(&id.architecture)
        .join(id.version.to_string())
}

fn tool_dir(packages_dir: &Path, id: &ToolReleaseId) -> PathBuf {
    packages_dir
        .join(&id.packager)
        .join("tools")
        .join(&id.name)
        .join(id.version.to_string())
}

/// Remove a release directory and the parents it leaves empty
fn remove_release_dir(dir: &Path, packages_dir: &Path) -> Result<(), FilesystemError> {
    filesystem::remove_dir_all(dir)?;
    filesystem::remove_empty_parents(dir, packages_dir)
}

fn cleanup(dirs: &[PathBuf], packages_dir: &Path) {
    for dir in dirs {
        if let Err(e) = remove_release_dir(dir, packages_dir) {
            warn!(path = %dir.display(), error = %e, "Failed to clean up release directory");
        }
    }
}

/// Highest installed release of the referenced platform
fn installed_release_id(
    catalog: &Catalog,
    reference: &PlatformReference,
) -> Result<Option<PlatformReleaseId>, DependencyError> {
    let package =
        catalog
            .package(&reference.package)
            .ok_or_else(|| DependencyError::PackageNotFound {
                package: reference.package.clone(),
            })?;
    let platform = package
        .platforms
        .get(&reference.architecture)
        .ok_or_else(|| DependencyError::PlatformNotFound {
            package: reference.package.clone(),
            architecture: reference.architecture.clone(),
        })?;
    Ok(platform.installed_release().map(PlatformRelease::id))
}

/// Mark a release uninstalled; drop it when no index describes it
fn forget_platform_release(catalog: &mut Catalog, id: &PlatformReleaseId) {
    let Some(package) = catalog.package_mut(&id.package) else {
        return;
    };
    let Some(platform) = package.platforms.get_mut(&id.architecture) else {
        return;
    };
    let indexed = match platform.releases.get_mut(&id.version) {
        Some(release) => {
            release.install_dir = None;
            release.resource.is_some()
        }
        None => return,
    };
    if !indexed {
        platform.releases.remove(&id.version);
        if platform.releases.is_empty() {
            package.platforms.remove(&id.architecture);
        }
        catalog.remove_package_if_empty(&id.package);
    }
}

/// Drives installs, uninstalls and upgrades against a [`PackageManager`]
pub struct Installer {
    manager: PackageManager,
    downloader: Arc<dyn Downloader>,
    extractor: Arc<dyn Extractor>,
    runner: Arc<dyn ProcessRunner>,
    options: InstallOptions,
    cancel: CancellationToken,
}

impl Installer {
    pub fn new(
        manager: PackageManager,
        downloader: Arc<dyn Downloader>,
        extractor: Arc<dyn Extractor>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            manager,
            downloader,
            extractor,
            runner,
            options: InstallOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    /// Stop at the next download, extraction or hook once `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn manager(&self) -> &PackageManager {
        &self.manager
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Install a platform release and the tools it needs
    ///
    /// Installing an installed release succeeds without doing anything. With
    /// overwrite allowed, another installed version of the platform is
    /// uninstalled after the new one is in place.
    pub async fn install(
        &self,
        reference: &PlatformReference,
        progress: &Progress,
    ) -> Result<InstallOutcome, InstallError> {
        let _lock = self.manager.lifecycle_lock().await;
        self.install_locked(reference, progress).await
    }

    /// Uninstall a platform release and the tools nothing else needs
    ///
    /// Without a version, the installed release is removed. Uninstalling a
    /// release that is not installed succeeds without doing anything.
    pub async fn uninstall(
        &self,
        reference: &PlatformReference,
        progress: &Progress,
    ) -> Result<UninstallOutcome, UninstallError> {
        let _lock = self.manager.lifecycle_lock().await;
        let target = {
            let explorer = self.manager.new_explorer();
            match &reference.version {
                Some(_) => Some(explorer.find_platform_release(reference)?.id()),
                // a platform only known from disk is gone after its uninstall
                None => match installed_release_id(&explorer, reference) {
                    Ok(id) => id,
                    Err(
                        DependencyError::PackageNotFound { .. }
                        | DependencyError::PlatformNotFound { .. },
                    ) => None,
                    Err(e) => return Err(e.into()),
                },
            }
        };
        match target {
            Some(id) => self.uninstall_locked(&id, &[], progress).await,
            None => Ok(UninstallOutcome::NotInstalled),
        }
    }

    /// Replace the installed release with the latest compatible one
    ///
    /// The old release is removed before the new one is installed. If the
    /// install then fails the platform is left uninstalled and
    /// [`UpgradeError::PartiallyApplied`] is returned.
    pub async fn upgrade(
        &self,
        reference: &PlatformReference,
        progress: &Progress,
    ) -> Result<UpgradeOutcome, UpgradeError> {
        let _lock = self.manager.lifecycle_lock().await;
        let (installed, mut plan, keep) = {
            let explorer = self.manager.new_explorer();
            let installed = installed_release_id(&explorer, reference)?.ok_or_else(|| {
                UpgradeError::NotInstalled {
                    platform: reference.platform_key(),
                }
            })?;
            let target = explorer.find_platform_release(reference)?;
            if target.version <= installed.version {
                info!(release = %installed, "Already at the latest version");
                return Ok(UpgradeOutcome::AlreadyLatest(installed));
            }
            let (_, tools) = explorer.find_platform_release_dependencies(reference)?;
            let keep: Vec<ToolReleaseId> = tools.iter().map(|t| t.id()).collect();
            let plan = match self.plan(&explorer, reference, true)? {
                Planned::Ready(plan) => plan,
                Planned::AlreadyInstalled(id) => return Ok(UpgradeOutcome::AlreadyLatest(id)),
            };
            (installed, plan, keep)
        };
        plan.previous = None;

        self.uninstall_locked(&installed, &keep, progress).await?;

        let target = plan.release.clone();
        match self.execute(plan, progress).await {
            Ok(_) => {
                info!(from = %installed, to = %target, "Upgraded");
                Ok(UpgradeOutcome::Upgraded {
                    from: installed,
                    to: target,
                })
            }
            Err(source) => Err(UpgradeError::PartiallyApplied {
                platform: reference.platform_key(),
                removed: installed.to_string(),
                target: target.to_string(),
                source: Box::new(source),
            }),
        }
    }

    async fn install_locked(
        &self,
        reference: &PlatformReference,
        progress: &Progress,
    ) -> Result<InstallOutcome, InstallError> {
        let planned = {
            let explorer = self.manager.new_explorer();
            self.plan(&explorer, reference, self.options.allow_overwrite)?
        };
        let plan = match planned {
            Planned::AlreadyInstalled(id) => {
                info!(release = %id, "Already installed");
                return Ok(InstallOutcome::AlreadyInstalled(id));
            }
            Planned::Ready(plan) => plan,
        };

        let previous = plan.previous.clone();
        let outcome = self.execute(plan, progress).await?;
        let Some(previous) = previous else {
            return Ok(outcome);
        };
        let (release, tools) = match outcome {
            InstallOutcome::Installed { release, tools, .. } => (release, tools),
            InstallOutcome::AlreadyInstalled(_) => return Ok(outcome),
        };

        match self.uninstall_locked(&previous, &[], progress).await {
            Ok(_) => Ok(InstallOutcome::Installed {
                release,
                tools,
                replaced: Some(previous),
            }),
            Err(source) => {
                warn!(old = %previous, new = %release, error = %source, "Rolling back replacement");
                if let Err(e) = self.uninstall_locked(&release, &[], progress).await {
                    warn!(release = %release, error = %e, "Rollback failed");
                }
                Err(InstallError::ReplaceFailed {
                    old: previous.to_string(),
                    new: release.to_string(),
                    source: Box::new(source),
                })
            }
        }
    }

    fn plan(
        &self,
        explorer: &Explorer,
        reference: &PlatformReference,
        allow_overwrite: bool,
    ) -> Result<Planned, InstallError> {
        let (release, tools) = explorer.find_platform_release_dependencies(reference)?;
        let id = release.id();
        if release.is_installed() {
            return Ok(Planned::AlreadyInstalled(id));
        }

        let previous = explorer
            .installed_platform_release(&id.package, &id.architecture)
            .map(PlatformRelease::id);
        if let Some(previous) = &previous {
            if !allow_overwrite {
                return Err(InstallError::OtherVersionInstalled {
                    platform: id.platform_key(),
                    installed: previous.version.to_string(),
                });
            }
        }

        let packages_dir = self.manager.dirs().packages_dir();
        let staging_dir = self.manager.dirs().staging_dir();

        let resource = release
            .resource
            .clone()
            .ok_or_else(|| InstallError::MissingResource {
                item: id.to_string(),
            })?;
        let platform = Unit {
            label: id.to_string(),
            archive: resource.archive_path(&staging_dir),
            dest: platform_dir(&packages_dir, &id),
            resource,
        };

        let mut tool_units = Vec::new();
        for tool in tools.into_iter().filter(|t| !t.is_installed()) {
            let tool_id = tool.id();
            let flavor = tool.compatible_flavor(explorer.host()).ok_or_else(|| {
                InstallError::NoCompatibleFlavor {
                    tool: tool_id.to_string(),
                }
            })?;
            let unit = Unit {
                label: tool_id.to_string(),
                resource: flavor.resource.clone(),
                archive: flavor.resource.archive_path(&staging_dir),
                dest: tool_dir(&packages_dir, &tool_id),
            };
            tool_units.push((tool_id, unit));
        }

        Ok(Planned::Ready(InstallPlan {
            installed_json: IndexDocument::from_platform_release(explorer, release),
            release: id,
            platform,
            tools: tool_units,
            previous,
        }))
    }

    async fn execute(
        &self,
        plan: InstallPlan,
        progress: &Progress,
    ) -> Result<InstallOutcome, InstallError> {
        let _state = self
            .manager
            .enter_state(&plan.release, InstallState::Installing);
        let task = format!("Installing {}", plan.release);
        progress.task(&TaskProgress::started(&task));

        let result = self.fetch_and_place(&plan, progress).await;
        let created = match result {
            Ok(created) => created,
            Err(e) => {
                progress.task(&TaskProgress::completed(&task, "failed"));
                return Err(e);
            }
        };

        let packages_dir = self.manager.dirs().packages_dir();
        let mut builder = self.manager.new_builder().await;
        for (tool_id, unit) in &plan.tools {
            loader::load_tool_release(
                &mut builder,
                &tool_id.packager,
                &tool_id.name,
                &tool_id.version,
                &unit.dest,
            );
        }
        let id = &plan.release;
        if let Err(source) = loader::load_platform_release(
            &mut builder,
            &id.package,
            &id.architecture,
            &id.version,
            &plan.platform.dest,
        ) {
            drop(builder);
            cleanup(&created, &packages_dir);
            progress.task(&TaskProgress::completed(&task, "failed"));
            return Err(InstallError::Load {
                item: id.to_string(),
                source,
            });
        }
        builder.commit();

        info!(release = %plan.release, tools = plan.tools.len(), "Installed");
        progress.task(&TaskProgress::completed(&task, "installed"));
        Ok(InstallOutcome::Installed {
            release: plan.release,
            tools: plan.tools.into_iter().map(|(id, _)| id).collect(),
            replaced: None,
        })
    }

    /// Download every archive, then unpack tools and the platform
    ///
    /// Returns the release directories created. On failure none of them is
    /// left behind.
    async fn fetch_and_place(
        &self,
        plan: &InstallPlan,
        progress: &Progress,
    ) -> Result<Vec<PathBuf>, InstallError> {
        let parallel = self.options.parallel_downloads.max(1);
        let units = plan
            .tools
            .iter()
            .map(|(_, unit)| unit)
            .chain(std::iter::once(&plan.platform));
        let downloads: Vec<_> = stream::iter(units.cloned().collect::<Vec<_>>())
            .map(|unit| async move { self.fetch(&unit, progress).await }.boxed())
            .buffer_unordered(parallel)
            .collect()
            .await;
        for result in downloads {
            result?;
        }

        let tool_units: Vec<Unit> = plan.tools.iter().map(|(_, unit)| unit.clone()).collect();
        let placed: Vec<_> = stream::iter(tool_units)
            .map(|unit| {
                async move { self.place(&unit, None).await.map(|()| unit.dest) }.boxed()
            })
            .buffer_unordered(parallel)
            .collect()
            .await;

        let mut created = Vec::new();
        let mut failure = None;
        for result in placed {
            match result {
                Ok(dir) => created.push(dir),
                Err(e) if failure.is_none() => failure = Some(e),
                Err(e) => debug!(error = %e, "Further tool install failure"),
            }
        }
        if failure.is_none() {
            match self.place(&plan.platform, Some(&plan.installed_json)).await {
                Ok(()) => created.push(plan.platform.dest.clone()),
                Err(e) => failure = Some(e),
            }
        }

        match failure {
            Some(error) => {
                cleanup(&created, &self.manager.dirs().packages_dir());
                Err(error)
            }
            None => Ok(created),
        }
    }

    /// Fetch an archive into the staging area unless a verified copy is there
    async fn fetch(&self, unit: &Unit, progress: &Progress) -> Result<(), InstallError> {
        if unit.archive.exists()
            && verify_checksum(&unit.archive, &unit.resource.checksum)
                .await
                .unwrap_or(false)
        {
            debug!(archive = %unit.archive.display(), "Archive already downloaded");
            return Ok(());
        }

        progress.download(&DownloadProgress::Start {
            label: unit.label.clone(),
            url: unit.resource.url.clone(),
        });
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(InstallError::Cancelled),
            result = self.downloader.download(
                &unit.resource.url,
                &unit.archive,
                &unit.resource.checksum,
                progress.byte_callback(&unit.label),
            ) => result.map(|_| ()).map_err(|source| InstallError::Download {
                item: unit.label.clone(),
                source,
            }),
        };
        progress.download(&DownloadProgress::End {
            label: unit.label.clone(),
            success: result.is_ok(),
            message: match &result {
                Ok(()) => format!("{} downloaded", unit.label),
                Err(e) => e.to_string(),
            },
        });
        result
    }

    /// Unpack a unit into its release directory and finish it
    ///
    /// On failure the release directory is gone again.
    async fn place(
        &self,
        unit: &Unit,
        installed_json: Option<&IndexDocument>,
    ) -> Result<(), InstallError> {
        self.unpack(unit).await?;
        let result = self.finish(unit, installed_json).await;
        if result.is_err() {
            cleanup(
                std::slice::from_ref(&unit.dest),
                &self.manager.dirs().packages_dir(),
            );
        }
        result
    }

    async fn unpack(&self, unit: &Unit) -> Result<(), InstallError> {
        if self.cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        let tmp_dir = self.manager.dirs().tmp_dir();
        filesystem::create_dir_all(&tmp_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("install-")
            .tempdir_in(&tmp_dir)
            .map_err(|e| FilesystemError::CreateDir {
                path: tmp_dir.clone(),
                error: e.to_string(),
            })?;
        let staged = scratch.path().join("release");

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(InstallError::Cancelled),
            result = self.extractor.extract(&unit.archive, &staged) => {
                result.map_err(|source| InstallError::Extract {
                    item: unit.label.clone(),
                    source,
                })?;
            }
        }
        filesystem::write_file(&staged.join(INSTALLING_MARKER), "")?;

        if unit.dest.exists() {
            if !loader::is_incomplete_install(&unit.dest) {
                return Err(FilesystemError::Rename {
                    from: staged,
                    to: unit.dest.clone(),
                    error: "destination already exists".to_string(),
                }
                .into());
            }
            debug!(path = %unit.dest.display(), "Replacing incomplete installation");
            filesystem::remove_dir_all(&unit.dest)?;
        }
        filesystem::rename(&staged, &unit.dest)?;
        Ok(())
    }

    async fn finish(
        &self,
        unit: &Unit,
        installed_json: Option<&IndexDocument>,
    ) -> Result<(), InstallError> {
        if !self.options.skip_post_install {
            if self.cancel.is_cancelled() {
                return Err(InstallError::Cancelled);
            }
            self.run_hook(&unit.dest, POST_INSTALL_HOOK)
                .await
                .map_err(|source| InstallError::Hook {
                    item: unit.label.clone(),
                    source,
                })?;
        }
        if let Some(document) = installed_json {
            document.save(&unit.dest.join(INSTALLED_JSON))?;
        }
        filesystem::remove_file(&unit.dest.join(INSTALLING_MARKER))?;
        Ok(())
    }

    /// Run `hook` from `dir` if the release ships it
    async fn run_hook(&self, dir: &Path, hook: &str) -> Result<(), HookError> {
        let host = self.manager.host();
        let script = hook_script(dir, hook, host);
        if !script.exists() {
            return Ok(());
        }
        let command_line = hook_command_line(&script, host);
        let command = command_line.join(" ");

        let failure = match self.runner.run(&command_line, dir, &[]).await {
            Ok(0) => {
                debug!(command = %command, "Hook succeeded");
                return Ok(());
            }
            Ok(code) => HookError::Failed { command, code },
            Err(e) => e,
        };
        if self.options.hooks_mandatory {
            return Err(failure);
        }
        warn!(error = %failure, "Hook failed, continuing");
        Ok(())
    }

    async fn uninstall_locked(
        &self,
        id: &PlatformReleaseId,
        keep: &[ToolReleaseId],
        progress: &Progress,
    ) -> Result<UninstallOutcome, UninstallError> {
        let packages_dir = self.manager.dirs().packages_dir();
        let (dir, unused_tools) = {
            let explorer = self.manager.new_explorer();
            let Some(release) = explorer.platform_release(id) else {
                return Ok(UninstallOutcome::NotInstalled);
            };
            let Some(dir) = release.install_dir.clone() else {
                return Ok(UninstallOutcome::NotInstalled);
            };
            let unused: Vec<(ToolReleaseId, PathBuf)> = explorer
                .known_tool_dependencies(release)
                .into_iter()
                .filter(|tool| !keep.contains(&tool.id()))
                .filter(|tool| explorer.tool_users(tool).all(|user| user.id() == *id))
                .filter_map(|tool| tool.install_dir.clone().map(|d| (tool.id(), d)))
                .collect();
            (dir, unused)
        };
        if !dir.starts_with(&packages_dir) {
            return Err(UninstallError::NotManaged { path: dir });
        }

        let _state = self.manager.enter_state(id, InstallState::Uninstalling);
        let task = format!("Uninstalling {id}");
        progress.task(&TaskProgress::started(&task));

        if !self.options.skip_pre_uninstall {
            self.run_hook(&dir, PRE_UNINSTALL_HOOK)
                .await
                .map_err(|source| UninstallError::Hook {
                    item: id.to_string(),
                    source,
                })?;
        }
        remove_release_dir(&dir, &packages_dir)?;

        let mut removed_tools = Vec::new();
        for (tool_id, tool_dir) in unused_tools {
            if !tool_dir.starts_with(&packages_dir) {
                warn!(tool = %tool_id, path = %tool_dir.display(), "Tool not managed by platman, keeping it");
                continue;
            }
            if !self.options.skip_pre_uninstall {
                if let Err(e) = self.run_hook(&tool_dir, PRE_UNINSTALL_HOOK).await {
                    warn!(tool = %tool_id, error = %e, "Tool pre-uninstall hook failed, keeping it");
                    continue;
                }
            }
            if let Err(e) = remove_release_dir(&tool_dir, &packages_dir) {
                warn!(tool = %tool_id, error = %e, "Failed to remove tool");
                continue;
            }
            debug!(tool = %tool_id, "Removed tool no longer required");
            removed_tools.push(tool_id);
        }

        let mut builder = self.manager.new_builder().await;
        forget_platform_release(&mut builder, id);
        for tool_id in &removed_tools {
            if let Some(tool) = builder.tool_release_mut(tool_id) {
                tool.install_dir = None;
            }
        }
        builder.commit();

        info!(release = %id, tools = removed_tools.len(), "Uninstalled");
        progress.task(&TaskProgress::completed(&task, "uninstalled"));
        Ok(UninstallOutcome::Uninstalled {
            release: id.clone(),
            removed_tools,
        })
    }
}
