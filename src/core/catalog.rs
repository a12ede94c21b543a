//! Catalog data model
//!
//! The catalog is a tree of plain owned values:
//!
//! - [`Package`] owns its [`Platform`]s and [`Tool`]s
//! - [`Platform`] owns one [`PlatformRelease`] per version
//! - [`PlatformRelease`] owns its [`Board`]s
//!
//! Everything else (tool dependencies, a board's release, referenced cores)
//! is a key resolved against the catalog when needed, so a snapshot can be
//! cloned and swapped without fixing up pointers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::board::Board;
use crate::core::properties::Properties;
use crate::core::version::Version;
use crate::infra::host::HostPlatform;

/// Pseudo-package holding tools bundled with the application
pub const BUILTIN_PACKAGE: &str = "builtin";

/// Key of a platform release: `package:architecture@version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlatformReleaseId {
    pub package: String,
    pub architecture: String,
    pub version: Version,
}

impl PlatformReleaseId {
    pub fn new(package: &str, architecture: &str, version: Version) -> Self {
        Self {
            package: package.to_string(),
            architecture: architecture.to_string(),
            version,
        }
    }

    /// `package:architecture` without the version
    pub fn platform_key(&self) -> String {
        format!("{}:{}", self.package, self.architecture)
    }
}

impl fmt::Display for PlatformReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.package, self.architecture, self.version)
    }
}

/// Key of a tool release: `packager:name@version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolReleaseId {
    pub packager: String,
    pub name: String,
    pub version: Version,
}

impl fmt::Display for ToolReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.packager, self.name, self.version)
    }
}

/// Tool required by a platform release, looked up by name at use time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolDependency {
    pub packager: String,
    pub name: String,
    pub version: Version,
}

impl ToolDependency {
    pub fn release_id(&self) -> ToolReleaseId {
        ToolReleaseId {
            packager: self.packager.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

impl fmt::Display for ToolDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.packager, self.name, self.version)
    }
}

/// Discovery or monitor tool; always resolved to the latest release
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LatestToolDependency {
    pub packager: String,
    pub name: String,
}

impl fmt::Display for LatestToolDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.packager, self.name)
    }
}

/// Downloadable archive declared by an index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadResource {
    pub url: String,
    pub archive_file_name: String,
    /// `ALGORITHM:hex`, e.g. `SHA-256:...`
    pub checksum: String,
    pub size: u64,
    /// Subdirectory of the download cache
    pub cache_path: String,
}

impl DownloadResource {
    /// Where the archive is cached under `download_dir`
    pub fn archive_path(&self, download_dir: &Path) -> PathBuf {
        download_dir
            .join(&self.cache_path)
            .join(&self.archive_file_name)
    }
}

/// Board entry of an index, known before installation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoardManifest {
    pub name: String,
    pub usb_ids: Vec<String>,
}

/// Upload programmer declared in `programmers.txt`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Programmer {
    pub name: String,
    pub properties: Properties,
}

/// One OS-specific archive of a tool release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flavor {
    /// Host triple, or `all`
    pub os: String,
    pub resource: DownloadResource,
}

/// Vendor namespace
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub name: String,
    pub maintainer: String,
    pub website_url: String,
    pub url: String,
    pub email: String,
    pub help_online: String,
    pub platforms: BTreeMap<String, Platform>,
    pub tools: BTreeMap<String, Tool>,
}

impl Package {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn get_or_create_platform(&mut self, architecture: &str) -> &mut Platform {
        let package = self.name.clone();
        self.platforms
            .entry(architecture.to_string())
            .or_insert_with(|| Platform::new(&package, architecture))
    }

    pub fn get_or_create_tool(&mut self, name: &str) -> &mut Tool {
        let package = self.name.clone();
        self.tools
            .entry(name.to_string())
            .or_insert_with(|| Tool::new(&package, name))
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty() && self.tools.is_empty()
    }
}

/// One architecture of a package
#[derive(Debug, Clone, Default)]
pub struct Platform {
    pub package: String,
    pub architecture: String,
    pub releases: BTreeMap<Version, PlatformRelease>,
    /// Found on disk but not declared by any index
    pub manually_installed: bool,
    /// Mirrors the latest indexed release
    pub deprecated: bool,
    /// Declared by at least one index
    pub indexed: bool,
    /// Highest version declared by an index
    pub latest: Option<Version>,
}

impl Platform {
    pub fn new(package: &str, architecture: &str) -> Self {
        Self {
            package: package.to_string(),
            architecture: architecture.to_string(),
            ..Self::default()
        }
    }

    pub fn get_or_create_release(&mut self, version: &Version) -> &mut PlatformRelease {
        let (package, architecture) = (self.package.clone(), self.architecture.clone());
        self.releases
            .entry(version.clone())
            .or_insert_with(|| PlatformRelease::new(&package, &architecture, version.clone()))
    }

    pub fn release(&self, version: &Version) -> Option<&PlatformRelease> {
        self.releases.get(version)
    }

    /// Highest installed release
    pub fn installed_release(&self) -> Option<&PlatformRelease> {
        self.releases.values().rev().find(|r| r.is_installed())
    }

    pub fn latest_release(&self) -> Option<&PlatformRelease> {
        self.releases.values().next_back()
    }

    /// Highest release whose tools can run on this host
    pub fn latest_compatible_release(&self) -> Option<&PlatformRelease> {
        self.releases.values().rev().find(|r| r.compatible)
    }

    pub fn is_installed(&self) -> bool {
        self.releases.values().any(PlatformRelease::is_installed)
    }

    /// `package:architecture`
    pub fn key(&self) -> String {
        format!("{}:{}", self.package, self.architecture)
    }
}

/// One version of a platform
#[derive(Debug, Clone, Default)]
pub struct PlatformRelease {
    pub package: String,
    pub architecture: String,
    pub version: Version,
    pub name: String,
    pub category: String,
    pub resource: Option<DownloadResource>,
    pub boards_manifest: Vec<BoardManifest>,
    pub tool_dependencies: Vec<ToolDependency>,
    pub discovery_dependencies: Vec<LatestToolDependency>,
    pub monitor_dependencies: Vec<LatestToolDependency>,
    pub deprecated: bool,
    pub help_online: String,
    /// Merged `platform.txt` and `platform.local.txt`
    pub properties: Properties,
    /// Boards in `boards.txt` declaration order
    pub boards: Vec<Board>,
    pub programmers: BTreeMap<String, Programmer>,
    /// `menu.*` labels from `boards.txt`
    pub menus: Properties,
    /// Protocol to monitor tool, from `pluggable_monitor.required.*`
    pub monitors: BTreeMap<String, LatestToolDependency>,
    /// Set when the release directory is present on disk
    pub install_dir: Option<PathBuf>,
    /// All tool dependencies resolve to something runnable here
    pub compatible: bool,
    /// Installed without any index or `installed.json` describing it
    pub missing_metadata: bool,
}

impl PlatformRelease {
    pub fn new(package: &str, architecture: &str, version: Version) -> Self {
        Self {
            package: package.to_string(),
            architecture: architecture.to_string(),
            version,
            ..Self::default()
        }
    }

    pub fn id(&self) -> PlatformReleaseId {
        PlatformReleaseId::new(&self.package, &self.architecture, self.version.clone())
    }

    pub fn is_installed(&self) -> bool {
        self.install_dir.is_some()
    }

    pub fn board(&self, board_id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == board_id)
    }

    pub fn get_or_create_board(&mut self, board_id: &str) -> &mut Board {
        if let Some(pos) = self.boards.iter().position(|b| b.id == board_id) {
            return &mut self.boards[pos];
        }
        let board = Board::new(board_id, self.id());
        self.boards.push(board);
        let last = self.boards.len() - 1;
        &mut self.boards[last]
    }

    /// `runtime.platform.path` and `runtime.hardware.path`
    pub fn runtime_properties(&self) -> Properties {
        let mut props = Properties::new();
        if let Some(dir) = &self.install_dir {
            props.set_path("runtime.platform.path", dir);
            if let Some(parent) = dir.parent() {
                props.set_path("runtime.hardware.path", parent);
            }
        }
        props
    }

    /// `true` if this release depends on that tool release
    ///
    /// Discovery and monitor dependencies carry no version and only hold on
    /// to the tool's latest release, which the caller tells through
    /// `is_latest`.
    pub fn requires_tool_release(&self, tool: &ToolRelease, is_latest: bool) -> bool {
        let exact = self.tool_dependencies.iter().any(|dep| {
            dep.packager == tool.packager && dep.name == tool.name && dep.version == tool.version
        });
        exact
            || (is_latest
                && self
                    .discovery_dependencies
                    .iter()
                    .chain(&self.monitor_dependencies)
                    .any(|dep| dep.packager == tool.packager && dep.name == tool.name))
    }
}

impl fmt::Display for PlatformRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Named utility of a package
#[derive(Debug, Clone, Default)]
pub struct Tool {
    pub package: String,
    pub name: String,
    pub releases: BTreeMap<Version, ToolRelease>,
}

impl Tool {
    pub fn new(package: &str, name: &str) -> Self {
        Self {
            package: package.to_string(),
            name: name.to_string(),
            releases: BTreeMap::new(),
        }
    }

    pub fn get_or_create_release(&mut self, version: &Version) -> &mut ToolRelease {
        let (package, name) = (self.package.clone(), self.name.clone());
        self.releases
            .entry(version.clone())
            .or_insert_with(|| ToolRelease::new(&package, &name, version.clone()))
    }

    pub fn latest_release(&self) -> Option<&ToolRelease> {
        self.releases.values().next_back()
    }
}

/// One version of a tool
#[derive(Debug, Clone, Default)]
pub struct ToolRelease {
    pub packager: String,
    pub name: String,
    pub version: Version,
    pub flavors: Vec<Flavor>,
    pub install_dir: Option<PathBuf>,
}

impl ToolRelease {
    pub fn new(packager: &str, name: &str, version: Version) -> Self {
        Self {
            packager: packager.to_string(),
            name: name.to_string(),
            version,
            ..Self::default()
        }
    }

    pub fn id(&self) -> ToolReleaseId {
        ToolReleaseId {
            packager: self.packager.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.install_dir.is_some()
    }

    /// Add flavors, ignoring hosts already present
    pub fn merge_flavors(&mut self, flavors: impl IntoIterator<Item = Flavor>) {
        for flavor in flavors {
            if !self.flavors.iter().any(|f| f.os == flavor.os) {
                self.flavors.push(flavor);
            }
        }
    }

    /// Best flavor for `host`; exact matches win over emulated ones
    pub fn compatible_flavor(&self, host: &HostPlatform) -> Option<&Flavor> {
        self.flavors
            .iter()
            .filter_map(|f| host.flavor_score(&f.os).map(|score| (score, f)))
            .max_by_key(|(score, _)| *score)
            .map(|(_, f)| f)
    }

    /// Installed, or downloadable for `host`
    pub fn is_compatible_with(&self, host: &HostPlatform) -> bool {
        self.is_installed() || self.compatible_flavor(host).is_some()
    }

    /// `runtime.tools.<name>.path` and `runtime.tools.<name>-<version>.path`
    pub fn runtime_properties(&self) -> Properties {
        let mut props = Properties::new();
        if let Some(dir) = &self.install_dir {
            props.set_path(format!("runtime.tools.{}.path", self.name), dir);
            props.set_path(
                format!("runtime.tools.{}-{}.path", self.name, self.version),
                dir,
            );
        }
        props
    }
}

impl fmt::Display for ToolRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// The whole model: packages plus the global `platform.txt` overrides
#[derive(Debug, Clone)]
pub struct Catalog {
    packages: BTreeMap<String, Package>,
    custom_global_properties: Properties,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Empty catalog holding only the builtin package
    pub fn new() -> Self {
        let mut packages = BTreeMap::new();
        packages.insert(BUILTIN_PACKAGE.to_string(), Package::new(BUILTIN_PACKAGE));
        Self {
            packages,
            custom_global_properties: Properties::new(),
        }
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn package_mut(&mut self, name: &str) -> Option<&mut Package> {
        self.packages.get_mut(name)
    }

    pub fn get_or_create_package(&mut self, name: &str) -> &mut Package {
        self.packages
            .entry(name.to_string())
            .or_insert_with(|| Package::new(name))
    }

    /// Drop a package that ended up with nothing in it
    pub(crate) fn remove_package_if_empty(&mut self, name: &str) {
        if name == BUILTIN_PACKAGE {
            return;
        }
        if self.packages.get(name).is_some_and(Package::is_empty) {
            self.packages.remove(name);
        }
    }

    pub fn custom_global_properties(&self) -> &Properties {
        &self.custom_global_properties
    }

    pub fn custom_global_properties_mut(&mut self) -> &mut Properties {
        &mut self.custom_global_properties
    }

    pub fn find_platform(&self, package: &str, architecture: &str) -> Option<&Platform> {
        self.packages.get(package)?.platforms.get(architecture)
    }

    pub fn platform_release(&self, id: &PlatformReleaseId) -> Option<&PlatformRelease> {
        self.find_platform(&id.package, &id.architecture)?
            .releases
            .get(&id.version)
    }

    pub fn platform_release_mut(&mut self, id: &PlatformReleaseId) -> Option<&mut PlatformRelease> {
        self.packages
            .get_mut(&id.package)?
            .platforms
            .get_mut(&id.architecture)?
            .releases
            .get_mut(&id.version)
    }

    pub fn tool_release(&self, id: &ToolReleaseId) -> Option<&ToolRelease> {
        self.packages
            .get(&id.packager)?
            .tools
            .get(&id.name)?
            .releases
            .get(&id.version)
    }

    pub fn tool_release_mut(&mut self, id: &ToolReleaseId) -> Option<&mut ToolRelease> {
        self.packages
            .get_mut(&id.packager)?
            .tools
            .get_mut(&id.name)?
            .releases
            .get_mut(&id.version)
    }

    /// Highest installed release of `package:architecture`
    pub fn installed_platform_release(
        &self,
        package: &str,
        architecture: &str,
    ) -> Option<&PlatformRelease> {
        self.find_platform(package, architecture)?.installed_release()
    }

    /// The installed release of every platform
    pub fn installed_platform_releases(&self) -> Vec<&PlatformRelease> {
        self.packages
            .values()
            .flat_map(|p| p.platforms.values())
            .filter_map(Platform::installed_release)
            .collect()
    }

    pub fn all_installed_tool_releases(&self) -> Vec<&ToolRelease> {
        self.packages
            .values()
            .flat_map(|p| p.tools.values())
            .flat_map(|t| t.releases.values())
            .filter(|r| r.is_installed())
            .collect()
    }

    /// Recompute [`PlatformRelease::compatible`] for every release
    pub fn calculate_compatible_releases(&mut self, host: &HostPlatform) {
        let mut verdicts = Vec::new();
        for package in self.packages.values() {
            for platform in package.platforms.values() {
                for release in platform.releases.values() {
                    let compatible = release.tool_dependencies.iter().all(|dep| {
                        self.tool_release(&dep.release_id())
                            .is_some_and(|tool| tool.is_compatible_with(host))
                    });
                    verdicts.push((release.id(), compatible));
                }
            }
        }
        for (id, compatible) in verdicts {
            if let Some(release) = self.platform_release_mut(&id) {
                release.compatible = compatible;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::host::{HostArch, HostOs};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn flavor(os: &str) -> Flavor {
        Flavor {
            os: os.to_string(),
            resource: DownloadResource {
                url: format!("https://example.com/{os}.tar.gz"),
                archive_file_name: format!("{os}.tar.gz"),
                ..DownloadResource::default()
            },
        }
    }

    #[test]
    fn test_new_catalog_has_builtin_package() {
        let catalog = Catalog::new();
        assert!(catalog.package(BUILTIN_PACKAGE).is_some());
    }

    #[test]
    fn test_builtin_package_is_never_pruned() {
        let mut catalog = Catalog::new();
        catalog.remove_package_if_empty(BUILTIN_PACKAGE);
        assert!(catalog.package(BUILTIN_PACKAGE).is_some());

        catalog.get_or_create_package("vendor");
        catalog.remove_package_if_empty("vendor");
        assert!(catalog.package("vendor").is_none());
    }

    #[test]
    fn test_one_release_per_version() {
        let mut catalog = Catalog::new();
        let platform = catalog.get_or_create_package("arduino").get_or_create_platform("avr");
        platform.get_or_create_release(&v("1.8.6")).name = "first".to_string();
        platform.get_or_create_release(&v("1.8.6")).category = "second".to_string();
        platform.get_or_create_release(&v("1.8"));

        assert_eq!(platform.releases.len(), 2);
        let release = platform.release(&v("1.8.6")).unwrap();
        assert_eq!(release.name, "first");
        assert_eq!(release.category, "second");
    }

    #[test]
    fn test_installed_release_is_highest_installed() {
        let mut platform = Platform::new("arduino", "avr");
        platform.get_or_create_release(&v("1.0.0")).install_dir = Some(PathBuf::from("/p/1.0.0"));
        platform.get_or_create_release(&v("1.2.0")).install_dir = Some(PathBuf::from("/p/1.2.0"));
        platform.get_or_create_release(&v("2.0.0"));

        assert_eq!(platform.installed_release().unwrap().version, v("1.2.0"));
        assert_eq!(platform.latest_release().unwrap().version, v("2.0.0"));
    }

    #[test]
    fn test_boards_keep_insertion_order() {
        let mut release = PlatformRelease::new("arduino", "avr", v("1.0.0"));
        release.get_or_create_board("uno");
        release.get_or_create_board("nano");
        release.get_or_create_board("uno");

        let ids: Vec<_> = release.boards.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["uno", "nano"]);
        assert_eq!(release.board("nano").unwrap().release, release.id());
    }

    #[test]
    fn test_tool_runtime_properties() {
        let mut tool = ToolRelease::new("arduino", "avr-gcc", v("7.3.0"));
        assert!(tool.runtime_properties().is_empty());

        tool.install_dir = Some(PathBuf::from("/pkgs/arduino/tools/avr-gcc/7.3.0"));
        let props = tool.runtime_properties();
        assert_eq!(
            props.get("runtime.tools.avr-gcc.path"),
            Some("/pkgs/arduino/tools/avr-gcc/7.3.0")
        );
        assert!(props.contains_key("runtime.tools.avr-gcc-7.3.0.path"));
    }

    #[test]
    fn test_platform_runtime_properties() {
        let mut release = PlatformRelease::new("arduino", "avr", v("1.8.6"));
        release.install_dir = Some(PathBuf::from("/pkgs/arduino/hardware/avr/1.8.6"));
        let props = release.runtime_properties();
        assert_eq!(props.get("runtime.hardware.path"), Some("/pkgs/arduino/hardware/avr"));
    }

    #[test]
    fn test_merge_flavors_skips_duplicate_hosts() {
        let mut tool = ToolRelease::new("arduino", "bossac", v("1.7.0"));
        tool.merge_flavors([flavor("x86_64-linux-gnu")]);
        tool.merge_flavors([flavor("x86_64-linux-gnu"), flavor("i686-mingw32")]);
        assert_eq!(tool.flavors.len(), 2);
    }

    #[test]
    fn test_compatible_flavor_prefers_exact_match() {
        let host = HostPlatform::new(HostOs::Windows, HostArch::X86_64);
        let mut tool = ToolRelease::new("arduino", "bossac", v("1.7.0"));
        tool.merge_flavors([flavor("i686-mingw32"), flavor("x86_64-mingw32")]);
        assert_eq!(tool.compatible_flavor(&host).unwrap().os, "x86_64-mingw32");
    }

    #[test]
    fn test_calculate_compatible_releases() {
        let host = HostPlatform::new(HostOs::Linux, HostArch::X86_64);
        let mut catalog = Catalog::new();
        let package = catalog.get_or_create_package("arduino");
        package
            .get_or_create_tool("gcc")
            .get_or_create_release(&v("1.0.0"))
            .merge_flavors([flavor("x86_64-pc-linux-gnu")]);
        package
            .get_or_create_tool("mac-only")
            .get_or_create_release(&v("1.0.0"))
            .merge_flavors([flavor("x86_64-apple-darwin")]);

        let platform = package.get_or_create_platform("avr");
        platform
            .get_or_create_release(&v("1.0.0"))
            .tool_dependencies
            .push(ToolDependency {
                packager: "arduino".to_string(),
                name: "gcc".to_string(),
                version: v("1.0.0"),
            });
        platform
            .get_or_create_release(&v("2.0.0"))
            .tool_dependencies
            .push(ToolDependency {
                packager: "arduino".to_string(),
                name: "mac-only".to_string(),
                version: v("1.0.0"),
            });

        catalog.calculate_compatible_releases(&host);
        let platform = catalog.find_platform("arduino", "avr").unwrap();
        assert!(platform.release(&v("1.0.0")).unwrap().compatible);
        assert!(!platform.release(&v("2.0.0")).unwrap().compatible);
        assert_eq!(
            platform.latest_compatible_release().unwrap().version,
            v("1.0.0")
        );
    }
}
