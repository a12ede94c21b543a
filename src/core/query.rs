//! Read-only catalog queries
//!
//! Board resolution and the lookups used by explorers. Everything here takes
//! `&Catalog` and is safe to call from any number of concurrent readers.

use std::collections::BTreeMap;

use crate::core::board::Board;
use crate::core::catalog::{Catalog, Package, Platform, PlatformRelease, ToolDependency, ToolRelease};
use crate::core::fqbn::Fqbn;
use crate::core::properties::{self, Properties};
use crate::error::ResolveError;

/// A board identifier expanded against the catalog
#[derive(Debug)]
pub struct ResolvedBoard<'a> {
    pub package: &'a Package,
    /// Installed release declaring the board
    pub platform_release: &'a PlatformRelease,
    pub board: &'a Board,
    /// Fully merged build properties
    pub build_properties: Properties,
    /// Release providing the core when the board borrows it from another vendor
    pub reference_platform_release: Option<&'a PlatformRelease>,
}

impl ResolvedBoard<'_> {
    /// Release whose core is compiled: the reference platform if any
    pub fn build_platform_release(&self) -> &PlatformRelease {
        self.reference_platform_release
            .unwrap_or(self.platform_release)
    }
}

/// Split `vendor:value` references used by `build.core` and `build.variant`
fn split_reference(value: &str) -> (Option<&str>, &str) {
    match value.split_once(':') {
        Some((vendor, rest)) => (Some(vendor), rest),
        None => (None, value),
    }
}

impl Catalog {
    /// Expand a board identifier into its release, board and build properties
    ///
    /// Lookup fails fast in this order: package, platform, installed release,
    /// board, configuration options, referenced platforms, tool dependencies.
    pub fn resolve_fqbn(&self, fqbn: &Fqbn) -> Result<ResolvedBoard<'_>, ResolveError> {
        let package = self
            .package(&fqbn.package)
            .ok_or_else(|| ResolveError::UnknownPackage {
                package: fqbn.package.clone(),
            })?;
        let platform = package
            .platforms
            .get(&fqbn.architecture)
            .ok_or_else(|| ResolveError::UnknownPlatform {
                package: fqbn.package.clone(),
                architecture: fqbn.architecture.clone(),
            })?;
        let platform_release =
            platform
                .installed_release()
                .ok_or_else(|| ResolveError::PlatformNotInstalled {
                    package: fqbn.package.clone(),
                    architecture: fqbn.architecture.clone(),
                })?;
        let board = platform_release
            .board(&fqbn.board_id)
            .ok_or_else(|| ResolveError::UnknownBoard {
                board: fqbn.board_id.clone(),
                platform: platform.key(),
            })?;

        let board_build_properties = board.build_properties(fqbn)?;

        let core = board_build_properties
            .expand_props_in_string(board_build_properties.get_or_empty("build.core"));
        let (core_vendor, core) = split_reference(&core);
        let core_release = match core_vendor {
            Some(vendor) => Some(self.referenced_release(vendor, &fqbn.architecture, fqbn)?),
            None => None,
        };

        let variant = board_build_properties
            .expand_props_in_string(board_build_properties.get_or_empty("build.variant"));
        let (variant_vendor, variant) = split_reference(&variant);
        let variant_release = match variant_vendor {
            Some(vendor) => Some(self.referenced_release(vendor, &fqbn.architecture, fqbn)?),
            None => None,
        };

        if let (Some(core_ref), Some(variant_ref)) = (core_release, variant_release) {
            if core_ref.id() != variant_ref.id() {
                return Err(ResolveError::ConflictingReferences {
                    core: core_ref.id().to_string(),
                    variant: variant_ref.id().to_string(),
                });
            }
        }

        let build_release = core_release.unwrap_or(platform_release);
        let required_tools = self.find_tools_required_for_build(platform_release, build_release)?;

        let mut props = Properties::new();
        if let Some(variant_ref) = variant_release {
            props.merge(&variant_ref.properties);
        }
        props.merge(&build_release.properties);
        if build_release.id() != platform_release.id() {
            props.merge(&platform_release.properties);
        }
        props.merge(&board_build_properties);
        props.merge(&platform_release.runtime_properties());

        if let Some(dir) = &build_release.install_dir {
            props.set_path("build.core.path", &dir.join("cores").join(core));
            props.set_path("build.system.path", &dir.join("system"));
        }
        props.set("build.core", core);
        if !variant.is_empty() {
            let variant_dir = variant_release
                .unwrap_or(platform_release)
                .install_dir
                .as_deref()
                .map(|dir| dir.join("variants").join(variant));
            if let Some(path) = variant_dir {
                props.set_path("build.variant.path", &path);
            }
            props.set("build.variant", variant);
        }

        for tool in self.all_installed_tool_releases() {
            props.merge(&tool.runtime_properties());
        }
        for tool in &required_tools {
            props.merge(&tool.runtime_properties());
        }

        props.set("runtime.os", properties::os_suffix());
        if !props.contains_key("build.board") {
            props.set(
                "build.board",
                format!("{}_{}", fqbn.architecture, fqbn.board_id).to_uppercase(),
            );
        }
        props.merge(self.custom_global_properties());

        Ok(ResolvedBoard {
            package,
            platform_release,
            board,
            build_properties: props,
            reference_platform_release: core_release.or(variant_release),
        })
    }

    fn referenced_release(
        &self,
        vendor: &str,
        architecture: &str,
        fqbn: &Fqbn,
    ) -> Result<&PlatformRelease, ResolveError> {
        let package = self
            .package(vendor)
            .ok_or_else(|| ResolveError::MissingReferencedPackage {
                package: vendor.to_string(),
                fqbn: fqbn.to_string(),
            })?;
        let platform = package.platforms.get(architecture).ok_or_else(|| {
            ResolveError::MissingReferencedPlatform {
                package: vendor.to_string(),
                architecture: architecture.to_string(),
                fqbn: fqbn.to_string(),
            }
        })?;
        platform
            .installed_release()
            .ok_or_else(|| ResolveError::MissingReferencedRelease {
                package: vendor.to_string(),
                architecture: architecture.to_string(),
                fqbn: fqbn.to_string(),
            })
    }

    /// Drop configuration options that equal the board's defaults
    pub fn normalize_fqbn(&self, fqbn: &Fqbn) -> Result<Fqbn, ResolveError> {
        let resolved = self.resolve_fqbn(fqbn)?;
        let defaults = resolved.board.default_config();
        let mut configs = Properties::new();
        for (option, value) in fqbn.configs.iter() {
            if defaults.get(option) != Some(value) {
                configs.set(option, value);
            }
        }
        Ok(fqbn.with_configs(configs))
    }

    /// Tool releases needed to build for `platform_release`
    ///
    /// Declared dependencies of both releases come first. Every other
    /// installed tool name contributes one release, chosen by: packager of
    /// the board's platform, then packager of the build platform, then
    /// highest version, then packager name.
    pub fn find_tools_required_for_build(
        &self,
        platform_release: &PlatformRelease,
        build_release: &PlatformRelease,
    ) -> Result<Vec<&ToolRelease>, ResolveError> {
        let mut alternatives: BTreeMap<&str, Vec<&ToolRelease>> = BTreeMap::new();
        for tool in self.all_installed_tool_releases() {
            alternatives.entry(tool.name.as_str()).or_default().push(tool);
        }

        let mut required = Vec::new();
        let mut declared = platform_release.tool_dependencies.iter().collect::<Vec<_>>();
        if build_release.id() != platform_release.id() {
            declared.extend(build_release.tool_dependencies.iter());
        }
        for dep in declared {
            let tool = self
                .find_tool_dependency(dep)
                .filter(|t| t.is_installed())
                .ok_or_else(|| ResolveError::MissingTool {
                    tool: dep.to_string(),
                })?;
            alternatives.remove(tool.name.as_str());
            if !required.iter().any(|r: &&ToolRelease| r.id() == tool.id()) {
                required.push(tool);
            }
        }

        let priority = |tool: &ToolRelease| -> u8 {
            if tool.packager == platform_release.package {
                2
            } else if tool.packager == build_release.package {
                1
            } else {
                0
            }
        };
        for candidates in alternatives.into_values() {
            let best = candidates.into_iter().reduce(|selected, tool| {
                let (p_tool, p_sel) = (priority(tool), priority(selected));
                if p_tool != p_sel {
                    return if p_tool > p_sel { tool } else { selected };
                }
                if tool.version != selected.version {
                    return if tool.version > selected.version {
                        tool
                    } else {
                        selected
                    };
                }
                if tool.packager < selected.packager {
                    tool
                } else {
                    selected
                }
            });
            required.extend(best);
        }
        Ok(required)
    }

    /// Exact tool release named by a dependency
    pub fn find_tool_dependency(&self, dep: &ToolDependency) -> Option<&ToolRelease> {
        self.tool_release(&dep.release_id())
    }

    /// Every release currently installed, including older coexisting versions
    pub fn all_installed_platform_releases(&self) -> impl Iterator<Item = &PlatformRelease> {
        self.packages()
            .flat_map(|p| p.platforms.values())
            .flat_map(|p| p.releases.values())
            .filter(|r| r.is_installed())
    }

    /// `true` if any installed platform release depends on this tool release
    ///
    /// Discovery and monitor dependencies count for the tool's latest release.
    pub fn is_tool_required(&self, tool: &ToolRelease) -> bool {
        self.tool_users(tool).next().is_some()
    }

    /// Installed platform releases depending on this tool release
    pub fn tool_users<'a>(
        &'a self,
        tool: &'a ToolRelease,
    ) -> impl Iterator<Item = &'a PlatformRelease> + 'a {
        let is_latest = self
            .package(&tool.packager)
            .and_then(|p| p.tools.get(&tool.name))
            .and_then(|t| t.latest_release())
            .is_some_and(|latest| latest.version == tool.version);
        self.all_installed_platform_releases()
            .filter(move |release| release.requires_tool_release(tool, is_latest))
    }

    /// Boards of every installed platform
    pub fn installed_boards(&self) -> Vec<&Board> {
        self.installed_platform_releases()
            .into_iter()
            .flat_map(|r| r.boards.iter())
            .collect()
    }

    /// Installed boards with the given id, across all vendors
    pub fn find_boards_with_id(&self, board_id: &str) -> Vec<&Board> {
        self.installed_boards()
            .into_iter()
            .filter(|b| b.id == board_id)
            .collect()
    }

    /// Installed boards declaring a USB vendor/product id pair
    pub fn find_boards_with_usb_id(&self, vid: &str, pid: &str) -> Vec<&Board> {
        self.installed_boards()
            .into_iter()
            .filter(|b| b.has_usb_id(vid, pid))
            .collect()
    }

    /// Platforms whose identifiers, names or boards contain every query term
    ///
    /// Matching is case-insensitive; an empty query matches everything.
    pub fn search_platforms(&self, query: &str) -> Vec<&Platform> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        self.packages()
            .flat_map(|p| p.platforms.values())
            .filter(|platform| {
                let Some(release) = platform
                    .installed_release()
                    .or_else(|| platform.latest_release())
                else {
                    return false;
                };
                let mut haystack = format!(
                    "{} {} {}",
                    platform.key(),
                    release.name,
                    release.category
                );
                for board in &release.boards_manifest {
                    haystack.push(' ');
                    haystack.push_str(&board.name);
                }
                for board in &release.boards {
                    haystack.push(' ');
                    haystack.push_str(board.name());
                }
                let haystack = haystack.to_lowercase();
                terms.iter().all(|t| haystack.contains(t.as_str()))
            })
            .collect()
    }
}
