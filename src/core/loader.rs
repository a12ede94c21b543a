//! Filesystem scanner
//!
//! Discovers installed platforms and tools under a packages root:
//!
//! ```text
//! root/<package>/hardware/<architecture>/<version>/{boards.txt,platform.txt,...}
//! root/<package>/tools/<tool>/<version>/...
//! ```
//!
//! A legacy layout without the version level (`root/<package>/<architecture>/boards.txt`)
//! is accepted too; its version comes from the `version` property of
//! `platform.txt`. Presence of the release directory is what makes a release
//! installed. Directories still carrying the install-in-progress marker are
//! reported and skipped.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::defaults::{INSTALLED_JSON, INSTALLING_MARKER};
use crate::core::catalog::{Catalog, LatestToolDependency, Programmer};
use crate::core::index::{IndexDocument, IndexSource};
use crate::core::properties::{self, Properties};
use crate::core::version::Version;
use crate::error::{IndexError, LoadError};

/// Non-hidden subdirectories of `path`, sorted by name
fn subdirs(path: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| LoadError::IoError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type().is_dir() && !hidden {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `true` if an interrupted install left this directory behind
pub fn is_incomplete_install(dir: &Path) -> bool {
    dir.join(INSTALLING_MARKER).exists()
}

fn load_props(path: &Path) -> Result<Properties, LoadError> {
    Properties::safe_load_from_path(path).map_err(|error| LoadError::Properties {
        path: path.to_path_buf(),
        error,
    })
}

/// Merge an index file into the catalog
pub fn load_package_index_from_file(catalog: &mut Catalog, path: &Path) -> Result<(), IndexError> {
    let document = IndexDocument::load(path)?;
    document.merge_into(catalog, IndexSource::Remote);
    info!(index = %path.display(), "Loaded package index");
    Ok(())
}

/// Scan a packages root, returning every non-fatal problem found
pub fn load_hardware_from_directory(catalog: &mut Catalog, root: &Path) -> Vec<LoadError> {
    let mut errors = Vec::new();

    if !root.is_dir() {
        errors.push(LoadError::NotADirectory {
            path: root.to_path_buf(),
        });
        return errors;
    }

    let global_platform_txt = root.join("platform.txt");
    if global_platform_txt.exists() {
        info!(path = %global_platform_txt.display(), "Loading custom platform properties");
        match load_props(&global_platform_txt) {
            Ok(props) => catalog.custom_global_properties_mut().merge(&props),
            Err(e) => errors.push(e),
        }
    }

    let packagers = match subdirs(root) {
        Ok(dirs) => dirs,
        Err(e) => {
            errors.push(e);
            return errors;
        }
    };

    for packager_dir in packagers {
        let packager = base_name(&packager_dir);
        if packager == "tools" {
            debug!(path = %packager_dir.display(), "Excluding directory");
            continue;
        }

        let hardware_dir = packager_dir.join("hardware");
        let architectures_parent = if hardware_dir.is_dir() {
            hardware_dir
        } else {
            packager_dir.clone()
        };

        catalog.get_or_create_package(&packager);
        errors.extend(load_platforms(catalog, &packager, &architectures_parent));

        let tools_dir = packager_dir.join("tools");
        if tools_dir.is_dir() {
            errors.extend(load_tools(catalog, &packager, &tools_dir));
        }

        catalog.remove_package_if_empty(&packager);
    }

    errors
}

fn load_platforms(catalog: &mut Catalog, packager: &str, parent: &Path) -> Vec<LoadError> {
    let dirs = match subdirs(parent) {
        Ok(dirs) => dirs,
        Err(e) => return vec![e],
    };
    let mut errors = Vec::new();
    for platform_dir in dirs {
        if base_name(&platform_dir) == "tools" {
            continue;
        }
        errors.extend(load_platform(catalog, packager, &platform_dir));
    }
    errors
}

fn load_platform(catalog: &mut Catalog, packager: &str, platform_dir: &Path) -> Vec<LoadError> {
    let architecture = base_name(platform_dir);

    if platform_dir.join("boards.txt").exists() {
        return match load_legacy_platform(catalog, packager, &architecture, platform_dir) {
            Ok(()) => Vec::new(),
            Err(e) => vec![e],
        };
    }

    let versions = match subdirs(platform_dir) {
        Ok(dirs) => dirs,
        Err(e) => return vec![e],
    };

    let mut errors = Vec::new();
    for version_dir in versions {
        if !version_dir.join("boards.txt").exists() {
            continue;
        }
        if is_incomplete_install(&version_dir) {
            warn!(path = %version_dir.display(), "Skipping incomplete installation");
            errors.push(LoadError::IncompleteInstall { path: version_dir });
            continue;
        }
        let Ok(version) = Version::parse(&base_name(&version_dir)) else {
            errors.push(LoadError::InvalidVersionDir { path: version_dir });
            continue;
        };
        match load_platform_release(catalog, packager, &architecture, &version, &version_dir) {
            Ok(()) => info!(platform = %format!("{packager}:{architecture}@{version}"), "Loaded platform"),
            Err(e) => errors.push(e),
        }
    }
    errors
}

/// `ARCHITECTURE/boards.txt` layout, versioned by `platform.txt`
fn load_legacy_platform(
    catalog: &mut Catalog,
    packager: &str,
    architecture: &str,
    dir: &Path,
) -> Result<(), LoadError> {
    let platform_txt = dir.join("platform.txt");
    let props = load_props(&platform_txt)?;
    let raw = props.expand_props_in_string(props.get_or_empty("version"));
    let version = Version::parse(&raw).map_err(|_| LoadError::InvalidVersion {
        path: platform_txt.clone(),
        version: raw.clone(),
    })?;

    catalog
        .get_or_create_package(packager)
        .get_or_create_platform(architecture)
        .manually_installed = true;
    load_platform_release(catalog, packager, architecture, &version, dir)?;
    info!(platform = %format!("{packager}:{architecture}@{version}"), "Loaded legacy platform");
    Ok(())
}

/// Contents of a release directory, read before touching the catalog
struct ReleaseFiles {
    properties: Properties,
    boards: Properties,
    board_ids: Vec<String>,
    programmers: Vec<(String, Programmer)>,
    monitors: Vec<(String, LatestToolDependency)>,
}

fn read_boards(dir: &Path) -> Result<(Properties, Vec<String>), LoadError> {
    let boards_txt = dir.join("boards.txt");
    let content = std::fs::read_to_string(&boards_txt).map_err(|e| LoadError::IoError {
        path: boards_txt.clone(),
        error: e.to_string(),
    })?;

    let mut declared = std::collections::HashSet::new();
    let lines = properties::parse_lines(&content, &boards_txt.display().to_string()).map_err(
        |error| LoadError::Properties {
            path: boards_txt.clone(),
            error,
        },
    )?;
    for (_, key, _) in &lines {
        if let Some((board, "name")) = key.split_once('.') {
            if board != "menu" && !declared.insert(board.to_string()) {
                return Err(LoadError::DuplicateBoard {
                    board: board.to_string(),
                    path: boards_txt,
                });
            }
        }
    }

    let mut boards = Properties::load_from_str(&content).map_err(|error| LoadError::Properties {
        path: boards_txt.clone(),
        error,
    })?;
    boards.merge(&load_props(&dir.join("boards.local.txt"))?);

    let ids = boards
        .first_level_keys()
        .into_iter()
        .filter(|id| id != "menu")
        .collect();
    Ok((boards, ids))
}

fn read_release_files(dir: &Path) -> Result<ReleaseFiles, LoadError> {
    let mut props = load_props(&dir.join("platform.txt"))?;
    props.merge(&load_props(&dir.join("platform.local.txt"))?);

    let programmers = load_props(&dir.join("programmers.txt"))?
        .first_level_of()
        .into_iter()
        .map(|(id, p)| {
            let programmer = Programmer {
                name: p.get_or_empty("name").to_string(),
                properties: p,
            };
            (id, programmer)
        })
        .collect();

    let mut monitors = Vec::new();
    for (protocol, reference) in props.sub_tree("pluggable_monitor.required").iter() {
        let Some((packager, name)) = reference.split_once(':') else {
            return Err(LoadError::InvalidMonitorReference {
                reference: reference.to_string(),
                path: dir.join("platform.txt"),
            });
        };
        monitors.push((
            protocol.to_string(),
            LatestToolDependency {
                packager: packager.to_string(),
                name: name.to_string(),
            },
        ));
    }

    let (boards, board_ids) = read_boards(dir)?;

    Ok(ReleaseFiles {
        properties: props,
        boards,
        board_ids,
        programmers,
        monitors,
    })
}

/// Load one installed platform release directory into the catalog
pub fn load_platform_release(
    catalog: &mut Catalog,
    packager: &str,
    architecture: &str,
    version: &Version,
    dir: &Path,
) -> Result<(), LoadError> {
    let installed_json = dir.join(INSTALLED_JSON);
    let metadata = if installed_json.exists() {
        Some(IndexDocument::load(&installed_json)?)
    } else {
        None
    };
    let has_installed_json = metadata.is_some();

    // nothing reaches the catalog unless the whole release reads cleanly
    let files = read_release_files(dir)?;
    if let Some(document) = metadata {
        document.merge_into(catalog, IndexSource::InstalledJson);
    }

    let platform = catalog
        .get_or_create_package(packager)
        .get_or_create_platform(architecture);
    if !platform.indexed {
        platform.manually_installed = true;
    }
    let release = platform.get_or_create_release(version);

    release.install_dir = Some(dir.to_path_buf());
    release.missing_metadata = release.resource.is_none() && !has_installed_json;
    release.properties = files.properties;
    if release.name.is_empty() {
        release.name = match release.properties.get("name") {
            Some(name) => name.to_string(),
            None => format!("{packager}-{architecture}"),
        };
    }
    release.programmers = files.programmers.into_iter().collect();
    release.monitors = files.monitors.into_iter().collect();
    release.menus = files.boards.sub_tree("menu");

    release.boards.clear();
    for board_id in files.board_ids {
        let mut board_props = files.boards.sub_tree(&board_id);
        if board_props.is_empty() {
            continue;
        }
        board_props.set("_id", board_id.as_str());
        release.get_or_create_board(&board_id).properties = board_props;
    }

    Ok(())
}

fn load_tools(catalog: &mut Catalog, packager: &str, tools_dir: &Path) -> Vec<LoadError> {
    let tool_dirs = match subdirs(tools_dir) {
        Ok(dirs) => dirs,
        Err(e) => return vec![e],
    };
    let mut errors = Vec::new();
    for tool_dir in tool_dirs {
        let name = base_name(&tool_dir);
        let versions = match subdirs(&tool_dir) {
            Ok(dirs) => dirs,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        for version_dir in versions {
            if is_incomplete_install(&version_dir) {
                warn!(path = %version_dir.display(), "Skipping incomplete tool installation");
                errors.push(LoadError::IncompleteInstall { path: version_dir });
                continue;
            }
            let version = Version::parse_relaxed(&base_name(&version_dir));
            load_tool_release(catalog, packager, &name, &version, &version_dir);
        }
    }
    errors
}

/// Mark a tool release installed at `dir`
pub fn load_tool_release(
    catalog: &mut Catalog,
    packager: &str,
    name: &str,
    version: &Version,
    dir: &Path,
) {
    let release = catalog
        .get_or_create_package(packager)
        .get_or_create_tool(name)
        .get_or_create_release(version);
    release.install_dir = Some(dir.to_path_buf());
    debug!(tool = %release, "Loaded tool");
}
