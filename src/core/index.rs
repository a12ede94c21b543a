//! Package index documents
//!
//! Package indexes are JSON documents listing packages, their platform
//! releases and their tool releases. Merging an index into a [`Catalog`] is
//! a union: entries are created or augmented, never removed, so loading the
//! same document twice leaves the catalog unchanged.
//!
//! The same format is written as `installed.json` next to every installed
//! platform so its metadata survives the removal of the index it came from.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::core::catalog::{
    BoardManifest, Catalog, DownloadResource, Flavor, LatestToolDependency, PlatformRelease,
    ToolDependency,
};
use crate::core::version::Version;
use crate::error::IndexError;

/// Download cache subdirectory for archives referenced by indexes
pub const ARCHIVE_CACHE_PATH: &str = "packages";

/// Top-level index document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(default)]
    pub packages: Vec<IndexPackage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexPackage {
    pub name: String,
    #[serde(default)]
    pub maintainer: String,
    #[serde(default, rename = "websiteURL", alias = "websiteUrl")]
    pub website_url: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub platforms: Vec<IndexPlatformRelease>,
    #[serde(default)]
    pub tools: Vec<IndexToolRelease>,
    #[serde(default)]
    pub help: IndexHelp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexHelp {
    #[serde(default)]
    pub online: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPlatformRelease {
    pub name: String,
    pub architecture: String,
    pub version: Version,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub archive_file_name: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: u64,
    #[serde(default)]
    pub boards: Vec<IndexBoard>,
    #[serde(default)]
    pub help: IndexHelp,
    #[serde(default)]
    pub tools_dependencies: Vec<IndexToolDependency>,
    #[serde(default)]
    pub discovery_dependencies: Vec<IndexLatestToolDependency>,
    #[serde(default)]
    pub monitor_dependencies: Vec<IndexLatestToolDependency>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexBoard {
    pub name: String,
    #[serde(default)]
    pub id: Vec<IndexBoardId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexBoardId {
    #[serde(default)]
    pub usb: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexToolDependency {
    pub packager: String,
    pub name: String,
    pub version: Version,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexLatestToolDependency {
    pub packager: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexToolRelease {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub systems: Vec<IndexFlavor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFlavor {
    pub host: String,
    pub url: String,
    #[serde(default)]
    pub archive_file_name: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: u64,
}

/// Sizes appear both as JSON numbers and as strings
fn deserialize_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(u64),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) if s.trim().is_empty() => Ok(0),
        Size::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Where an index document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Downloaded package index
    Remote,
    /// `installed.json` of an installed platform
    InstalledJson,
}

impl IndexDocument {
    /// Parse an index document
    pub fn from_json(content: &str, path: &Path) -> Result<Self, IndexError> {
        serde_json::from_str(content).map_err(|e| IndexError::ParseError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Read and parse an index file
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let content = std::fs::read_to_string(path).map_err(|e| IndexError::IoError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_json(&content, path)
    }

    /// Union this document into the catalog
    pub fn merge_into(&self, catalog: &mut Catalog, source: IndexSource) {
        for package in &self.packages {
            package.merge_into(catalog, source);
        }
    }

    /// Index describing a single platform release and the tools it needs
    pub fn from_platform_release(catalog: &Catalog, release: &PlatformRelease) -> Self {
        let package = catalog.package(&release.package);
        let resource = release.resource.clone().unwrap_or_default();

        let tools = release
            .tool_dependencies
            .iter()
            .filter(|dep| dep.packager == release.package)
            .filter_map(|dep| catalog.tool_release(&dep.release_id()))
            .map(|tool| IndexToolRelease {
                name: tool.name.clone(),
                version: tool.version.clone(),
                systems: tool
                    .flavors
                    .iter()
                    .map(|f| IndexFlavor {
                        host: f.os.clone(),
                        url: f.resource.url.clone(),
                        archive_file_name: f.resource.archive_file_name.clone(),
                        checksum: f.resource.checksum.clone(),
                        size: f.resource.size,
                    })
                    .collect(),
            })
            .collect();

        let platform = IndexPlatformRelease {
            name: release.name.clone(),
            architecture: release.architecture.clone(),
            version: release.version.clone(),
            deprecated: release.deprecated,
            category: release.category.clone(),
            url: resource.url,
            archive_file_name: resource.archive_file_name,
            checksum: resource.checksum,
            size: resource.size,
            boards: release
                .boards_manifest
                .iter()
                .map(|b| IndexBoard {
                    name: b.name.clone(),
                    id: b
                        .usb_ids
                        .iter()
                        .map(|usb| IndexBoardId { usb: usb.clone() })
                        .collect(),
                })
                .collect(),
            help: IndexHelp {
                online: release.help_online.clone(),
            },
            tools_dependencies: release
                .tool_dependencies
                .iter()
                .map(|d| IndexToolDependency {
                    packager: d.packager.clone(),
                    name: d.name.clone(),
                    version: d.version.clone(),
                })
                .collect(),
            discovery_dependencies: to_index_latest(&release.discovery_dependencies),
            monitor_dependencies: to_index_latest(&release.monitor_dependencies),
        };

        Self {
            packages: vec![IndexPackage {
                name: release.package.clone(),
                maintainer: package.map(|p| p.maintainer.clone()).unwrap_or_default(),
                website_url: package.map(|p| p.website_url.clone()).unwrap_or_default(),
                url: package.map(|p| p.url.clone()).unwrap_or_default(),
                email: package.map(|p| p.email.clone()).unwrap_or_default(),
                platforms: vec![platform],
                tools,
                help: IndexHelp {
                    online: package.map(|p| p.help_online.clone()).unwrap_or_default(),
                },
            }],
        }
    }

    /// Write the document as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| IndexError::WriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| IndexError::WriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }
}

fn to_index_latest(deps: &[LatestToolDependency]) -> Vec<IndexLatestToolDependency> {
    deps.iter()
        .map(|d| IndexLatestToolDependency {
            packager: d.packager.clone(),
            name: d.name.clone(),
        })
        .collect()
}

fn from_index_latest(deps: &[IndexLatestToolDependency]) -> Vec<LatestToolDependency> {
    deps.iter()
        .map(|d| LatestToolDependency {
            packager: d.packager.clone(),
            name: d.name.clone(),
        })
        .collect()
}

impl IndexPackage {
    fn merge_into(&self, catalog: &mut Catalog, source: IndexSource) {
        let package = catalog.get_or_create_package(&self.name);
        package.maintainer.clone_from(&self.maintainer);
        package.website_url.clone_from(&self.website_url);
        package.url.clone_from(&self.url);
        package.email.clone_from(&self.email);
        package.help_online.clone_from(&self.help.online);

        for tool in &self.tools {
            let release = package
                .get_or_create_tool(&tool.name)
                .get_or_create_release(&tool.version);
            release.merge_flavors(tool.systems.iter().map(|s| Flavor {
                os: s.host.clone(),
                resource: DownloadResource {
                    url: s.url.clone(),
                    archive_file_name: s.archive_file_name.clone(),
                    checksum: s.checksum.clone(),
                    size: s.size,
                    cache_path: ARCHIVE_CACHE_PATH.to_string(),
                },
            }));
        }

        for indexed in &self.platforms {
            let platform = package.get_or_create_platform(&indexed.architecture);
            if source == IndexSource::Remote {
                platform.indexed = true;
                platform.manually_installed = false;
            }
            let newest = platform
                .latest
                .as_ref()
                .map_or(true, |latest| indexed.version >= *latest);
            if newest {
                platform.latest = Some(indexed.version.clone());
                platform.deprecated = indexed.deprecated;
            }

            let release = platform.get_or_create_release(&indexed.version);
            release.name.clone_from(&indexed.name);
            release.category.clone_from(&indexed.category);
            release.deprecated = indexed.deprecated;
            release.help_online.clone_from(&indexed.help.online);
            release.missing_metadata = false;
            release.resource = Some(DownloadResource {
                url: indexed.url.clone(),
                archive_file_name: indexed.archive_file_name.clone(),
                checksum: indexed.checksum.clone(),
                size: indexed.size,
                cache_path: ARCHIVE_CACHE_PATH.to_string(),
            });
            release.boards_manifest = indexed
                .boards
                .iter()
                .map(|b| BoardManifest {
                    name: b.name.clone(),
                    usb_ids: b.id.iter().map(|id| id.usb.clone()).collect(),
                })
                .collect();
            release.tool_dependencies = indexed
                .tools_dependencies
                .iter()
                .map(|d| ToolDependency {
                    packager: d.packager.clone(),
                    name: d.name.clone(),
                    version: d.version.clone(),
                })
                .collect();
            release.discovery_dependencies = from_index_latest(&indexed.discovery_dependencies);
            release.monitor_dependencies = from_index_latest(&indexed.monitor_dependencies);
        }
    }
}
