//! Dependency resolution
//!
//! Turns a platform reference into the concrete release and tool releases an
//! install would fetch, before anything is fetched.

use std::fmt;
use std::str::FromStr;

use crate::core::catalog::{Catalog, LatestToolDependency, PlatformRelease, ToolRelease};
use crate::core::version::Version;
use crate::error::DependencyError;

/// `package:architecture[@version]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformReference {
    pub package: String,
    pub architecture: String,
    /// `None` means the latest compatible release
    pub version: Option<Version>,
}

impl PlatformReference {
    pub fn new(package: &str, architecture: &str, version: Option<Version>) -> Self {
        Self {
            package: package.to_string(),
            architecture: architecture.to_string(),
            version,
        }
    }

    pub fn parse(input: &str) -> Result<Self, DependencyError> {
        let invalid = || DependencyError::InvalidReference {
            reference: input.to_string(),
        };
        let (platform, version) = match input.split_once('@') {
            Some((platform, version)) => {
                let version = Version::parse(version).map_err(|_| invalid())?;
                (platform, Some(version))
            }
            None => (input, None),
        };
        let (package, architecture) = platform.split_once(':').ok_or_else(invalid)?;
        if package.is_empty() || architecture.is_empty() || architecture.contains(':') {
            return Err(invalid());
        }
        Ok(Self::new(package, architecture, version))
    }

    /// `package:architecture`
    pub fn platform_key(&self) -> String {
        format!("{}:{}", self.package, self.architecture)
    }
}

impl FromStr for PlatformReference {
    type Err = DependencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PlatformReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}@{}", self.package, self.architecture, version),
            None => write!(f, "{}:{}", self.package, self.architecture),
        }
    }
}

fn push_unique<'a>(tools: &mut Vec<&'a ToolRelease>, tool: &'a ToolRelease) {
    if !tools.iter().any(|t| t.id() == tool.id()) {
        tools.push(tool);
    }
}

impl Catalog {
    /// Release named by `reference`; latest compatible one when unversioned
    pub fn find_platform_release(
        &self,
        reference: &PlatformReference,
    ) -> Result<&PlatformRelease, DependencyError> {
        let package =
            self.package(&reference.package)
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
        match &reference.version {
            Some(version) => {
                platform
                    .release(version)
                    .ok_or_else(|| DependencyError::VersionNotFound {
                        platform: platform.key(),
                        version: version.to_string(),
                    })
            }
            None => platform
                .latest_compatible_release()
                .ok_or_else(|| DependencyError::NoCompatibleRelease {
                    platform: platform.key(),
                }),
        }
    }

    /// Latest release of a discovery or monitor tool
    fn latest_tool_release(
        &self,
        platform: &PlatformRelease,
        dep: &LatestToolDependency,
    ) -> Result<&ToolRelease, DependencyError> {
        self.package(&dep.packager)
            .and_then(|p| p.tools.get(&dep.name))
            .and_then(|t| t.latest_release())
            .ok_or_else(|| DependencyError::ToolNotFound {
                platform: platform.id().to_string(),
                tool: dep.to_string(),
            })
    }

    /// The release plus every tool release it needs
    ///
    /// Tool dependencies resolve to their exact version; discovery and
    /// monitor dependencies resolve to the latest known release. Each tool
    /// release appears once.
    pub fn find_platform_release_dependencies(
        &self,
        reference: &PlatformReference,
    ) -> Result<(&PlatformRelease, Vec<&ToolRelease>), DependencyError> {
        let release = self.find_platform_release(reference)?;
        let mut tools: Vec<&ToolRelease> = Vec::new();
        for tool in self.dependency_releases(release) {
            push_unique(&mut tools, tool?);
        }
        Ok((release, tools))
    }

    /// Tool releases `release` needs that the catalog knows about
    ///
    /// Same set as [`Catalog::find_platform_release_dependencies`], minus the
    /// dependencies that no longer resolve.
    pub fn known_tool_dependencies<'a>(&'a self, release: &'a PlatformRelease) -> Vec<&'a ToolRelease> {
        let mut tools: Vec<&ToolRelease> = Vec::new();
        for tool in self.dependency_releases(release).filter_map(Result::ok) {
            push_unique(&mut tools, tool);
        }
        tools
    }

    fn dependency_releases<'a>(
        &'a self,
        release: &'a PlatformRelease,
    ) -> impl Iterator<Item = Result<&'a ToolRelease, DependencyError>> + 'a {
        let exact = release.tool_dependencies.iter().map(move |dep| {
            self.find_tool_dependency(dep)
                .ok_or_else(|| DependencyError::ToolNotFound {
                    platform: release.id().to_string(),
                    tool: dep.to_string(),
                })
        });
        let latest = release
            .discovery_dependencies
            .iter()
            .chain(&release.monitor_dependencies)
            .map(move |dep| self.latest_tool_release(release, dep));
        exact.chain(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::ToolDependency;
    use crate::infra::host::{HostArch, HostOs, HostPlatform};
    use std::path::PathBuf;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn dep(name: &str, ver: &str) -> ToolDependency {
        ToolDependency {
            packager: "arduino".to_string(),
            name: name.to_string(),
            version: v(ver),
        }
    }

    fn fixture() -> Catalog {
        let mut catalog = Catalog::new();
        let package = catalog.get_or_create_package("arduino");
        for (name, ver) in [("avr-gcc", "7.3.0"), ("avrdude", "6.3.0"), ("serial-discovery", "1.0.0"), ("serial-discovery", "1.2.0")] {
            package
                .get_or_create_tool(name)
                .get_or_create_release(&v(ver))
                .install_dir = Some(PathBuf::from(format!("/t/{name}/{ver}")));
        }
        let platform = package.get_or_create_platform("avr");
        let release = platform.get_or_create_release(&v("1.8.6"));
        release.tool_dependencies = vec![dep("avr-gcc", "7.3.0"), dep("avrdude", "6.3.0")];
        release.discovery_dependencies = vec![LatestToolDependency {
            packager: "arduino".to_string(),
            name: "serial-discovery".to_string(),
        }];
        release.monitor_dependencies = release.discovery_dependencies.clone();
        platform
            .get_or_create_release(&v("1.8.5"))
            .tool_dependencies = vec![dep("avr-gcc", "7.3.0")];
        catalog.calculate_compatible_releases(&HostPlatform::new(HostOs::Linux, HostArch::X86_64));
        catalog
    }

    #[test]
    fn test_parse_reference() {
        let r = PlatformReference::parse("arduino:avr@1.8.6").unwrap();
        assert_eq!(r.package, "arduino");
        assert_eq!(r.architecture, "avr");
        assert_eq!(r.version, Some(v("1.8.6")));
        assert_eq!(r.to_string(), "arduino:avr@1.8.6");

        let r: PlatformReference = "arduino:avr".parse().unwrap();
        assert_eq!(r.version, None);
    }

    #[test]
    fn test_parse_reference_invalid() {
        for input in ["arduino", ":avr", "arduino:", "a:b:c", "arduino:avr@nope"] {
            match PlatformReference::parse(input).unwrap_err() {
                DependencyError::InvalidReference { reference } => assert_eq!(reference, input),
                e => panic!("Expected InvalidReference error, got: {e:?}"),
            }
        }
    }

    #[test]
    fn test_unversioned_reference_picks_latest_compatible() {
        let catalog = fixture();
        let release = catalog
            .find_platform_release(&PlatformReference::parse("arduino:avr").unwrap())
            .unwrap();
        assert_eq!(release.version, v("1.8.6"));
    }

    #[test]
    fn test_dependencies_are_deduplicated() {
        let catalog = fixture();
        let (release, tools) = catalog
            .find_platform_release_dependencies(&PlatformReference::parse("arduino:avr@1.8.6").unwrap())
            .unwrap();
        assert_eq!(release.version, v("1.8.6"));
        let names: Vec<String> = tools.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "arduino:avr-gcc@7.3.0",
                "arduino:avrdude@6.3.0",
                "arduino:serial-discovery@1.2.0"
            ]
        );
    }

    #[test]
    fn test_not_found_errors() {
        let catalog = fixture();
        let cases = [
            ("acme:avr", "package"),
            ("arduino:sam", "platform"),
            ("arduino:avr@9.9.9", "version"),
        ];
        for (input, kind) in cases {
            let err = catalog
                .find_platform_release_dependencies(&PlatformReference::parse(input).unwrap())
                .unwrap_err();
            let ok = match kind {
                "package" => matches!(err, DependencyError::PackageNotFound { .. }),
                "platform" => matches!(err, DependencyError::PlatformNotFound { .. }),
                _ => matches!(err, DependencyError::VersionNotFound { .. }),
            };
            assert!(ok, "{input}: unexpected {err:?}");
        }
    }

    #[test]
    fn test_missing_tool_dependency() {
        let mut catalog = fixture();
        catalog
            .get_or_create_package("arduino")
            .get_or_create_platform("avr")
            .get_or_create_release(&v("2.0.0"))
            .tool_dependencies = vec![dep("arm-gcc", "1.0.0")];
        let err = catalog
            .find_platform_release_dependencies(&PlatformReference::parse("arduino:avr@2.0.0").unwrap())
            .unwrap_err();
        assert!(matches!(err, DependencyError::ToolNotFound { .. }));
    }

    #[test]
    fn test_known_tool_dependencies_include_discovery_tools() {
        let mut catalog = fixture();
        let release = catalog
            .get_or_create_package("arduino")
            .get_or_create_platform("avr")
            .get_or_create_release(&v("1.8.6"));
        release.tool_dependencies.push(dep("arm-gcc", "1.0.0"));

        let release = catalog
            .find_platform_release(&PlatformReference::parse("arduino:avr@1.8.6").unwrap())
            .unwrap();
        let names: Vec<String> = catalog
            .known_tool_dependencies(release)
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "arduino:avr-gcc@7.3.0",
                "arduino:avrdude@6.3.0",
                "arduino:serial-discovery@1.2.0"
            ]
        );
    }

    #[test]
    fn test_no_compatible_release() {
        let mut catalog = Catalog::new();
        catalog
            .get_or_create_package("acme")
            .get_or_create_platform("riscv")
            .get_or_create_release(&v("1.0.0"))
            .tool_dependencies = vec![ToolDependency {
            packager: "acme".to_string(),
            name: "missing".to_string(),
            version: v("1.0.0"),
        }];
        catalog.calculate_compatible_releases(&HostPlatform::new(HostOs::Linux, HostArch::X86_64));

        let err = catalog
            .find_platform_release(&PlatformReference::parse("acme:riscv").unwrap())
            .unwrap_err();
        assert!(matches!(err, DependencyError::NoCompatibleRelease { .. }));
    }
}
