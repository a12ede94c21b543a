//! Release versions
//!
//! Package indexes and on-disk directories carry versions that are not
//! always strict semver (`1.0`, `2`, `1.8.0-beta`, `7.3.0-atmel3.6.1-arduino7`).
//! [`Version`] coerces short forms to `MAJOR.MINOR.PATCH` and keeps anything
//! unparseable as an opaque string that sorts below every real version.
//!
//! The original spelling is preserved for directory names and display.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Errors related to version parsing
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    /// Invalid version format
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },
}

/// Relaxed release version
#[derive(Clone, Debug)]
pub struct Version {
    raw: String,
    parsed: Option<semver::Version>,
}

/// Pad `1` / `1.2` to `1.0.0` / `1.2.0`, keeping any pre-release or build suffix
fn coerce(raw: &str) -> Option<semver::Version> {
    if let Ok(v) = semver::Version::parse(raw) {
        return Some(v);
    }
    let split = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(split);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty()
        || parts.len() > 2
        || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let padded = match parts.len() {
        1 => format!("{}.0.0{suffix}", parts[0]),
        _ => format!("{}.{}.0{suffix}", parts[0], parts[1]),
    };
    semver::Version::parse(&padded).ok()
}

impl Version {
    /// Parse a version, keeping unparseable input as an opaque string
    pub fn parse_relaxed(raw: &str) -> Self {
        let raw = raw.trim();
        Self {
            raw: raw.to_string(),
            parsed: coerce(raw),
        }
    }

    /// Parse a version that must be semver after coercion
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let version = Self::parse_relaxed(raw);
        if version.parsed.is_none() {
            return Err(VersionError::InvalidVersion {
                version: raw.to_string(),
                reason: "not a semantic version".to_string(),
            });
        }
        Ok(version)
    }

    /// Original spelling
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Canonical form used for comparisons
    pub fn normalized(&self) -> String {
        self.parsed
            .as_ref()
            .map_or_else(|| self.raw.clone(), ToString::to_string)
    }

    /// `true` if the version was understood as semver
    pub fn is_semver(&self) -> bool {
        self.parsed.is_some()
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::parse_relaxed("0.0.0")
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_relaxed(&raw))
    }
}
