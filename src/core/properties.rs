//! Ordered property maps
//!
//! Platform, board and programmer definitions are flat `key=value` files
//! (`platform.txt`, `boards.txt`, `programmers.txt`). Declaration order is
//! significant: it decides board listing order and default menu values, so
//! the map keeps keys in first-insertion order.
//!
//! Keys ending in `.<os>` for the running OS (`linux`, `windows`, `macosx`,
//! `freebsd`) override the unsuffixed key regardless of where they appear.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::error::PropertiesError;

/// Maximum number of `{key}` substitution passes
const MAX_EXPANSION_PASSES: usize = 10;

/// OS suffixes understood in property keys
const OS_SUFFIXES: &[&str] = &["linux", "windows", "macosx", "freebsd"];

/// Property-file OS suffix for the running host
pub fn os_suffix() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "macos" => "macosx",
        "freebsd" => "freebsd",
        _ => "linux",
    }
}

/// Insertion-ordered `key=value` map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    keys: Vec<String>,
    values: HashMap<String, String>,
}

/// Split property file content into `(line number, key, value)` entries
///
/// Blank lines and `#` comments are skipped, keys and values are trimmed.
pub(crate) fn parse_lines(
    content: &str,
    source_name: &str,
) -> Result<Vec<(usize, String, String)>, PropertiesError> {
    let mut entries = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(PropertiesError::InvalidLine {
                source_name: source_name.to_string(),
                line: idx + 1,
            });
        };
        entries.push((idx + 1, key.trim().to_string(), value.trim().to_string()));
    }
    Ok(entries)
}

impl Properties {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse property file content
    pub fn load_from_str(content: &str) -> Result<Self, PropertiesError> {
        Self::parse_named(content, "<string>")
    }

    fn parse_named(content: &str, source_name: &str) -> Result<Self, PropertiesError> {
        let current = os_suffix();
        let mut props = Self::new();
        let mut os_specific = HashSet::new();

        for (_, key, value) in parse_lines(content, source_name)? {
            match key.rsplit_once('.') {
                Some((base, suffix)) if suffix == current => {
                    os_specific.insert(base.to_string());
                    props.set(base, value);
                }
                _ if os_specific.contains(&key) => {}
                _ => props.set(key, value),
            }
        }
        Ok(props)
    }

    /// Load a property file
    pub fn load_from_path(path: &Path) -> Result<Self, PropertiesError> {
        let content = std::fs::read_to_string(path).map_err(|e| PropertiesError::IoError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::parse_named(&content, &path.display().to_string())
    }

    /// Load a property file, treating a missing file as empty
    pub fn safe_load_from_path(path: &Path) -> Result<Self, PropertiesError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        Self::load_from_path(path)
    }

    /// Build a map from ordered pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut props = Self::new();
        for (k, v) in pairs {
            props.set(k, v);
        }
        props
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key`, or the empty string
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// `true` only for the literal value `true`
    pub fn get_boolean(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Set a value, keeping the original position of an existing key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.values.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.values.insert(key, value.into());
    }

    /// Set a path value using its display form
    pub fn set_path(&mut self, key: impl Into<String>, path: &Path) {
        self.set(key, path.display().to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let value = self.values.remove(key)?;
        self.keys.retain(|k| k != key);
        Some(value)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys
            .iter()
            .map(move |k| (k.as_str(), self.values[k].as_str()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Overlay `other` on top of this map
    pub fn merge(&mut self, other: &Properties) {
        for (k, v) in other.iter() {
            self.set(k, v);
        }
    }

    /// Entries under `prefix.`, with the prefix stripped
    pub fn sub_tree(&self, prefix: &str) -> Properties {
        let lead = format!("{prefix}.");
        let mut out = Properties::new();
        for (k, v) in self.iter() {
            if let Some(rest) = k.strip_prefix(&lead) {
                out.set(rest, v);
            }
        }
        out
    }

    /// Distinct first key segments, in order of first appearance
    pub fn first_level_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for k in &self.keys {
            let first = k.split('.').next().unwrap_or(k);
            if seen.insert(first) {
                out.push(first.to_string());
            }
        }
        out
    }

    /// Group dotted keys by their first segment, in order
    pub fn first_level_of(&self) -> Vec<(String, Properties)> {
        let mut groups: Vec<(String, Properties)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (k, v) in self.iter() {
            let Some((first, rest)) = k.split_once('.') else {
                continue;
            };
            let slot = *index.entry(first.to_string()).or_insert_with(|| {
                groups.push((first.to_string(), Properties::new()));
                groups.len() - 1
            });
            groups[slot].1.set(rest, v);
        }
        groups
    }

    /// Replace `{key}` placeholders with their values
    ///
    /// Unknown placeholders are left untouched. Nested references are
    /// resolved over a bounded number of passes.
    pub fn expand_props_in_string(&self, input: &str) -> String {
        let mut current = input.to_string();
        for _ in 0..MAX_EXPANSION_PASSES {
            let next = self.expand_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn expand_once(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if after[..close].contains('{') => {
                    out.push('{');
                    rest = after;
                }
                Some(close) => {
                    let key = &after[..close];
                    match self.get(key) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Drop keys carrying an OS suffix
    pub fn without_os_specific_keys(&self) -> Properties {
        let mut out = Properties::new();
        for (k, v) in self.iter() {
            let os_specific = k
                .rsplit_once('.')
                .is_some_and(|(_, suffix)| OS_SUFFIXES.contains(&suffix));
            if !os_specific {
                out.set(k, v);
            }
        }
        out
    }

    /// `true` when every entry of `other` is present here with the same value
    pub fn contains_all(&self, other: &Properties) -> bool {
        other.iter().all(|(k, v)| self.get(k) == Some(v))
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.iter() {
            writeln!(f, "{k}={v}")?;
        }
        Ok(())
    }
}
