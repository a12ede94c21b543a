//! Package index URLs

/// Official package index
pub const DEFAULT_INDEX_URL: &str = "https://downloads.arduino.cc/packages/package_index.json";
