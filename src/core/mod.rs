//! Core business logic module
//!
//! The in-memory platform catalog and everything that reads or changes it.
//! Disk, network and process access go through [`crate::infra`].
//!
//! # Submodules
//!
//! - [`properties`] - Ordered key/value maps in `platform.txt` format
//! - [`version`] - Lenient semantic versions
//! - [`fqbn`] - Fully qualified board names
//! - [`catalog`] - Packages, platforms, tools and their releases
//! - [`board`] - Board definitions and menu options
//! - [`index`] - Package index documents
//! - [`loader`] - Populates the catalog from indexes and the filesystem
//! - [`query`] - FQBN resolution and catalog lookups
//! - [`resolver`] - Platform and tool dependency resolution
//! - [`manager`] - Explorer/builder access coordination
//! - [`install`] - Install, uninstall and upgrade of platform releases
//! - [`progress`] - Progress callbacks
//! - [`global_config`] - Global configuration file

pub mod board;
pub mod catalog;
pub mod fqbn;
pub mod global_config;
pub mod index;
pub mod install;
pub mod loader;
pub mod manager;
pub mod progress;
pub mod properties;
pub mod query;
pub mod resolver;
pub mod version;
