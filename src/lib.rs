//! Platman - hardware platform manager
//!
//! This library keeps a catalog of hardware platforms, boards and tools
//! described by package indexes, resolves fully qualified board names into
//! build properties, and installs, uninstalls and upgrades platform releases
//! together with the tools they need.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Catalog, resolution and lifecycle logic
//! - [`registry`] - Package index client and cache
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod registry;
