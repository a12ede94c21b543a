//! Infrastructure layer
//!
//! Handles all I/O operations: network, filesystem, and external processes.
//! The lifecycle orchestrator reaches these through the [`download::Downloader`],
//! [`extract::Extractor`] and [`process::ProcessRunner`] traits.

pub mod dirs;
pub mod download;
pub mod extract;
pub mod filesystem;
pub mod host;
pub mod process;
