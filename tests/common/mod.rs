//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests: an isolated
//! set of platman directories, packages-root builders and archive helpers.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use platman::infra::dirs::PlatmanDirs;
use platman::infra::download::compute_checksum;

/// Isolated platman environment
///
/// Every directory lives under one temporary root, so tests never see the
/// user's real configuration or packages.
pub struct TestEnv {
    /// Temporary root directory
    pub dir: TempDir,
    pub dirs: PlatmanDirs,
}

impl TestEnv {
    /// Create a new environment in a temporary directory
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let dirs = PlatmanDirs::with_root(dir.path());
        Self { dir, dirs }
    }

    /// Get the path to the temporary root
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.dirs.packages_dir()
    }

    /// Create a file relative to the root
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        write_file(&path, content);
        path
    }

    /// Lay out an installed platform release in the packages root
    pub fn write_platform(
        &self,
        package: &str,
        architecture: &str,
        version: &str,
        files: &[(&str, &str)],
    ) -> PathBuf {
        let dir = self
            .packages_dir()
            .join(package)
            .join("hardware")
            .join(architecture)
            .join(version);
        std::fs::create_dir_all(&dir).expect("Failed to create platform directory");
        for (name, content) in files {
            write_file(&dir.join(name), content);
        }
        dir
    }

    /// Lay out an installed tool release in the packages root
    pub fn write_tool(&self, packager: &str, name: &str, version: &str) -> PathBuf {
        let dir = self
            .packages_dir()
            .join(packager)
            .join("tools")
            .join(name)
            .join(version);
        write_file(&dir.join("bin").join(name), "#!/bin/sh\n");
        dir
    }

    /// Write a package index outside the cache and return its `file://` URL
    pub fn write_local_index(&self, name: &str, json: &str) -> String {
        let path = self.create_file(&format!("indexes/{name}"), json);
        file_url(&path)
    }

    /// Write a package index into the index cache
    pub fn write_cached_index(&self, name: &str, json: &str) -> PathBuf {
        let path = self.dirs.index_dir().join(name);
        write_file(&path, json);
        path
    }

    /// Write `config.toml` with the given additional index URLs
    pub fn write_config(&self, additional_urls: &[String], extra: &str) -> PathBuf {
        let urls: Vec<String> = additional_urls.iter().map(|u| format!("\"{u}\"")).collect();
        let content = format!(
            "[board_manager]\nadditional_urls = [{}]\n\n{extra}\n",
            urls.join(", ")
        );
        let path = self.dirs.global_config_path();
        write_file(&path, &content);
        path
    }

    /// `platman` command bound to this environment
    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_platman"));
        cmd.env("PLATMAN_DATA_DIR", self.dirs.data_dir())
            .env("PLATMAN_CONFIG_DIR", self.dirs.config_dir())
            .env_remove("PLATMAN_CONFIG")
            .env_remove("RUST_LOG")
            .args(args);
        cmd
    }

    /// Run `platman` and capture its output
    pub fn run(&self, args: &[&str]) -> std::process::Output {
        self.command(args)
            .output()
            .expect("Failed to execute platman")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

pub fn file_url(path: &Path) -> String {
    reqwest::Url::from_file_path(path)
        .expect("Absolute path")
        .to_string()
}

/// Build a `.tar.gz` with every file under `top_dir/`
pub fn tar_gz(top_dir: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(if name.ends_with(".sh") { 0o755 } else { 0o644 });
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{top_dir}/{name}"), content.as_bytes())
            .expect("Failed to append archive entry");
    }
    builder
        .into_inner()
        .expect("Failed to finish archive")
        .finish()
        .expect("Failed to finish compression")
}

/// Index checksum of `data`
pub fn checksum(data: &[u8]) -> String {
    format!("SHA-256:{}", compute_checksum(data))
}

pub fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// boards.txt of a two-board platform with a cpu menu
pub const AVR_BOARDS_TXT: &str = "\
menu.cpu=Processor

uno.name=Arduino Uno
uno.vid.0=0x2341
uno.pid.0=0x0043
uno.build.mcu=atmega328p
uno.build.core=arduino
uno.upload.tool=avrdude

nano.name=Arduino Nano
nano.build.core=arduino
nano.upload.tool=avrdude
nano.menu.cpu.atmega328=ATmega328P
nano.menu.cpu.atmega328.build.mcu=atmega328p
nano.menu.cpu.atmega168=ATmega168
nano.menu.cpu.atmega168.build.mcu=atmega168
";

pub const AVR_PLATFORM_TXT: &str = "\
name=Arduino AVR Boards
version=1.8.6
compiler.path={runtime.tools.avr-gcc.path}/bin/
recipe.c.o.pattern=\"{compiler.path}avr-gcc\" -mmcu={build.mcu} -c \"{source_file}\"
";
