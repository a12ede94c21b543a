//! Host platform detection
//!
//! Tool releases ship one archive per host triple (`x86_64-linux-gnu`,
//! `arm64-apple-darwin`, `i686-mingw32`, ...). [`HostPlatform`] decides which
//! of those triples can run on the current machine and how well.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    Linux,
    Windows,
    Darwin,
    FreeBsd,
    Other,
}

/// CPU architecture family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostArch {
    X86_64,
    X86,
    Aarch64,
    Arm,
    Other,
}

/// Host the tools must run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    pub os: HostOs,
    pub arch: HostArch,
}

/// Score of an exact host match
pub const EXACT_MATCH: u32 = 1000;
/// Score of a host that can run the flavor through emulation or 32-bit support
pub const COMPATIBLE_MATCH: u32 = 10;

struct HostPatterns {
    linux_arm: Regex,
    linux_arm64: Regex,
    linux_64: Regex,
    linux_32: Regex,
    windows_32: Regex,
    windows_64: Regex,
    mac_64: Regex,
    mac_32: Regex,
    mac_arm64: Regex,
    freebsd_arm: Regex,
    freebsd_32: Regex,
    freebsd_64: Regex,
}

fn patterns() -> &'static HostPatterns {
    static PATTERNS: OnceLock<HostPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("valid host pattern");
        HostPatterns {
            linux_arm: re("arm.*-linux-gnueabihf"),
            linux_arm64: re("(aarch64|arm64)-linux-gnu"),
            linux_64: re("x86_64-.*linux-gnu"),
            linux_32: re("i[3456]86-.*linux-gnu"),
            windows_32: re("i[3456]86-.*(mingw32|cygwin)"),
            windows_64: re("(amd64|x86_64)-.*(mingw32|cygwin)"),
            mac_64: re("x86_64-apple-darwin.*"),
            mac_32: re("i[3456]86-apple-darwin.*"),
            mac_arm64: re("arm64-apple-darwin.*"),
            freebsd_arm: re("arm.*-freebsd[0-9]*"),
            freebsd_32: re("i?[3456]86-freebsd[0-9]*"),
            freebsd_64: re("amd64-freebsd[0-9]*"),
        }
    })
}

impl HostPlatform {
    pub fn new(os: HostOs, arch: HostArch) -> Self {
        Self { os, arch }
    }

    /// Score how well a flavor's host triple fits; `None` if it cannot run
    pub fn flavor_score(&self, triple: &str) -> Option<u32> {
        if self.matches_exactly(triple) {
            return Some(EXACT_MATCH);
        }
        let p = patterns();
        let compatible = match (self.os, self.arch) {
            (HostOs::Windows, HostArch::X86_64) => p.windows_32.is_match(triple),
            (HostOs::Darwin, HostArch::X86_64) => p.mac_32.is_match(triple),
            (HostOs::Darwin, HostArch::Aarch64) => p.mac_64.is_match(triple),
            _ => false,
        };
        compatible.then_some(COMPATIBLE_MATCH)
    }

    fn matches_exactly(&self, triple: &str) -> bool {
        if triple == "all" {
            return true;
        }
        let p = patterns();
        match (self.os, self.arch) {
            (HostOs::Linux, HostArch::Arm) => p.linux_arm.is_match(triple),
            (HostOs::Linux, HostArch::Aarch64) => p.linux_arm64.is_match(triple),
            (HostOs::Linux, HostArch::X86_64) => p.linux_64.is_match(triple),
            (HostOs::Linux, HostArch::X86) => p.linux_32.is_match(triple),
            (HostOs::Windows, HostArch::X86) => p.windows_32.is_match(triple),
            (HostOs::Windows, HostArch::X86_64) => p.windows_64.is_match(triple),
            (HostOs::Darwin, HostArch::Aarch64) => p.mac_arm64.is_match(triple),
            (HostOs::Darwin, HostArch::X86_64) => p.mac_64.is_match(triple),
            (HostOs::FreeBsd, HostArch::Arm) => p.freebsd_arm.is_match(triple),
            (HostOs::FreeBsd, HostArch::X86) => p.freebsd_32.is_match(triple),
            (HostOs::FreeBsd, HostArch::X86_64) => p.freebsd_64.is_match(triple),
            _ => false,
        }
    }

    /// Name of the hook script extension for this host
    pub fn script_extension(&self) -> &'static str {
        if self.os == HostOs::Windows {
            "bat"
        } else {
            "sh"
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = match self.os {
            HostOs::Linux => "linux",
            HostOs::Windows => "windows",
            HostOs::Darwin => "darwin",
            HostOs::FreeBsd => "freebsd",
            HostOs::Other => "unknown",
        };
        let arch = match self.arch {
            HostArch::X86_64 => "x86_64",
            HostArch::X86 => "x86",
            HostArch::Aarch64 => "aarch64",
            HostArch::Arm => "arm",
            HostArch::Other => "unknown",
        };
        write!(f, "{os}-{arch}")
    }
}

/// Detect the current host platform
pub fn detect_host_platform() -> HostPlatform {
    let os = match std::env::consts::OS {
        "linux" => HostOs::Linux,
        "windows" => HostOs::Windows,
        "macos" => HostOs::Darwin,
        "freebsd" => HostOs::FreeBsd,
        _ => HostOs::Other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => HostArch::X86_64,
        "x86" => HostArch::X86,
        "aarch64" => HostArch::Aarch64,
        "arm" => HostArch::Arm,
        _ => HostArch::Other,
    };
    HostPlatform::new(os, arch)
}
