//! Default configuration values

/// Maximum number of download retry attempts
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Default number of parallel tool downloads within one platform install
pub const DEFAULT_PARALLEL_DOWNLOADS: usize = 4;

/// HTTP connect timeout (in seconds)
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// HTTP user agent
pub const USER_AGENT: &str = concat!("platman/", env!("CARGO_PKG_VERSION"));

/// Marker left in a release directory until its install completes
pub const INSTALLING_MARKER: &str = ".platman-installing";

/// Index metadata stored inside an installed platform release
pub const INSTALLED_JSON: &str = "installed.json";

/// Hook run after a release is extracted
pub const POST_INSTALL_HOOK: &str = "post_install";

/// Hook run before a release is removed
pub const PRE_UNINSTALL_HOOK: &str = "pre_uninstall";
