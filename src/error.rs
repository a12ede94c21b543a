//! Error types for platman
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// FQBN syntax errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FqbnError {
    /// Wrong number of `:`-separated fields
    #[error("Invalid FQBN '{fqbn}': expected package:architecture:board[:options]")]
    InvalidFormat { fqbn: String },

    /// Empty board identifier
    #[error("Invalid FQBN '{fqbn}': empty board identifier")]
    EmptyBoardId { fqbn: String },

    /// Disallowed characters in package, architecture or board id
    #[error("Invalid FQBN '{fqbn}': invalid character in '{field}'")]
    InvalidField { fqbn: String, field: String },

    /// Malformed `key=value` configuration entry
    #[error("Invalid FQBN '{fqbn}': invalid config option '{option}'")]
    InvalidConfig { fqbn: String, option: String },
}

/// Board identifier resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Malformed FQBN string
    #[error(transparent)]
    InvalidFqbn(#[from] FqbnError),

    /// Package not found in the catalog
    #[error("Unknown package '{package}'")]
    UnknownPackage { package: String },

    /// Architecture not found under the package
    #[error("Unknown platform '{package}:{architecture}'")]
    UnknownPlatform {
        package: String,
        architecture: String,
    },

    /// Platform known but no release installed
    #[error("Platform '{package}:{architecture}' is not installed")]
    PlatformNotInstalled {
        package: String,
        architecture: String,
    },

    /// Board id not declared by the installed release
    #[error("Board '{board}' not found in platform '{platform}'")]
    UnknownBoard { board: String, platform: String },

    /// Configuration option not declared by the board
    #[error("Invalid option '{option}' for board '{board}'")]
    InvalidOption { board: String, option: String },

    /// Configuration value not declared for the option
    #[error("Invalid value '{value}' for option '{option}' of board '{board}'")]
    InvalidOptionValue {
        board: String,
        option: String,
        value: String,
    },

    /// `build.core` and `build.variant` point to different vendors
    #[error("'build.core' and 'build.variant' refer to different platforms: {core} and {variant}")]
    ConflictingReferences { core: String, variant: String },

    /// Referenced vendor package missing
    #[error("Missing package '{package}' referenced by board '{fqbn}'")]
    MissingReferencedPackage { package: String, fqbn: String },

    /// Referenced vendor has no platform for the architecture
    #[error("Missing platform '{package}:{architecture}' referenced by board '{fqbn}'")]
    MissingReferencedPlatform {
        package: String,
        architecture: String,
        fqbn: String,
    },

    /// Referenced platform is not installed
    #[error("Missing platform release '{package}:{architecture}' referenced by board '{fqbn}'")]
    MissingReferencedRelease {
        package: String,
        architecture: String,
        fqbn: String,
    },

    /// Tool dependency of the board's platform cannot be found
    #[error("Tool release not found: {tool}")]
    MissingTool { tool: String },
}

/// Property file errors
#[derive(Error, Debug)]
pub enum PropertiesError {
    /// Line without `=`
    #[error("Invalid line {line} in '{source_name}': expected key=value")]
    InvalidLine { source_name: String, line: usize },

    /// IO error
    #[error("Failed to read '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Package index errors
#[derive(Error, Debug)]
pub enum IndexError {
    /// IO error reading the index
    #[error("Failed to read index '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Malformed JSON
    #[error("Failed to parse index '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Version field is empty
    #[error("Invalid version '{version}' for '{item}' in index")]
    InvalidVersion { item: String, version: String },

    /// Failed to serialize an index document
    #[error("Failed to write index '{path}': {error}")]
    WriteError { path: PathBuf, error: String },
}

/// Filesystem scan and catalog load errors
#[derive(Error, Debug)]
pub enum LoadError {
    /// Packages root is missing and no index could be loaded
    #[error("Nothing to load: packages directory '{path}' does not exist and no index was loaded")]
    NothingToLoad { path: PathBuf },

    /// Path is not a directory
    #[error("'{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// IO error while scanning
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Platform or tool version directory name is not a version
    #[error("Invalid version directory '{path}'")]
    InvalidVersionDir { path: PathBuf },

    /// Legacy platform without a usable `version` property
    #[error("Invalid version '{version}' in '{path}'")]
    InvalidVersion { path: PathBuf, version: String },

    /// Same board declared twice in one release
    #[error("Duplicate board '{board}' in '{path}'")]
    DuplicateBoard { board: String, path: PathBuf },

    /// Malformed property file
    #[error("Failed to load '{path}': {error}")]
    Properties { path: PathBuf, error: PropertiesError },

    /// Malformed `installed.json`
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Malformed `pluggable_monitor.required` entry
    #[error("Invalid pluggable monitor reference '{reference}' in '{path}'")]
    InvalidMonitorReference { reference: String, path: PathBuf },

    /// Release directory left behind by an interrupted install
    #[error("Incomplete installation in '{path}', ignoring it")]
    IncompleteInstall { path: PathBuf },
}

/// Dependency lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// Package not found
    #[error("Package '{package}' not found")]
    PackageNotFound { package: String },

    /// Platform not found in package
    #[error("Platform '{architecture}' not found in package '{package}'")]
    PlatformNotFound {
        package: String,
        architecture: String,
    },

    /// Requested version not in catalog
    #[error("Required version {version} not found for platform '{platform}'")]
    VersionNotFound { platform: String, version: String },

    /// No release usable on this host
    #[error("Platform '{platform}' has no release available for this host")]
    NoCompatibleRelease { platform: String },

    /// Tool dependency cannot be resolved
    #[error("Tool '{tool}' required by '{platform}' not found")]
    ToolNotFound { platform: String, tool: String },

    /// Malformed `package:architecture[@version]` reference
    #[error("Invalid platform reference '{reference}': expected package:architecture[@version]")]
    InvalidReference { reference: String },
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// Checksum verification failed
    #[error("Checksum verification failed for '{file}'")]
    ChecksumFailed { file: String },

    /// Checksum algorithm other than SHA-256
    #[error("Unsupported checksum '{checksum}'")]
    UnsupportedChecksum { checksum: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Package index refresh errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// URL without a usable file name
    #[error("Invalid index URL '{url}'")]
    InvalidUrl { url: String },

    /// Index could not be fetched
    #[error("Failed to download index '{url}': {source}")]
    Download {
        url: String,
        #[source]
        source: DownloadError,
    },

    /// `.gz` index that does not decompress
    #[error("Failed to decompress index '{url}': {error}")]
    Decompress { url: String, error: String },

    /// Fetched content is not a valid index
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Failed to store the index in the cache
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Archive extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Archive format not recognized from the file name
    #[error("Unsupported archive format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Corrupt or unreadable archive
    #[error("Failed to extract '{path}': {error}")]
    Archive { path: PathBuf, error: String },

    /// Destination already exists
    #[error("Destination '{path}' already exists")]
    DestinationExists { path: PathBuf },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Install/uninstall hook errors
#[derive(Error, Debug)]
pub enum HookError {
    /// Hook could not be started
    #[error("Failed to run '{command}': {error}")]
    SpawnFailed { command: String, error: String },

    /// Hook exited non-zero and is mandatory
    #[error("'{command}' exited with status {code}")]
    Failed { command: String, code: i32 },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to move a directory into place
    #[error("Failed to move '{from}' to '{to}': {error}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Explorer/builder coordination errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Another builder session is open
    #[error("Another catalog update is in progress")]
    BuilderBusy,
}

/// Install errors
#[derive(Error, Debug)]
pub enum InstallError {
    /// Release or its dependencies cannot be resolved
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Overwrite disallowed and another version is present
    #[error("Platform '{platform}' is already installed at version {installed}; use overwrite to replace it")]
    OtherVersionInstalled { platform: String, installed: String },

    /// Release has no download resource
    #[error("'{item}' has no downloadable resource")]
    MissingResource { item: String },

    /// No flavor of the tool runs on this host
    #[error("Tool '{tool}' is not available for this host")]
    NoCompatibleFlavor { tool: String },

    /// Download failed
    #[error("Failed to download '{item}': {source}")]
    Download {
        item: String,
        #[source]
        source: DownloadError,
    },

    /// Extraction failed
    #[error("Failed to extract '{item}': {source}")]
    Extract {
        item: String,
        #[source]
        source: ExtractError,
    },

    /// Mandatory post-install hook failed
    #[error("Post-install script of '{item}' failed: {source}")]
    Hook {
        item: String,
        #[source]
        source: HookError,
    },

    /// Filesystem error while placing the release
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// Failed to write `installed.json`
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Failed to load the freshly installed directory
    #[error("Installed '{item}' could not be loaded: {source}")]
    Load {
        item: String,
        #[source]
        source: LoadError,
    },

    /// Replacing the previous version failed; the new one was rolled back
    #[error("Failed to replace '{old}' with '{new}': {source}")]
    ReplaceFailed {
        old: String,
        new: String,
        #[source]
        source: Box<UninstallError>,
    },

    /// Operation cancelled
    #[error("Installation cancelled")]
    Cancelled,
}

/// Uninstall errors
#[derive(Error, Debug)]
pub enum UninstallError {
    /// Release cannot be resolved
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Install directory lies outside the packages root
    #[error("'{path}' is not managed by platman and will not be removed")]
    NotManaged { path: PathBuf },

    /// Mandatory pre-uninstall hook failed
    #[error("Pre-uninstall script of '{item}' failed: {source}")]
    Hook {
        item: String,
        #[source]
        source: HookError,
    },

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Upgrade errors
#[derive(Error, Debug)]
pub enum UpgradeError {
    /// Release cannot be resolved
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Nothing installed to upgrade
    #[error("Platform '{platform}' is not installed")]
    NotInstalled { platform: String },

    /// Target release cannot be installed; nothing changed
    #[error(transparent)]
    Install(#[from] InstallError),

    /// Removing the old version failed; nothing changed
    #[error(transparent)]
    Uninstall(#[from] UninstallError),

    /// Old version removed but the new one failed to install
    #[error("Upgrade of '{platform}' partially applied: {removed} was removed but {target} failed to install ({source}); reinstall manually")]
    PartiallyApplied {
        platform: String,
        removed: String,
        target: String,
        #[source]
        source: Box<InstallError>,
    },
}

/// Top-level platman error type
#[derive(Error, Debug)]
pub enum PlatmanError {
    /// FQBN syntax error
    #[error("FQBN error: {0}")]
    Fqbn(#[from] FqbnError),

    /// Board resolution error
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Property file error
    #[error("Properties error: {0}")]
    Properties(#[from] PropertiesError),

    /// Package index error
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Catalog load error
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Dependency error
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// Download error
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Index refresh error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Extraction error
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Coordination error
    #[error("{0}")]
    Coordinator(#[from] CoordinatorError),

    /// Install error
    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    /// Uninstall error
    #[error("Uninstall error: {0}")]
    Uninstall(#[from] UninstallError),

    /// Upgrade error
    #[error("Upgrade error: {0}")]
    Upgrade(#[from] UpgradeError),

    /// IO error
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
