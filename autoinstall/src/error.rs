//! Error types for the installer pipeline.
//!
//! Each stage of the pipeline has its own error type. The orchestrator wraps
//! whatever a stage returns into [`InstallError`], which is the only error a
//! caller of [`AutoInstaller::install`](crate::AutoInstaller::install) sees.
//! Causes are kept as structured `source()` chains rather than flattened
//! strings so callers can inspect them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for install operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// An install request that cannot be acted on.
///
/// Raised before any I/O happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Neither a target name nor a usable URL sub-path was given.
    #[error(
        "the \"target_name\" parameter must be provided if the \"url_subpath\" parameter is not provided"
    )]
    MissingTargetName,

    /// The target name would escape the install root.
    #[error("invalid target name '{0}': must be a relative path without '..' components")]
    InvalidTargetName(String),

    /// The URL sub-path would escape the downloaded content.
    #[error("invalid URL sub-path '{0}': must be a relative path without '..' components")]
    InvalidSubpath(String),

    /// A file listed for removal would escape the downloaded content.
    #[error("invalid file to remove '{0}': must be a relative path without '..' components")]
    InvalidFileToRemove(String),
}

/// A single failed attempt to open a URL.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request could not be completed.
    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP request exceeded the per-attempt timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        url: String,
        timeout_secs: u64,
        #[source]
        source: reqwest::Error,
    },

    /// A `file:` URL could not be opened.
    #[error("failed to open {}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The URL scheme is not one the transport can fetch.
    #[error("unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme { url: String, scheme: String },

    /// Failure reported by a non-HTTP transport.
    #[error("{0}")]
    Other(String),
}

/// Why one download attempt was rejected.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The transport could not open the URL.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a status outside `200..300`.
    #[error("HTTP error code {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Errors raised while fetching a package.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL could not be parsed or names no file.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Every retry and every mirror failed.
    #[error(
        "could not download from URL \"{url}\"; make sure you are connected to the internet \
         when downloading needed packages for the first time"
    )]
    Exhausted {
        url: String,
        #[source]
        source: AttemptError,
    },

    /// The connection opened but reading the body failed.
    #[error("failed to read response body from {url}")]
    Transfer {
        url: String,
        #[source]
        source: io::Error,
    },

    /// The destination stream rejected downloaded bytes.
    #[error("failed to write data downloaded from {url}")]
    StreamWrite {
        url: String,
        #[source]
        source: io::Error,
    },

    /// The downloaded bytes could not be written locally.
    #[error("failed to write {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to the local cache directory failed.
    #[error("local cache operation failed at {}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised while unpacking a downloaded file.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The file is not a readable zip archive.
    #[error("could not open zip file {}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// The file is not a readable tar archive.
    #[error(
        "could not open tar file {}; the file probably does not have the correct format",
        path.display()
    )]
    Tar {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An archive entry points outside the extraction directory.
    #[error("archive {} contains unsafe entry '{name}'", path.display())]
    UnsafeEntry { path: PathBuf, name: String },

    /// Failed to read a file.
    #[error("failed to read {}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create a directory.
    #[error("failed to create directory {}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the install-state tracker.
#[derive(Debug, Error)]
pub enum StateError {
    /// Failed to read a marker file.
    #[error("failed to read install marker {}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a marker file.
    #[error("failed to write install marker {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised while preparing the install root.
#[derive(Debug, Error)]
pub enum TargetError {
    /// Failed to create a directory.
    #[error("failed to create directory {}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a marker or README file.
    #[error("failed to write {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The stage-level failure wrapped by [`InstallError::Failed`].
#[derive(Debug, Error)]
pub enum InstallFailure {
    /// The scratch directory could not be allocated.
    #[error("failed to create scratch directory in {}", path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The requested sub-path is not present in the prepared content.
    #[error("sub-path {} not found in downloaded content", path.display())]
    MissingSource { path: PathBuf },

    /// A file listed for removal could not be deleted.
    #[error("failed to remove {}", path.display())]
    PruneFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The previous install could not be removed.
    #[error("failed to remove existing target {}", path.display())]
    RemoveExisting {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The prepared content could not be moved into place.
    #[error("failed to move {} to {}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Error returned by an install call.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The request was rejected before any I/O.
    #[error(transparent)]
    InvalidSpec(#[from] ConfigurationError),

    /// A pipeline stage failed; the target was not replaced.
    #[error("error auto-installing the {target_name} package to \"{}\"", target_path.display())]
    Failed {
        target_name: String,
        target_path: PathBuf,
        #[source]
        source: InstallFailure,
    },
}

impl InstallError {
    /// Name of the target the failed install was for, if it got that far.
    pub fn target_name(&self) -> Option<&str> {
        match self {
            Self::InvalidSpec(_) => None,
            Self::Failed { target_name, .. } => Some(target_name),
        }
    }

    /// The stage failure, if any.
    pub fn failure(&self) -> Option<&InstallFailure> {
        match self {
            Self::InvalidSpec(_) => None,
            Self::Failed { source, .. } => Some(source),
        }
    }
}

/// Error constructing an installer.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The network transport could not be created.
    #[error("failed to create transport")]
    Transport(#[from] TransportError),

    /// The install root could not be prepared.
    #[error("failed to set up install root")]
    Target(#[from] TargetError),
}

/// Error running an install recipe.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A step's sub-directory does not stay below the base install root.
    #[error("recipe '{recipe}' has invalid target sub-directory '{subdir}'")]
    InvalidSubdir { recipe: String, subdir: String },

    /// An installer for one of the recipe's steps could not be built.
    #[error("recipe '{recipe}' could not set up {}", target_dir.display())]
    Setup {
        recipe: String,
        target_dir: PathBuf,
        #[source]
        source: SetupError,
    },

    /// One of the recipe's installs failed.
    #[error("recipe '{recipe}' failed")]
    Install {
        recipe: String,
        #[source]
        source: InstallError,
    },
}

impl RegistryError {
    /// Name of the recipe that failed.
    pub fn recipe(&self) -> &str {
        match self {
            Self::InvalidSubdir { recipe, .. }
            | Self::Setup { recipe, .. }
            | Self::Install { recipe, .. } => recipe,
        }
    }
}
