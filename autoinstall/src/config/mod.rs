//! Configuration for the installer.
//!
//! [`InstallerConfig`] is what an [`AutoInstaller`](crate::AutoInstaller) is
//! built from. It can be filled in three ways, usually layered:
//!
//! - builder methods (`with_*`)
//! - a `~/.autoinstall/config.ini` file, see [`ConfigFile`]
//! - environment variables, see [`InstallerConfig::with_env_overrides`]
//!
//! # Example
//!
//! ```
//! use autoinstall::config::InstallerConfig;
//! use std::time::Duration;
//!
//! let config = InstallerConfig::new("/tmp/autoinstalled")
//!     .with_cache_dir(Some("/var/cache/autoinstall".into()))
//!     .with_timeout(Duration::from_secs(10))
//!     .with_prepend_to_search_path(true);
//! assert!(config.make_package);
//! ```

mod file;
mod parser;

pub use file::{
    config_directory, config_file_path, default_target_dir, ConfigFile, ConfigFileError,
    InstallerSettings, MirrorSettings,
};

use std::path::PathBuf;
use std::time::Duration;

use crate::download::{CACHE_DIR_ENV, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::mirror::{parse_mirror_list, MirrorClass, MirrorConfig};
use crate::target::{SearchPathMode, DEFAULT_PACKAGE_MARKER};

/// Configuration for an installer instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerConfig {
    /// Directory packages are installed into.
    pub target_dir: PathBuf,

    /// Where scratch directories are created; the system temp dir when `None`.
    pub temp_dir: Option<PathBuf>,

    /// Local cache of raw downloads.
    pub cache_dir: Option<PathBuf>,

    /// Mirror hosts used when the original host keeps failing.
    pub mirrors: MirrorConfig,

    /// Per-attempt download timeout.
    pub timeout: Duration,

    /// Same-URL retries before mirrors are tried.
    pub max_retries: u32,

    /// Register the target directory at the end of the search path.
    pub append_to_search_path: bool,

    /// Register the target directory at the front of the search path.
    pub prepend_to_search_path: bool,

    /// Mark the target directory as a package.
    pub make_package: bool,

    /// File name of the package marker.
    pub package_marker: String,
}

impl InstallerConfig {
    /// Create a configuration with defaults for everything but the target.
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            temp_dir: None,
            cache_dir: None,
            mirrors: MirrorConfig::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            append_to_search_path: false,
            prepend_to_search_path: false,
            make_package: true,
            package_marker: DEFAULT_PACKAGE_MARKER.to_string(),
        }
    }

    /// Create a configuration and apply the process environment.
    pub fn from_env(target_dir: impl Into<PathBuf>) -> Self {
        Self::new(target_dir).with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Create a configuration and apply variables from `lookup`.
    pub fn from_lookup<F>(target_dir: impl Into<PathBuf>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(target_dir).with_env_overrides(lookup)
    }

    /// Overlay `LOCAL_AUTOINSTALL_CACHE`, `PYPI_MIRRORS` and
    /// `SOURCEFORGE_MIRRORS`.
    ///
    /// Only variables that are set replace existing values. An empty cache
    /// variable is treated as unset.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cache) = lookup(CACHE_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.cache_dir = Some(PathBuf::from(cache));
        }
        if let Some(value) = lookup(MirrorClass::SourceForge.env_var()) {
            self.mirrors.sourceforge = parse_mirror_list(&value);
        }
        if let Some(value) = lookup(MirrorClass::Pypi.env_var()) {
            self.mirrors.pypi = parse_mirror_list(&value);
        }
        self
    }

    /// Set the install root.
    pub fn with_target_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_dir = path.into();
        self
    }

    /// Set the scratch root.
    pub fn with_temp_dir(mut self, path: Option<PathBuf>) -> Self {
        self.temp_dir = path;
        self
    }

    /// Set the local cache directory.
    pub fn with_cache_dir(mut self, path: Option<PathBuf>) -> Self {
        self.cache_dir = path;
        self
    }

    /// Set the mirror hosts.
    pub fn with_mirrors(mut self, mirrors: MirrorConfig) -> Self {
        self.mirrors = mirrors;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of same-URL retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Append the install root to the search path.
    pub fn with_append_to_search_path(mut self, append: bool) -> Self {
        self.append_to_search_path = append;
        self
    }

    /// Prepend the install root to the search path.
    pub fn with_prepend_to_search_path(mut self, prepend: bool) -> Self {
        self.prepend_to_search_path = prepend;
        self
    }

    /// Enable or disable package marking of the install root.
    pub fn with_make_package(mut self, make_package: bool) -> Self {
        self.make_package = make_package;
        self
    }

    /// Set the package marker file name.
    pub fn with_package_marker(mut self, name: impl Into<String>) -> Self {
        self.package_marker = name.into();
        self
    }

    /// The effective search-path registration.
    pub fn search_path_mode(&self) -> SearchPathMode {
        SearchPathMode::from_flags(self.append_to_search_path, self.prepend_to_search_path)
    }
}
