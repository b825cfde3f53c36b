//! Package installer.
//!
//! This module orchestrates one install end to end:
//! 1. Skip if the recorded URL matches and the target exists
//! 2. Create a private scratch directory
//! 3. Download (or take from the local cache)
//! 4. Extract archives
//! 5. Select the requested sub-path and prune unwanted files
//! 6. Replace the target and mark intermediate directories as packages
//! 7. Record the URL
//!
//! The scratch directory is removed whatever the outcome. Nothing under the
//! install root is touched before step 6.

mod scratch;
mod spec;

pub use scratch::ScratchDirectory;
pub use spec::{PackageSpec, ResolvedSpec};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::ArchivePreparer;
use crate::config::InstallerConfig;
use crate::download::{DownloadedFile, Downloader, HttpTransport, LocalCache, Transport};
use crate::error::{
    ConfigurationError, InstallError, InstallFailure, InstallResult, SetupError, StateError,
};
use crate::fsutil;
use crate::state::InstallMarkers;
use crate::target::{SearchPath, SearchPathEntry, TargetDirectory};

/// Result of a successful [`AutoInstaller::install`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The recorded URL matched and the target exists; nothing was done.
    AlreadyInstalled { target_path: PathBuf },
    /// The target was (re)installed.
    Installed {
        target_path: PathBuf,
        /// The requested URL, as recorded in the marker.
        url: String,
        /// The URL that actually served the bytes, if not from the cache.
        served_by: Option<String>,
        from_cache: bool,
    },
}

impl InstallOutcome {
    /// Where the target lives.
    pub fn target_path(&self) -> &Path {
        match self {
            Self::AlreadyInstalled { target_path } | Self::Installed { target_path, .. } => target_path,
        }
    }

    /// Whether this call changed anything on disk.
    pub fn was_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// Installs packages from URLs into one install root.
///
/// Generic over the [`Transport`] so tests can run without a network.
#[derive(Debug)]
pub struct AutoInstaller<T: Transport = HttpTransport> {
    config: InstallerConfig,
    target: TargetDirectory,
    markers: InstallMarkers,
    downloader: Downloader<T>,
    preparer: ArchivePreparer,
}

impl AutoInstaller<HttpTransport> {
    /// Create an installer using the real network transport.
    ///
    /// Sets up the install root as described by `config`.
    pub fn new(config: InstallerConfig) -> Result<Self, SetupError> {
        let transport = HttpTransport::new()?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> AutoInstaller<T> {
    /// Create an installer with a specific transport.
    pub fn with_transport(config: InstallerConfig, transport: T) -> Result<Self, SetupError> {
        let target = TargetDirectory::new(&config.target_dir, config.package_marker.clone());
        target.set_up(config.make_package)?;

        let cache = config.cache_dir.as_ref().map(LocalCache::new);
        let downloader = Downloader::new(transport)
            .with_mirrors(config.mirrors.clone())
            .with_cache(cache.clone())
            .with_timeout(config.timeout)
            .with_max_retries(config.max_retries);

        Ok(Self {
            markers: InstallMarkers::new(&config.target_dir),
            preparer: ArchivePreparer::new(cache),
            target,
            downloader,
            config,
        })
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// The install root.
    pub fn target_dir(&self) -> &Path {
        self.target.root()
    }

    pub fn markers(&self) -> &InstallMarkers {
        &self.markers
    }

    pub fn downloader(&self) -> &Downloader<T> {
        &self.downloader
    }

    /// Register the install root on `search_path` as the configuration asks.
    pub fn register_search_path(&self, search_path: &mut SearchPath) -> Option<SearchPathEntry> {
        self.config
            .search_path_mode()
            .register(search_path, self.target.root())
    }

    /// Path a target name is installed at.
    pub fn target_path(&self, target_name: &str) -> PathBuf {
        self.target.target_path(target_name)
    }

    /// Whether `target_name` is installed from exactly `url`.
    pub fn is_installed(&self, target_name: &str, url: &str) -> Result<bool, StateError> {
        Ok(self.markers.is_installed(target_name, url)? && self.target_path(target_name).exists())
    }

    /// Install a package.
    ///
    /// Either the target is fully replaced and its URL recorded, or an error
    /// is returned. On error the previous target is left in place unless the
    /// failure happened while swapping it out.
    pub fn install(&self, spec: &PackageSpec) -> InstallResult<InstallOutcome> {
        let spec = spec.resolve()?;
        let target_path = self.target_path(&spec.target_name);
        if target_path == self.target.root() {
            return Err(ConfigurationError::InvalidTargetName(spec.target_name).into());
        }
        let fail = |source: InstallFailure| InstallError::Failed {
            target_name: spec.target_name.clone(),
            target_path: target_path.clone(),
            source,
        };

        if !spec.should_refresh
            && self
                .is_installed(&spec.target_name, &spec.url)
                .map_err(|e| fail(e.into()))?
        {
            debug!(target = %spec.target_name, url = %spec.url, "Already installed, skipping");
            return Ok(InstallOutcome::AlreadyInstalled { target_path });
        }

        info!(package = %spec.package_name(), url = %spec.url, "Auto-installing package");

        let scratch = ScratchDirectory::create(self.config.temp_dir.as_deref(), &spec.target_name)
            .map_err(fail)?;
        let downloaded = self
            .install_from_scratch(&spec, scratch.path(), &target_path)
            .map_err(fail)?;
        drop(scratch);

        info!(
            package = %spec.package_name(),
            path = %target_path.display(),
            from_cache = downloaded.from_cache,
            "Auto-installed package"
        );

        Ok(InstallOutcome::Installed {
            target_path,
            url: spec.url,
            served_by: downloaded.served_by,
            from_cache: downloaded.from_cache,
        })
    }

    fn install_from_scratch(
        &self,
        spec: &ResolvedSpec,
        scratch_dir: &Path,
        target_path: &Path,
    ) -> Result<DownloadedFile, InstallFailure> {
        let downloaded = self.downloader.download(&spec.url, scratch_dir)?;
        let prepared = self.preparer.prepare(&downloaded.path, scratch_dir)?;

        let source = match &spec.subpath {
            Some(subpath) => prepared.join(subpath),
            None => prepared,
        };
        if fs::symlink_metadata(&source).is_err() {
            return Err(InstallFailure::MissingSource { path: source });
        }

        prune_files(&source, &spec.files_to_remove)?;
        self.swap(&source, target_path)?;

        self.target.mark_intermediate_dirs(&spec.target_name)?;
        self.markers.record(&spec.target_name, &spec.url)?;

        Ok(downloaded)
    }

    /// Replace whatever is at `target_path` with `source`.
    fn swap(&self, source: &Path, target_path: &Path) -> Result<(), InstallFailure> {
        if fs::symlink_metadata(target_path).is_ok() {
            debug!(path = %target_path.display(), "Removing previous install");
            fsutil::remove_path(target_path).map_err(|e| InstallFailure::RemoveExisting {
                path: target_path.to_path_buf(),
                source: e,
            })?;
        }

        debug!(from = %source.display(), to = %target_path.display(), "Moving package into place");
        fsutil::move_path(source, target_path).map_err(|e| InstallFailure::MoveFailed {
            from: source.to_path_buf(),
            to: target_path.to_path_buf(),
            source: e,
        })
    }
}

/// Delete the listed paths under `source`; missing ones are skipped.
///
/// A path that cannot be inspected is an error, not "missing".
fn prune_files(source: &Path, files: &[String]) -> Result<(), InstallFailure> {
    for file in files {
        let path = source.join(file);
        match fs::symlink_metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(InstallFailure::PruneFailed { path, source: e }),
        }

        debug!(path = %path.display(), "Removing file before install");
        fsutil::make_writable(&path)
            .and_then(|()| fsutil::remove_path(&path))
            .map_err(|e| InstallFailure::PruneFailed { path, source: e })?;
    }

    Ok(())
}
