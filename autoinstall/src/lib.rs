//! autoinstall - fetch and install third-party packages from URLs
//!
//! The installer downloads a package distribution, unpacks it, and installs a
//! chosen part of it under a local install root. A hidden marker file per
//! target records the URL it came from, so repeated installs are free.
//!
//! Downloads retry on failure, fall back to configured mirror hosts, and can
//! be served from a local cache directory.
//!
//! # Example
//!
//! ```no_run
//! use autoinstall::{AutoInstaller, InstallerConfig, PackageSpec};
//!
//! let installer = AutoInstaller::new(InstallerConfig::from_env("/tmp/autoinstalled"))?;
//! installer.install(
//!     &PackageSpec::new("http://pypi.python.org/packages/source/p/pep8/pep8-0.5.0.tar.gz")
//!         .with_subpath("pep8-0.5.0/pep8.py"),
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod config;
pub mod download;
pub mod error;
mod fsutil;
pub mod installer;
pub mod logging;
pub mod mirror;
pub mod registry;
pub mod state;
pub mod target;

pub use config::InstallerConfig;
pub use error::{InstallError, InstallResult};
pub use installer::{AutoInstaller, InstallOutcome, PackageSpec};
pub use registry::{InstallRegistry, Recipe, RecipeStep};
pub use target::SearchPath;
