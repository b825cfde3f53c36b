//! Install root setup, package markers and search-path registration.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::TargetError;

/// Default name of the file that makes a directory an importable package.
pub const DEFAULT_PACKAGE_MARKER: &str = "__init__.py";

/// Contents written into new package marker files.
pub const PACKAGE_MARKER_TEXT: &str = "# This file is required for Python to search this directory for modules.\n";

/// Name of the explanatory file written into the install root.
pub const README_FILE: &str = "README";

const README_TEXT: &str = "This directory is auto-generated by autoinstall and is safe to delete.\n\
It contains needed third-party packages automatically downloaded from the web.\n";

/// Where an entry was placed on a [`SearchPath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Added at the end; searched last.
    Appended,
    /// Added at the front; searched first.
    Prepended,
}

/// Handle describing a registration made on a [`SearchPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPathEntry {
    pub path: PathBuf,
    pub placement: Placement,
}

/// An ordered list of directories searched for modules.
///
/// This is a plain value owned by the caller; registering a directory never
/// touches process-wide state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<PathBuf>,
}

impl SearchPath {
    /// Create an empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a search path from existing entries, in search order.
    pub fn from_entries(entries: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Add `path` at the end.
    pub fn append(&mut self, path: impl Into<PathBuf>) -> SearchPathEntry {
        let path = path.into();
        self.entries.push(path.clone());
        SearchPathEntry {
            path,
            placement: Placement::Appended,
        }
    }

    /// Add `path` at the front.
    pub fn prepend(&mut self, path: impl Into<PathBuf>) -> SearchPathEntry {
        let path = path.into();
        self.entries.insert(0, path.clone());
        SearchPathEntry {
            path,
            placement: Placement::Prepended,
        }
    }

    /// Entries in search order.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Whether `path` is on the search path.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry == path)
    }

    /// Join the entries with the platform separator, e.g. for `PYTHONPATH`.
    pub fn to_env_value(&self) -> Result<OsString, std::env::JoinPathsError> {
        std::env::join_paths(&self.entries)
    }
}

/// How the install root should be registered on a search path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchPathMode {
    /// Not registered.
    #[default]
    None,
    /// Appended to the search path.
    Append,
    /// Prepended to the search path.
    Prepend,
}

impl SearchPathMode {
    /// Combine the two request flags; prepending wins when both are set.
    pub fn from_flags(append: bool, prepend: bool) -> Self {
        if prepend {
            Self::Prepend
        } else if append {
            Self::Append
        } else {
            Self::None
        }
    }

    /// Register `dir` on `search_path` according to this mode.
    pub fn register(&self, search_path: &mut SearchPath, dir: &Path) -> Option<SearchPathEntry> {
        match self {
            Self::None => None,
            Self::Append => Some(search_path.append(dir)),
            Self::Prepend => Some(search_path.prepend(dir)),
        }
    }
}

/// The directory packages are installed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDirectory {
    root: PathBuf,
    package_marker: String,
}

impl TargetDirectory {
    /// Describe an install root using `package_marker` as the marker file name.
    pub fn new(root: impl Into<PathBuf>, package_marker: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            package_marker: package_marker.into(),
        }
    }

    /// The install root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path `target_name` is installed at; `/` separates directory levels.
    pub fn target_path(&self, target_name: &str) -> PathBuf {
        target_name
            .split('/')
            .filter(|c| !c.is_empty())
            .fold(self.root.clone(), |path, c| path.join(c))
    }

    /// Create the root if needed; with `make_package`, mark it as a package
    /// and write the README.
    pub fn set_up(&self, make_package: bool) -> Result<(), TargetError> {
        if !self.root.exists() {
            debug!(path = %self.root.display(), "Creating install root");
            fs::create_dir_all(&self.root).map_err(|e| TargetError::CreateDirFailed {
                path: self.root.clone(),
                source: e,
            })?;
        }

        if make_package {
            self.make_package(&self.root)?;
            self.write_readme()?;
        }

        Ok(())
    }

    /// Write a package marker into `dir` unless one exists.
    ///
    /// Returns whether a marker was written.
    pub fn make_package(&self, dir: &Path) -> Result<bool, TargetError> {
        let marker = dir.join(&self.package_marker);
        if marker.exists() {
            return Ok(false);
        }

        fs::write(&marker, PACKAGE_MARKER_TEXT).map_err(|e| TargetError::WriteFailed {
            path: marker,
            source: e,
        })?;
        Ok(true)
    }

    /// Mark every directory strictly between the root and `target_name`.
    ///
    /// For `logilab/common` that is `<root>/logilab`; a top-level target has
    /// no intermediate directories.
    pub fn mark_intermediate_dirs(&self, target_name: &str) -> Result<(), TargetError> {
        let mut dir = self.root.clone();
        let components: Vec<&str> = target_name.split('/').filter(|c| !c.is_empty()).collect();

        if let Some((_, parents)) = components.split_last() {
            for component in parents {
                dir.push(component);
                self.make_package(&dir)?;
            }
        }

        Ok(())
    }

    fn write_readme(&self) -> Result<(), TargetError> {
        let path = self.root.join(README_FILE);
        if path.exists() {
            return Ok(());
        }

        fs::write(&path, README_TEXT).map_err(|e| TargetError::WriteFailed { path, source: e })
    }
}
