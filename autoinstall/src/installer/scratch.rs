//! Per-install scratch space.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::InstallFailure;

/// A private working directory removed when dropped.
///
/// Removal failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct ScratchDirectory {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDirectory {
    /// Create a scratch directory for `target_name` inside `root`, or inside
    /// the system temp directory when `root` is `None`.
    ///
    /// A missing `root` is created and creation retried once.
    pub fn create(root: Option<&Path>, target_name: &str) -> Result<Self, InstallFailure> {
        let prefix = format!("{}_", target_name.replace('/', "_"));

        let dir = match create_in(root, &prefix) {
            Ok(dir) => dir,
            Err(e) => match root {
                Some(root) if !root.exists() => {
                    debug!(path = %root.display(), "Creating scratch root");
                    fs::create_dir_all(root).map_err(|e| InstallFailure::Scratch {
                        path: root.to_path_buf(),
                        source: e,
                    })?;
                    create_in(Some(root), &prefix).map_err(|e| InstallFailure::Scratch {
                        path: root.to_path_buf(),
                        source: e,
                    })?
                }
                _ => {
                    return Err(InstallFailure::Scratch {
                        path: root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
                        source: e,
                    })
                }
            },
        };

        let path = dir.path().to_path_buf();
        Ok(Self { dir: Some(dir), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn create_in(root: Option<&Path>, prefix: &str) -> io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    match root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
}

impl Drop for ScratchDirectory {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(path = %self.path.display(), error = %e, "Failed to remove scratch directory");
            }
        }
    }
}
