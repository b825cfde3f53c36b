//! Persisted record of which URL each target was installed from.
//!
//! Every installed target has a hidden marker file in the install root,
//! `.<target name with '/' replaced by '_'>.url`, holding the exact URL that
//! was requested. An install is skipped when the marker matches.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StateError;

/// Marker files for targets under one install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallMarkers {
    root: PathBuf,
}

impl InstallMarkers {
    /// Markers stored in `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The install root holding the markers.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the marker file for `target_name`.
    pub fn marker_path(&self, target_name: &str) -> PathBuf {
        self.root.join(marker_file_name(target_name))
    }

    /// URL recorded for `target_name`, trimmed, or `None` if never installed.
    pub fn recorded_url(&self, target_name: &str) -> Result<Option<String>, StateError> {
        let path = self.marker_path(target_name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|e| StateError::ReadFailed { path, source: e })?;
        Ok(Some(contents.trim().to_string()))
    }

    /// Whether `target_name` was last installed from exactly `url`.
    pub fn is_installed(&self, target_name: &str, url: &str) -> Result<bool, StateError> {
        Ok(self
            .recorded_url(target_name)?
            .is_some_and(|recorded| recorded == url.trim()))
    }

    /// Record that `target_name` was installed from `url`.
    pub fn record(&self, target_name: &str, url: &str) -> Result<(), StateError> {
        let path = self.marker_path(target_name);
        fs::write(&path, url).map_err(|e| StateError::WriteFailed { path, source: e })
    }
}

fn marker_file_name(target_name: &str) -> String {
    format!(".{}.url", target_name.replace('/', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_marker_path() {
        let markers = InstallMarkers::new("/root/autoinstalled");
        assert_eq!(
            markers.marker_path("pep8.py"),
            PathBuf::from("/root/autoinstalled/.pep8.py.url")
        );
        assert_eq!(
            markers.marker_path("logilab/common"),
            PathBuf::from("/root/autoinstalled/.logilab_common.url")
        );
    }

    #[test]
    fn test_not_installed_without_marker() {
        let temp = TempDir::new().unwrap();
        let markers = InstallMarkers::new(temp.path());

        assert!(!markers.is_installed("pkg", "http://example.org/pkg.zip").unwrap());
        assert_eq!(markers.recorded_url("pkg").unwrap(), None);
    }

    #[test]
    fn test_record_then_check() {
        let temp = TempDir::new().unwrap();
        let markers = InstallMarkers::new(temp.path());

        markers.record("pkg", "http://example.org/pkg-1.0.zip").unwrap();

        assert!(markers.is_installed("pkg", "http://example.org/pkg-1.0.zip").unwrap());
        assert!(!markers.is_installed("pkg", "http://example.org/pkg-2.0.zip").unwrap());
        assert_eq!(
            fs::read_to_string(temp.path().join(".pkg.url")).unwrap(),
            "http://example.org/pkg-1.0.zip"
        );
    }

    #[test]
    fn test_comparison_ignores_surrounding_whitespace() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".pkg.url"), "http://example.org/pkg.zip\n").unwrap();
        let markers = InstallMarkers::new(temp.path());

        assert!(markers.is_installed("pkg", "http://example.org/pkg.zip").unwrap());
        assert!(markers.is_installed("pkg", " http://example.org/pkg.zip ").unwrap());
    }

    proptest! {
        #[test]
        fn prop_marker_stays_in_root(name in "[a-z]{1,8}(/[a-z]{1,8}){0,3}") {
            let markers = InstallMarkers::new("/install/root");
            let path = markers.marker_path(&name);

            prop_assert_eq!(path.parent(), Some(Path::new("/install/root")));
            let file_name = path.file_name().unwrap().to_str().unwrap().to_string();
            prop_assert!(file_name.starts_with('.'));
            prop_assert!(file_name.ends_with(".url"));
            prop_assert!(!file_name.contains('/'));
        }
    }
}
