//! What to install: [`PackageSpec`].

use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;
use crate::fsutil;

/// Request to install one package.
///
/// # Example
///
/// ```
/// use autoinstall::PackageSpec;
///
/// // Keeps only pep8.py out of the tarball, installed as `<root>/pep8.py`.
/// let spec = PackageSpec::new(
///     "http://pypi.python.org/packages/source/p/pep8/pep8-0.5.0.tar.gz#md5=512a818af9979290cd619cce8e9c2e2b",
/// )
/// .with_subpath("pep8-0.5.0/pep8.py");
/// assert_eq!(spec.url_subpath(), Some("pep8-0.5.0/pep8.py"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    url: String,
    url_subpath: Option<String>,
    target_name: Option<String>,
    files_to_remove: Vec<String>,
    should_refresh: bool,
}

impl PackageSpec {
    /// Install the whole content of `url`.
    ///
    /// A target name or a sub-path must still be set before installing.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            url_subpath: None,
            target_name: None,
            files_to_remove: Vec::new(),
            should_refresh: false,
        }
    }

    /// Install only this path inside the downloaded content.
    ///
    /// The target name defaults to its last component.
    pub fn with_subpath(mut self, subpath: impl Into<String>) -> Self {
        self.url_subpath = Some(subpath.into());
        self
    }

    /// Install at `<root>/<name>`; `name` may contain `/`.
    pub fn with_target_name(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    /// Delete these paths, relative to the installed source, before the swap.
    pub fn with_files_to_remove<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files_to_remove.extend(files.into_iter().map(Into::into));
        self
    }

    /// Reinstall even if the recorded URL matches.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.should_refresh = refresh;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn url_subpath(&self) -> Option<&str> {
        self.url_subpath.as_deref()
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    pub fn files_to_remove(&self) -> &[String] {
        &self.files_to_remove
    }

    pub fn should_refresh(&self) -> bool {
        self.should_refresh
    }

    /// Validate the request and derive the target name.
    pub fn resolve(&self) -> Result<ResolvedSpec, ConfigurationError> {
        // "." selects the whole content, same as no sub-path.
        let subpath = match self.url_subpath.as_deref() {
            Some(raw) if !raw.is_empty() => {
                let normalized = fsutil::normalize(Path::new(raw));
                if normalized.as_os_str().is_empty() {
                    None
                } else if fsutil::is_contained_relative(&normalized) {
                    Some(normalized)
                } else {
                    return Err(ConfigurationError::InvalidSubpath(raw.to_string()));
                }
            }
            _ => None,
        };

        let target_name = match (&self.target_name, &subpath) {
            (Some(name), _) => canonical_target_name(name)?,
            (None, Some(subpath)) => subpath
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or(ConfigurationError::MissingTargetName)?,
            (None, None) => return Err(ConfigurationError::MissingTargetName),
        };

        for file in &self.files_to_remove {
            if !fsutil::is_contained_relative(&fsutil::normalize(Path::new(file))) {
                return Err(ConfigurationError::InvalidFileToRemove(file.clone()));
            }
        }

        Ok(ResolvedSpec {
            url: self.url.clone(),
            subpath,
            target_name,
            files_to_remove: self.files_to_remove.clone(),
            should_refresh: self.should_refresh,
        })
    }
}

/// `name` as plain components joined by `/`; it must name something below the root.
fn canonical_target_name(name: &str) -> Result<String, ConfigurationError> {
    let normalized = fsutil::normalize(Path::new(name));
    if !fsutil::is_contained_relative(&normalized) {
        return Err(ConfigurationError::InvalidTargetName(name.to_string()));
    }
    let components: Vec<_> = normalized
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(components.join("/"))
}

/// A validated [`PackageSpec`] with its target name filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpec {
    pub url: String,
    pub subpath: Option<PathBuf>,
    pub target_name: String,
    pub files_to_remove: Vec<String>,
    pub should_refresh: bool,
}

impl ResolvedSpec {
    /// Dotted package name used in log messages, e.g. `logilab.common`.
    pub fn package_name(&self) -> String {
        self.target_name.replace('/', ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_name_from_subpath() {
        let resolved = PackageSpec::new("http://example.org/pkg-1.0.tar.gz")
            .with_subpath("pkg-1.0/pkg/")
            .resolve()
            .unwrap();

        assert_eq!(resolved.target_name, "pkg");
        assert_eq!(resolved.subpath, Some(PathBuf::from("pkg-1.0/pkg")));
    }

    #[test]
    fn test_explicit_target_name_wins() {
        let resolved = PackageSpec::new("http://example.org/logilab-common-0.58.1.tar.gz")
            .with_subpath("logilab-common-0.58.1")
            .with_target_name("logilab/common")
            .resolve()
            .unwrap();

        assert_eq!(resolved.target_name, "logilab/common");
        assert_eq!(resolved.package_name(), "logilab.common");
    }

    #[test]
    fn test_missing_target_name() {
        let err = PackageSpec::new("http://example.org/pkg.zip").resolve().unwrap_err();
        assert_eq!(err, ConfigurationError::MissingTargetName);

        let err = PackageSpec::new("http://example.org/pkg.zip")
            .with_subpath("")
            .resolve()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::MissingTargetName);
    }

    #[test]
    fn test_target_name_without_subpath() {
        let resolved = PackageSpec::new("http://example.org/pep8.py")
            .with_target_name("pep8.py")
            .resolve()
            .unwrap();

        assert_eq!(resolved.subpath, None);
        assert_eq!(resolved.target_name, "pep8.py");
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let base = PackageSpec::new("http://example.org/pkg.zip");

        assert!(matches!(
            base.clone().with_target_name("../outside").resolve(),
            Err(ConfigurationError::InvalidTargetName(_))
        ));
        assert!(matches!(
            base.clone().with_target_name("/abs").resolve(),
            Err(ConfigurationError::InvalidTargetName(_))
        ));
        assert!(matches!(
            base.clone().with_subpath("../x").resolve(),
            Err(ConfigurationError::InvalidSubpath(_))
        ));
        assert!(matches!(
            base.with_target_name("pkg")
                .with_files_to_remove(["../../etc/passwd"])
                .resolve(),
            Err(ConfigurationError::InvalidFileToRemove(_))
        ));
    }

    #[test]
    fn test_target_name_must_be_below_root() {
        let base = PackageSpec::new("http://example.org/pkg.zip");

        for name in [".", "./", "", "a/.."] {
            assert!(
                matches!(
                    base.clone().with_target_name(name).resolve(),
                    Err(ConfigurationError::InvalidTargetName(_))
                ),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_target_name_is_canonical() {
        let base = PackageSpec::new("http://example.org/pkg.zip");

        for name in ["logilab/common", "logilab/common/", "./logilab//common", "logilab/common/."] {
            let resolved = base.clone().with_target_name(name).resolve().unwrap();
            assert_eq!(resolved.target_name, "logilab/common");
        }
    }

    #[test]
    fn test_dot_subpath_means_whole_content() {
        let resolved = PackageSpec::new("http://example.org/pkg-1.0.zip")
            .with_subpath(".")
            .with_target_name("pkg")
            .resolve()
            .unwrap();
        assert_eq!(resolved.subpath, None);
        assert_eq!(resolved.target_name, "pkg");

        let err = PackageSpec::new("http://example.org/pkg-1.0.zip")
            .with_subpath("./")
            .resolve()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::MissingTargetName);
    }

    #[test]
    fn test_builder_accessors() {
        let spec = PackageSpec::new("http://example.org/pkg.zip")
            .with_target_name("pkg")
            .with_files_to_remove(["setup.py", "tests/test_a.py"])
            .with_refresh(true);

        assert_eq!(spec.url(), "http://example.org/pkg.zip");
        assert_eq!(spec.target_name(), Some("pkg"));
        assert_eq!(spec.files_to_remove().len(), 2);
        assert!(spec.should_refresh());
    }
}
