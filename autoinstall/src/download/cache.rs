//! Local directory of previously fetched archives.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, warn};

use crate::error::DownloadError;
use crate::fsutil;

/// Environment variable naming the local cache directory.
pub const CACHE_DIR_ENV: &str = "LOCAL_AUTOINSTALL_CACHE";

/// Read-through, write-through cache of raw downloads.
///
/// Entries are looked up by file name prefix: a request for `pkg.tar.gz`
/// is satisfied by any cached file whose name starts with `pkg.tar.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Create a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Find a cached file whose name starts with `filename`.
    ///
    /// The first match in glob order wins.
    pub fn lookup(&self, filename: &str) -> Option<PathBuf> {
        let pattern = format!(
            "{}/{}*",
            Pattern::escape(&self.dir.to_string_lossy()),
            Pattern::escape(filename)
        );

        let paths = match glob::glob(&pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid cache lookup pattern");
                return None;
            }
        };

        paths.filter_map(Result::ok).find(|path| path.is_file())
    }

    /// Copy everything in `scratch_dir` into the cache.
    ///
    /// This stores the whole scratch directory, not just the downloaded file.
    pub fn store_scratch(&self, scratch_dir: &Path) -> Result<(), DownloadError> {
        debug!(
            scratch = %scratch_dir.display(),
            cache = %self.dir.display(),
            "Copying scratch directory into local cache"
        );

        fsutil::copy_dir_recursive(scratch_dir, &self.dir).map_err(|e| DownloadError::Cache {
            path: self.dir.clone(),
            source: e,
        })
    }

    /// Whether `path` sits directly inside the cache directory.
    pub fn holds(&self, path: &Path) -> bool {
        path.parent()
            .map(|parent| fsutil::normalize(parent) == fsutil::normalize(&self.dir))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lookup_prefix_match() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("pep8-0.5.0.tar.gz"), "cached").unwrap();
        let cache = LocalCache::new(temp.path());

        let hit = cache.lookup("pep8-0.5.0.tar.gz").unwrap();
        assert_eq!(hit, temp.path().join("pep8-0.5.0.tar.gz"));

        let hit = cache.lookup("pep8-0.5").unwrap();
        assert_eq!(hit.file_name().unwrap(), "pep8-0.5.0.tar.gz");
    }

    #[test]
    fn test_lookup_miss() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("other.zip"), "cached").unwrap();
        let cache = LocalCache::new(temp.path());

        assert_eq!(cache.lookup("pkg.zip"), None);
    }

    #[test]
    fn test_lookup_escapes_glob_characters() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("pkgX.zip"), "cached").unwrap();
        let cache = LocalCache::new(temp.path());

        assert_eq!(cache.lookup("pkg?.zip"), None);
    }

    #[test]
    fn test_store_scratch_copies_everything() {
        let scratch = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        fs::write(scratch.path().join("pkg.zip"), "archive").unwrap();
        fs::create_dir(scratch.path().join("pkg")).unwrap();
        fs::write(scratch.path().join("pkg/mod.py"), "").unwrap();

        let cache = LocalCache::new(cache_dir.path());
        cache.store_scratch(scratch.path()).unwrap();

        assert!(cache_dir.path().join("pkg.zip").is_file());
        assert!(cache_dir.path().join("pkg/mod.py").is_file());
    }

    #[test]
    fn test_holds() {
        let cache = LocalCache::new("/var/cache/autoinstall/");
        assert!(cache.holds(Path::new("/var/cache/autoinstall/pkg.py")));
        assert!(cache.holds(Path::new("/var/cache/./autoinstall/pkg.py")));
        assert!(!cache.holds(Path::new("/var/cache/autoinstall/sub/pkg.py")));
        assert!(!cache.holds(Path::new("/tmp/pkg.py")));
    }
}
