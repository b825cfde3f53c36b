//! Turning a downloaded file into an installable path.
//!
//! Supported formats are `.zip`, `.tar.gz` and `.tar.bz2`. Anything else is
//! used as-is, except that raw files served from the local cache are copied
//! into the scratch directory first so the install never moves a cache entry.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::download::LocalCache;
use crate::error::ArchiveError;

/// Archive format, chosen from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// A zip file, extracted directly into the scratch directory.
    Zip,
    /// A gzip-compressed tarball.
    TarGz,
    /// A bzip2-compressed tarball.
    TarBz2,
}

impl ArchiveKind {
    /// Detect the archive kind from a path's name.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") {
            Some(Self::TarBz2)
        } else {
            None
        }
    }

    /// The file-name suffix for this kind.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::TarGz => ".tar.gz",
            Self::TarBz2 => ".tar.bz2",
        }
    }

    /// `name` with this kind's suffix removed.
    fn stem<'a>(&self, name: &'a str) -> &'a str {
        name.strip_suffix(self.suffix()).unwrap_or(name)
    }
}

/// Prepares downloaded files for installation.
#[derive(Debug, Clone, Default)]
pub struct ArchivePreparer {
    cache: Option<LocalCache>,
}

impl ArchivePreparer {
    /// Create a preparer; `cache` enables copying raw files out of the cache.
    pub fn new(cache: Option<LocalCache>) -> Self {
        Self { cache }
    }

    /// Prepare `path` for use and return the path holding the usable content.
    ///
    /// - zip archives are extracted into `scratch_dir`; the result is
    ///   `<scratch_dir>/<name without .zip>`
    /// - tarballs are extracted into `<scratch_dir>/<name without suffix>`
    /// - a raw file sitting directly in the cache directory is copied into
    ///   `scratch_dir`
    /// - anything else is returned unchanged
    pub fn prepare(&self, path: &Path, scratch_dir: &Path) -> Result<PathBuf, ArchiveError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match ArchiveKind::detect(path) {
            Some(kind @ ArchiveKind::Zip) => {
                extract_zip(path, scratch_dir)?;
                Ok(scratch_dir.join(kind.stem(&name)))
            }
            Some(kind) => {
                let target = scratch_dir.join(kind.stem(&name));
                extract_tar(path, kind, &target)?;
                Ok(target)
            }
            None => match &self.cache {
                Some(cache) if cache.holds(path) => copy_from_cache(path, &name, scratch_dir),
                _ => Ok(path.to_path_buf()),
            },
        }
    }
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), ArchiveError> {
    debug!(archive = %archive_path.display(), dest = %dest_dir.display(), "Extracting zip archive");

    let file = File::open(archive_path).map_err(|e| ArchiveError::ReadFailed {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let zip_error = |source: zip::result::ZipError| ArchiveError::Zip {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(zip_error)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_error)?;
        let relative = entry.enclosed_name().ok_or_else(|| ArchiveError::UnsafeEntry {
            path: archive_path.to_path_buf(),
            name: entry.name().to_string(),
        })?;
        let dest_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path).map_err(|e| ArchiveError::CreateDirFailed {
                path: dest_path.clone(),
                source: e,
            })?;
            continue;
        }

        let outfile = create_entry_file(&dest_path)?;
        copy_entry(&mut entry, outfile, &dest_path).map_err(|e| match e {
            EntryCopyError::Read(e) => zip_error(e.into()),
            EntryCopyError::Write(source) => ArchiveError::WriteFailed {
                path: dest_path.clone(),
                source,
            },
        })?;
    }

    Ok(())
}

enum EntryCopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Stream one zip entry to disk in fixed-size chunks.
///
/// The size declared in the archive is never trusted for allocation.
fn copy_entry<R: Read>(entry: &mut R, outfile: File, dest_path: &Path) -> Result<(), EntryCopyError> {
    let mut writer = BufWriter::new(outfile);
    let mut buffer = [0u8; 64 * 1024];
    let mut written: u64 = 0;

    loop {
        let n = match entry.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EntryCopyError::Read(e)),
        };
        writer.write_all(&buffer[..n]).map_err(EntryCopyError::Write)?;
        written += n as u64;
    }
    writer.flush().map_err(EntryCopyError::Write)?;

    debug!(path = %dest_path.display(), bytes = written, "Extracted zip entry");
    Ok(())
}

/// Create an extracted file, creating its directory if the archive did not
/// list it.
fn create_entry_file(path: &Path) -> Result<File, ArchiveError> {
    let write_failed = |e: io::Error| ArchiveError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    match File::create(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Creating missing directory for zip entry");
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| ArchiveError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            File::create(path).map_err(write_failed)
        }
        Err(e) => Err(write_failed(e)),
    }
}

fn extract_tar(archive_path: &Path, kind: ArchiveKind, dest_dir: &Path) -> Result<(), ArchiveError> {
    debug!(archive = %archive_path.display(), dest = %dest_dir.display(), "Extracting tar archive");

    let file = File::open(archive_path).map_err(|e| ArchiveError::ReadFailed {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let decoder: Box<dyn Read> = match kind {
        ArchiveKind::TarBz2 => Box::new(bzip2::read::BzDecoder::new(reader)),
        _ => Box::new(flate2::read::GzDecoder::new(reader)),
    };

    tar::Archive::new(decoder)
        .unpack(dest_dir)
        .map_err(|e| ArchiveError::Tar {
            path: archive_path.to_path_buf(),
            source: e,
        })
}

fn copy_from_cache(path: &Path, name: &str, scratch_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let target = scratch_dir.join(name);
    debug!(from = %path.display(), to = %target.display(), "Copying cached file into scratch directory");

    fs::copy(path, &target).map_err(|e| ArchiveError::WriteFailed {
        path: target.clone(),
        source: e,
    })?;
    Ok(target)
}
