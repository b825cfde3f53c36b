//! Retrying, mirror-aware file downloader.
//!
//! A download walks three layers before giving up:
//! - the local cache, if one is configured (no network at all on a hit)
//! - up to `max_retries` repeated attempts on the same URL
//! - mirror substitution, which resets the retry counter for each new host

mod cache;
mod transport;

pub use cache::{LocalCache, CACHE_DIR_ENV};
pub use transport::{HttpTransport, Response, Transport};

#[cfg(test)]
pub(crate) use transport::tests::{Reply, ScriptedTransport};

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AttemptError, DownloadError};
use crate::mirror::{MirrorConfig, MirrorTable};

/// Default per-attempt timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of same-URL retries before trying a mirror.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Buffer size for streaming response bodies (8KB).
const CHUNK_SIZE: usize = 8 * 1024;

/// A file made available locally by [`Downloader::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Where the bytes are on disk.
    pub path: PathBuf,
    /// URL that actually served the bytes; `None` for cache hits.
    pub served_by: Option<String>,
    /// Whether the file came from the local cache.
    pub from_cache: bool,
}

/// Derive the local file name from the last segment of a URL path.
///
/// Query strings and fragments are ignored.
pub fn target_filename(url: &str) -> Result<String, DownloadError> {
    let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let name = parsed
        .path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if name.is_empty() || name == "." || name == ".." {
        return Err(DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: "URL path does not name a file".to_string(),
        });
    }

    Ok(name.to_string())
}

fn is_file_url(url: &str) -> bool {
    url.get(..5)
        .map(|scheme| scheme.eq_ignore_ascii_case("file:"))
        .unwrap_or(false)
}

/// Fetches URLs with bounded retries and mirror fallback.
#[derive(Debug)]
pub struct Downloader<T: Transport = HttpTransport> {
    transport: T,
    mirrors: MirrorConfig,
    cache: Option<LocalCache>,
    timeout: Duration,
    max_retries: u32,
}

impl<T: Transport> Downloader<T> {
    /// Create a downloader with no mirrors and no cache.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mirrors: MirrorConfig::default(),
            cache: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set the mirror hosts.
    pub fn with_mirrors(mut self, mirrors: MirrorConfig) -> Self {
        self.mirrors = mirrors;
        self
    }

    /// Set the local cache.
    pub fn with_cache(mut self, cache: Option<LocalCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many times a URL is retried before a mirror is tried.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The local cache, if configured.
    pub fn cache(&self) -> Option<&LocalCache> {
        self.cache.as_ref()
    }

    /// Stream the contents of `url` into `stream`.
    ///
    /// Returns the URL that finally served the bytes, which differs from
    /// `url` when a mirror was used. The local cache is not consulted.
    pub fn download_to_stream(&self, url: &str, stream: &mut dyn Write) -> Result<String, DownloadError> {
        let mut mirrors = MirrorTable::new(&self.mirrors);
        let mut current = url.to_string();
        let mut failures = 0;

        let mut body = loop {
            match self.open_checked(&current) {
                Ok(body) => break body,
                Err(err) => {
                    if failures < self.max_retries {
                        failures += 1;
                        warn!(url = %current, error = %err, attempt = failures, "Download failed, retrying");
                        continue;
                    }

                    match mirrors.next_url(&current) {
                        Some(mirror) => {
                            info!(from = %current, to = %mirror, "Download failed, trying mirror");
                            current = mirror;
                            failures = 0;
                        }
                        None => {
                            return Err(DownloadError::Exhausted {
                                url: current,
                                source: err,
                            })
                        }
                    }
                }
            }
        };

        copy_chunked(&mut body, stream, &current)?;
        Ok(current)
    }

    /// Download `url` into `scratch_dir`, or take it from the cache.
    ///
    /// On a cache hit the cached file is returned in place and nothing is
    /// written back. After a network download the whole scratch directory
    /// is copied into the cache.
    pub fn download(&self, url: &str, scratch_dir: &Path) -> Result<DownloadedFile, DownloadError> {
        let filename = target_filename(url)?;

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.lookup(&filename) {
                debug!(url, path = %hit.display(), "Using cached download");
                return Ok(DownloadedFile {
                    path: hit,
                    served_by: None,
                    from_cache: true,
                });
            }
        }

        let path = scratch_dir.join(&filename);
        debug!(url, path = %path.display(), "Downloading");

        let file = File::create(&path).map_err(|e| DownloadError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);
        let served_by = self.download_to_stream(url, &mut writer)?;
        writer.flush().map_err(|e| DownloadError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;
        drop(writer);

        if let Some(cache) = &self.cache {
            cache.store_scratch(scratch_dir)?;
        }

        Ok(DownloadedFile {
            path,
            served_by: Some(served_by),
            from_cache: false,
        })
    }

    /// Open `url` and reject unacceptable statuses.
    fn open_checked(&self, url: &str) -> Result<Box<dyn Read + Send>, AttemptError> {
        let response = self.transport.open(url, self.timeout)?;

        if let Some(status) = response.status {
            if !is_file_url(url) && !(200..300).contains(&status) {
                return Err(AttemptError::Status {
                    url: url.to_string(),
                    status,
                });
            }
        }

        Ok(response.body)
    }
}

/// Copy `reader` into `writer` one chunk at a time.
fn copy_chunked(reader: &mut dyn Read, writer: &mut dyn Write, url: &str) -> Result<u64, DownloadError> {
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(DownloadError::Transfer {
                    url: url.to_string(),
                    source: e,
                })
            }
        };

        writer
            .write_all(&buffer[..n])
            .map_err(|e| DownloadError::StreamWrite {
                url: url.to_string(),
                source: e,
            })?;
        total += n as u64;
    }

    Ok(total)
}
