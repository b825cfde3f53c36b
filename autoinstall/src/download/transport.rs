//! URL transport abstraction for testability.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::TransportError;

/// An opened URL ready to be streamed.
pub struct Response {
    /// HTTP status code, or `None` for schemes without one (`file:`).
    pub status: Option<u16>,
    /// Body reader. Dropping it releases the underlying connection or file.
    pub body: Box<dyn Read + Send>,
}

impl Response {
    /// Create a response with an HTTP status.
    pub fn http(status: u16, body: impl Read + Send + 'static) -> Self {
        Self {
            status: Some(status),
            body: Box::new(body),
        }
    }

    /// Create a response for a local resource.
    pub fn local(body: impl Read + Send + 'static) -> Self {
        Self {
            status: None,
            body: Box::new(body),
        }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Trait for opening URLs.
///
/// This abstraction allows the downloader to be driven by a scripted
/// transport in tests.
pub trait Transport: Send + Sync {
    /// Open `url`, giving up after `timeout`.
    ///
    /// `timeout` bounds the whole attempt: connecting, receiving headers and
    /// reading the body through [`Response::body`]. A body still streaming
    /// when it expires fails with a read error.
    ///
    /// Status codes are not interpreted here; the downloader decides which
    /// ones are acceptable.
    fn open(&self, url: &str, timeout: Duration) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn open(&self, url: &str, timeout: Duration) -> Result<Response, TransportError> {
        (**self).open(url, timeout)
    }
}

/// Real transport using reqwest for `http`/`https` and the filesystem for `file`.
///
/// The blocking client has no read-inactivity timeout, so the per-request
/// timeout is a deadline for the entire transfer. `file:` URLs ignore it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("autoinstall/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    fn open_file(url: &Url) -> Result<Response, TransportError> {
        let path = url
            .to_file_path()
            .map_err(|_| TransportError::File {
                path: PathBuf::from(url.path()),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a local path"),
            })?;
        let file = File::open(&path).map_err(|e| TransportError::File { path, source: e })?;
        Ok(Response::local(file))
    }

    fn open_http(&self, url: &str, timeout: Duration) -> Result<Response, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        url: url.to_string(),
                        timeout_secs: timeout.as_secs(),
                        source: e,
                    }
                } else {
                    TransportError::Http {
                        url: url.to_string(),
                        source: e,
                    }
                }
            })?;

        Ok(Response::http(response.status().as_u16(), response))
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str, timeout: Duration) -> Result<Response, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::Other(format!("invalid URL {}: {}", url, e)))?;

        match parsed.scheme() {
            "file" => Self::open_file(&parsed),
            "http" | "https" => self.open_http(url, timeout),
            scheme => Err(TransportError::UnsupportedScheme {
                url: url.to_string(),
                scheme: scheme.to_string(),
            }),
        }
    }
}
