use std::io;
use std::path::Path;
use std::time::Duration;

use alps_core::AlpsDocument;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ResolverConfig;

/// Why an external document could not be loaded. Cloneable so one failed
/// load can be handed to every requester that waited on it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum LoadError {
    #[error("external document not found: {location}")]
    NotFound { location: String },
    #[error("failed to read {location}: {message}")]
    Io { location: String, message: String },
    #[error("failed to fetch {location}: {message}")]
    Http { location: String, message: String },
    #[error("loading {location} timed out after {timeout_ms} ms")]
    Timeout { location: String, timeout_ms: u64 },
    #[error("external document {location} is not a valid profile: {message}")]
    Parse { location: String, message: String },
    #[error("remote loading is disabled: {location}")]
    RemoteDisabled { location: String },
}

impl LoadError {
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::NotFound { location }
            | Self::Io { location, .. }
            | Self::Http { location, .. }
            | Self::Timeout { location, .. }
            | Self::Parse { location, .. }
            | Self::RemoteDisabled { location } => location,
        }
    }

    #[must_use]
    pub fn timeout(location: &str, timeout: Duration) -> Self {
        Self::Timeout {
            location: location.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Source of external profiles keyed by location (file path or URL).
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, location: &str) -> Result<AlpsDocument, LoadError>;
}

/// Loads from the filesystem with `tokio::fs` and from `http(s)://` with reqwest.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: Client,
    allow_remote: bool,
    timeout: Duration,
}

impl SourceLoader {
    pub fn new(config: &ResolverConfig) -> Result<Self, LoadError> {
        let timeout = config.effective_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| LoadError::Http {
                location: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            allow_remote: config.allow_remote,
            timeout,
        })
    }

    async fn fetch_remote(&self, location: &str) -> Result<String, LoadError> {
        if !self.allow_remote {
            return Err(LoadError::RemoteDisabled {
                location: location.to_string(),
            });
        }

        let http_error = |err: reqwest::Error| {
            if err.is_timeout() {
                LoadError::timeout(location, self.timeout)
            } else {
                LoadError::Http {
                    location: location.to_string(),
                    message: err.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(http_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound {
                location: location.to_string(),
            });
        }
        response
            .error_for_status()
            .map_err(http_error)?
            .text()
            .await
            .map_err(http_error)
    }

    async fn read_file(location: &str) -> Result<String, LoadError> {
        tokio::fs::read_to_string(Path::new(location))
            .await
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => LoadError::NotFound {
                    location: location.to_string(),
                },
                _ => LoadError::Io {
                    location: location.to_string(),
                    message: err.to_string(),
                },
            })
    }
}

#[async_trait]
impl DocumentLoader for SourceLoader {
    async fn load(&self, location: &str) -> Result<AlpsDocument, LoadError> {
        let text = if is_remote(location) {
            self.fetch_remote(location).await?
        } else {
            Self::read_file(location).await?
        };
        debug!(location, bytes = text.len(), "read external profile");

        alps_parser::parse(&text, None)
            .map(|parsed| parsed.document)
            .map_err(|err| LoadError::Parse {
                location: location.to_string(),
                message: err.to_string(),
            })
    }
}

#[must_use]
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Cache key for the document part of an external reference. Relative file
/// paths are anchored at `base_dir`; URLs and absolute paths pass through.
#[must_use]
pub fn locate(base_dir: Option<&Path>, path: &str) -> String {
    if is_remote(path) {
        return path.to_string();
    }
    let path = path.strip_prefix("file://").unwrap_or(path);
    match base_dir {
        Some(base) if Path::new(path).is_relative() => {
            base.join(path).to_string_lossy().into_owned()
        }
        _ => path.to_string(),
    }
}
