//! Data provider trait, dataset sources and structured error types.
//!
//! The DataProvider trait abstracts over where dataset text comes from (a remote
//! static file host, a CSV shipped next to the binary, an inline string) so the
//! loader can swap implementations and tests can mock the network.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use super::http::HttpProvider;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("empty payload from {0}")]
    EmptyPayload(String),

    #[error("I/O error reading {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("malformed CSV: {0}")]
    MalformedCsv(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("API key missing: set the {variable} environment variable")]
    MissingApiKey { variable: String },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("cache error: {0}")]
    CacheError(String),
}

impl DataError {
    /// Errors that no fallback can recover from and must block the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DataError::MissingApiKey { .. })
    }
}

/// Where a dataset's text is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// Versioned CSV snapshot on a static file host.
    Remote(String),
    /// CSV file on the local filesystem.
    Local(PathBuf),
    /// Text already in memory (tests, embedded data).
    Inline { name: String, text: String },
}

impl DatasetSource {
    /// Interpret a CLI/config string: `http(s)://` is remote, anything else a path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            DatasetSource::Remote(raw.to_string())
        } else {
            DatasetSource::Local(PathBuf::from(raw))
        }
    }

    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        DatasetSource::Inline {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Origin reported when the data is read directly from this source.
    pub fn origin(&self) -> DataOrigin {
        match self {
            DatasetSource::Remote(_) => DataOrigin::Remote,
            DatasetSource::Local(_) => DataOrigin::Local,
            DatasetSource::Inline { .. } => DataOrigin::Inline,
        }
    }

    /// Cache key identifying this dataset: `dataset:<blake3 of the descriptor>`.
    pub fn cache_key(&self) -> String {
        let descriptor = match self {
            DatasetSource::Remote(url) => format!("remote:{url}"),
            DatasetSource::Local(path) => format!("local:{}", path.display()),
            DatasetSource::Inline { name, text } => format!("inline:{name}:{text}"),
        };
        format!("dataset:{}", blake3::hash(descriptor.as_bytes()).to_hex())
    }

    /// Whether results from this source are worth caching.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, DatasetSource::Inline { .. })
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Remote(url) => write!(f, "{url}"),
            DatasetSource::Local(path) => write!(f, "{}", path.display()),
            DatasetSource::Inline { name, .. } => write!(f, "inline:{name}"),
        }
    }
}

/// Where loaded data actually came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Remote,
    Local,
    Inline,
    Cache,
    Fallback,
}

impl DataOrigin {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DataOrigin::Fallback)
    }
}

/// Trait for dataset providers.
///
/// Implementations return raw text; parsing and cleaning happen above this trait,
/// and so does caching. Providers don't know about the cache.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the full text of a dataset.
    fn fetch_text(&self, source: &DatasetSource) -> Result<String, DataError>;
}

/// Provider that serves every source kind: HTTP for remote snapshots, the
/// filesystem for local files, and inline text as-is.
pub struct SourceProvider {
    http: HttpProvider,
}

impl SourceProvider {
    pub fn new(http: HttpProvider) -> Self {
        Self { http }
    }
}

impl DataProvider for SourceProvider {
    fn name(&self) -> &str {
        "source"
    }

    fn fetch_text(&self, source: &DatasetSource) -> Result<String, DataError> {
        let text = match source {
            DatasetSource::Remote(url) => self.http.get_text(url)?,
            DatasetSource::Local(path) => read_local(path)?,
            DatasetSource::Inline { text, .. } => text.clone(),
        };
        if text.trim().is_empty() {
            return Err(DataError::EmptyPayload(source.to_string()));
        }
        Ok(text)
    }
}

/// Read a local dataset file.
pub fn read_local(path: &std::path::Path) -> Result<String, DataError> {
    std::fs::read_to_string(path).map_err(|e| DataError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
