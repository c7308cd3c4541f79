//! Error types for unit lifecycle operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for unit operations
pub type UnitResult<T> = std::result::Result<T, UnitError>;

/// Failure category reported to callers and observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Registry unreachable, timed out, or answered with an error status
    Network,
    /// A registry document did not have the expected shape
    Decode,
    /// Archive layout or integrity was not acceptable
    ArchiveFormat,
    /// Local disk or store failure
    Filesystem,
    /// Unit or tag unknown, or not installed
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Decode => "decode",
            ErrorKind::ArchiveFormat => "archive_format",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the registry client, installer, store and orchestrator
#[derive(Error, Debug)]
pub enum UnitError {
    /// Transport failure talking to the registry
    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// Request exceeded its deadline
    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Registry answered with a non-success status
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Response body could not be decoded
    #[error("Malformed document from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Archive does not follow the single wrapper directory layout
    #[error("Unexpected archive layout: {reason}")]
    ArchiveFormat { reason: String },

    /// Downloaded archive does not match the published digest
    #[error("Integrity check failed for {url}: expected {expected}")]
    IntegrityMismatch { url: String, expected: String },

    /// Filesystem operation failed
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key-value store failure
    #[error("Store error for key {key}: {reason}")]
    Store { key: String, reason: String },

    /// Unit, tag or installation not found
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Background task died before producing a result
    #[error("Background task failed: {0}")]
    Task(String),
}

impl UnitError {
    pub fn network(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Decode {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn archive_format(reason: impl Into<String>) -> Self {
        Self::ArchiveFormat {
            reason: reason.into(),
        }
    }

    pub fn filesystem(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn store(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Store {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Map the error onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnitError::Network { .. } | UnitError::Timeout { .. } | UnitError::HttpStatus { .. } => {
                ErrorKind::Network
            }
            UnitError::Decode { .. } => ErrorKind::Decode,
            UnitError::ArchiveFormat { .. } | UnitError::IntegrityMismatch { .. } => {
                ErrorKind::ArchiveFormat
            }
            UnitError::Filesystem { .. } | UnitError::Store { .. } | UnitError::Task(_) => {
                ErrorKind::Filesystem
            }
            UnitError::NotFound { .. } => ErrorKind::NotFound,
        }
    }
}

/// Attach a path to `std::io::Result`s
pub(crate) trait IoResultExt<T> {
    fn at_path(self, path: &Path) -> UnitResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: &Path) -> UnitResult<T> {
        self.map_err(|e| UnitError::filesystem(path, e))
    }
}
