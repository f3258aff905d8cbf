use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Candidate path rejected by the codec.
///
/// Non-fatal: the scheduler logs it, counts it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed path {path:?}: {reason}")]
    MalformedPath { path: PathBuf, reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Retention configuration could not be loaded.
///
/// Fatal at startup: the scheduler never runs without a resolved default.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read retention config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("retention config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid retention config: {0}")]
    Invalid(String),
}

/// Classified result of a failed delete call.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// Directory still has children; retried with backoff.
    #[error("directory not empty")]
    NotEmpty,

    /// Target is already gone; treated as success.
    #[error("directory not found")]
    NotFound,

    /// Anything else (permission, I/O, not a directory, ...). Not retried.
    #[error("{0}")]
    Other(#[source] io::Error),
}

impl From<io::Error> for DeleteError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::DirectoryNotEmpty => DeleteError::NotEmpty,
            io::ErrorKind::NotFound => DeleteError::NotFound,
            _ => DeleteError::Other(err),
        }
    }
}

/// Crate-level error for callers that do not care which stage failed.
#[derive(Debug, Error)]
pub enum SweeperError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Delete(#[from] DeleteError),
}
