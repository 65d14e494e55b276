//! Error type for the document store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse classification of a [`StoreError`], used by callers that only
/// need to know which class of failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Io,
    Serialization,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid schema id {id:?}: {reason}")]
    InvalidInput { id: String, reason: &'static str },

    #[error("schema not found: {id}")]
    NotFound { id: String },

    #[error("failed to {op} at {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to {op}: {source}")]
    Serialization {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("registry file {} is not valid JSON: {source}", path.display())]
    CorruptRegistry {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(id: &str) -> Self {
        StoreError::NotFound { id: id.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidInput { .. } => ErrorKind::InvalidInput,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Io { .. } => ErrorKind::Io,
            StoreError::Serialization { .. } | StoreError::CorruptRegistry { .. } => {
                ErrorKind::Serialization
            }
        }
    }
}
