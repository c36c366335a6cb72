//! # Document Store Errors

use thiserror::Error;

use super::id::DocumentId;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unknown document identifier
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    /// Identifier collision on creation
    #[error("Document already exists: {0}")]
    AlreadyExists(DocumentId),

    /// Source PDF cannot be parsed, or has zero pages
    #[error("Malformed document {path}: {reason}")]
    MalformedDocument { path: String, reason: String },

    /// Document directory exists but its metadata record is missing or unparsable
    #[error("Inconsistent record for document {id}: {reason}")]
    InconsistentRecord { id: DocumentId, reason: String },

    /// Filesystem error on read/write
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Caller-supplied metadata is not a valid key/value mapping
    #[error("Invalid metadata: {0}")]
    InvalidInput(String),
}

impl StoreError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn malformed(path: impl AsRef<std::path::Path>, reason: impl Into<String>) -> Self {
        StoreError::MalformedDocument {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }

    pub fn inconsistent(id: DocumentId, reason: impl Into<String>) -> Self {
        StoreError::InconsistentRecord {
            id,
            reason: reason.into(),
        }
    }
}
