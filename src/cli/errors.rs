//! CLI-specific error types
//!
//! Every CLI failure prints its kind and message, then exits non-zero.

use thiserror::Error;

use crate::store::StoreError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Invalid JSON metadata: {0}")]
    InvalidMetadata(String),

    #[error("{0}")]
    Usage(String),

    #[error("{failed} of {total} files failed to ingest")]
    BatchFailures { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
