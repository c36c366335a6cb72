//! # Document Identity
//!
//! Opaque per-document identifiers and directory minting. Identifiers are
//! random UUIDs rendered as strings; they name the document's directory and
//! its registry entry, are never reused, and are never derived from content.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};

/// Opaque document identifier, minted once at ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Mint a fresh random identifier
    pub fn mint() -> Self {
        DocumentId(Uuid::new_v4())
    }

    /// The directory name for this document under a store root
    pub fn dir_name(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(DocumentId)
            .map_err(|e| StoreError::InvalidInput(format!("invalid document id '{}': {}", s, e)))
    }
}

/// Mint a fresh identifier and create its directory under `root`.
///
/// Fails with `AlreadyExists` on the (astronomically unlikely) collision;
/// callers retry with a new id. No side effects beyond directory creation.
pub fn create_document_directory(root: &Path) -> StoreResult<(DocumentId, PathBuf)> {
    let id = DocumentId::mint();
    let dir = root.join(id.dir_name());

    match fs::create_dir(&dir) {
        Ok(()) => Ok((id, dir)),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(StoreError::AlreadyExists(id))
        }
        Err(e) => Err(StoreError::io(&dir, e)),
    }
}
