//! # Registry Index
//!
//! One structured file (`registry.json`) at the store root enumerating every
//! known document id with the structural projection of its metadata, plus an
//! index-wide `last_updated` timestamp. Lets consumers enumerate and resolve
//! paths without opening N per-document records; domain keys never appear
//! here.
//!
//! The index is always rewritten in full (read file, mutate in memory, write
//! file), so every write is a critical section: the whole read-modify-write
//! runs under the store-root lock, and the file is replaced via temp+rename.
//! Reads take no lock; the rename keeps the file contents atomic.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use super::id::DocumentId;
use super::lock::StoreLock;

/// Registry file name under the store root.
pub const REGISTRY_FILE: &str = "registry.json";
/// Lock file guarding registry read-modify-write.
pub const REGISTRY_LOCK_FILE: &str = "registry.lock";

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    documents: BTreeMap<DocumentId, Map<String, Value>>,
    last_updated: DateTime<Utc>,
}

/// Handle on the store-root registry index.
#[derive(Debug, Clone)]
pub struct RegistryIndex {
    path: PathBuf,
    lock_path: PathBuf,
}

impl RegistryIndex {
    pub fn new(root: &Path) -> Self {
        RegistryIndex {
            path: root.join(REGISTRY_FILE),
            lock_path: root.join(REGISTRY_LOCK_FILE),
        }
    }

    /// Seed an empty registry if none exists yet. Safe to race: the check and
    /// write run under the registry lock.
    pub fn ensure_exists(&self) -> StoreResult<()> {
        let _guard = StoreLock::acquire(&self.lock_path)?;
        if self.path.exists() {
            return Ok(());
        }
        let empty = RegistryFile {
            documents: BTreeMap::new(),
            last_updated: Utc::now(),
        };
        write_json_atomic(&self.path, &empty)
    }

    /// Every registry entry, verbatim. Structural fields only.
    pub fn load_all(&self) -> StoreResult<BTreeMap<DocumentId, Map<String, Value>>> {
        Ok(self.read_file()?.documents)
    }

    /// Insert or replace the entry for `id` and bump `last_updated`.
    /// Whole-file read-modify-write under the store-root lock.
    pub fn upsert(&self, id: DocumentId, entry: Map<String, Value>) -> StoreResult<()> {
        let _guard = StoreLock::acquire(&self.lock_path)?;

        let mut registry = self.read_file()?;
        registry.documents.insert(id, entry);
        registry.last_updated = Utc::now();

        write_json_atomic(&self.path, &registry)?;
        tracing::debug!(%id, "registry entry re-synced");
        Ok(())
    }

    fn read_file(&self) -> StoreResult<RegistryFile> {
        let raw = fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        serde_json::from_str(&raw).map_err(|e| {
            StoreError::io(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }
}

/// Write `value` as pretty-printed JSON via a temporary file in the same
/// directory, then atomically rename over `path`. A failed write never leaves
/// the destination truncated.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let tmp = path.with_extension("json.tmp");
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| StoreError::InvalidInput(e.to_string()))?;
    fs::write(&tmp, rendered).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}
