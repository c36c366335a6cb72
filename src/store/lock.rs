//! # Store Locks
//!
//! Cross-process advisory locks over dedicated lock files. The registry's
//! whole-file read-modify-write and each document's metadata read-modify-write
//! are only safe when serialized; independent worker processes mutate the same
//! store root, so an in-process mutex is not enough.
//!
//! Lock order, where both are needed: document lock first, then registry lock.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use super::errors::{StoreError, StoreResult};

/// RAII guard over an exclusive advisory file lock.
///
/// Blocks until the lock is acquired; released when the guard drops. The lock
/// file itself is left in place (empty, reused by the next writer).
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl StoreLock {
    /// Acquire an exclusive lock on `path`, creating the lock file if needed.
    pub fn acquire(path: &Path) -> StoreResult<StoreLock> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StoreError::io(path, e))?;

        file.lock_exclusive().map_err(|e| StoreError::io(path, e))?;

        Ok(StoreLock { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Best effort; the OS releases the lock on close regardless.
        let _ = self.file.unlock();
    }
}
