//! # Dataset Materializer
//!
//! Flattens a document store into one external dataset file for pipeline
//! consumption: one JSON object per document, in registry order, with every
//! stored path rewritten from store-relative to filesystem-absolute and every
//! domain key from the full metadata record merged in.
//!
//! A document whose record is missing or unparsable degrades to its registry
//! projection; only an unreadable registry fails the whole operation.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::store::errors::{StoreError, StoreResult};
use crate::store::record::{parse_page_key, KEY_FILE_PATH, KEY_PAGES};
use crate::store::registry::{write_json_atomic, RegistryIndex};
use crate::store::store::METADATA_FILE;

/// Produce the flat dataset for the store at `root` and write it to `output`
/// (default: `<root dir name>_dataset.json` in the current directory).
/// Returns the number of documents materialized.
pub fn materialize(root: &Path, output: Option<&Path>) -> StoreResult<usize> {
    let root = fs::canonicalize(root).map_err(|e| StoreError::io(root, e))?;
    let entries = dataset_entries(&root)?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(&root)?,
    };
    write_json_atomic(&output, &entries)?;

    tracing::info!(documents = entries.len(), output = %output.display(), "dataset materialized");
    Ok(entries.len())
}

/// One flat `{"uuid", ...fields}` object per registered document, with
/// absolute paths. Exposed separately so callers can consume the dataset
/// without going through a file.
pub fn dataset_entries(root: &Path) -> StoreResult<Vec<Value>> {
    let registry = RegistryIndex::new(root);
    let documents = registry.load_all()?;

    let mut entries = Vec::with_capacity(documents.len());
    for (id, projection) in documents {
        let metadata_path = root.join(id.dir_name()).join(METADATA_FILE);
        let metadata = match read_record_map(&metadata_path) {
            Some(map) => map,
            None => {
                // Degraded entry: structural fields only.
                tracing::warn!(%id, "metadata record missing or unparsable, using registry entry");
                projection
            }
        };

        let mut entry = Map::new();
        entry.insert("uuid".into(), Value::String(id.to_string()));
        for (key, value) in metadata {
            entry.insert(key.clone(), absolutize(root, &key, value));
        }
        entries.push(Value::Object(entry));
    }
    Ok(entries)
}

fn read_record_map(path: &Path) -> Option<Map<String, Value>> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Rewrite path-valued fields (`file_path`, `pages`, `page_<n>`) against the
/// store root; everything else passes through verbatim.
fn absolutize(root: &Path, key: &str, value: Value) -> Value {
    let is_path_key = key == KEY_FILE_PATH || parse_page_key(key).is_some();
    match value {
        Value::String(rel) if is_path_key => {
            Value::String(root.join(rel).display().to_string())
        }
        Value::Array(items) if key == KEY_PAGES => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(rel) => {
                        Value::String(root.join(rel).display().to_string())
                    }
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

fn default_output_path(root: &Path) -> StoreResult<PathBuf> {
    let name = root
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            StoreError::InvalidInput(format!("store root has no name: {}", root.display()))
        })?;
    Ok(PathBuf::from(format!("{}_dataset.json", name)))
}
