//! # Metadata Record
//!
//! The full, authoritative set of key/value facts known about one document,
//! persisted as a single flat JSON object per document (`metadata.json`).
//!
//! Keys split into two informal namespaces:
//! - *structural* keys the store itself guarantees: `original_filename`,
//!   `import_date`, `page_count`, `file_path`, `pages`, and one `page_<n>`
//!   entry per page for direct per-page lookup;
//! - *domain* keys added incrementally by collaborators (extracted form
//!   fields, external record ids, provenance flags) - open-ended, untyped.
//!
//! Merge semantics are shallow last-write-wins per key. This is an explicit
//! contract: collaborators patch a subset of fields without touching the rest.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};

/// Structural key: source file's base name.
pub const KEY_ORIGINAL_FILENAME: &str = "original_filename";
/// Structural key: ingestion timestamp, RFC 3339.
pub const KEY_IMPORT_DATE: &str = "import_date";
/// Structural key: number of pages split out of the source.
pub const KEY_PAGE_COUNT: &str = "page_count";
/// Structural key: store-relative path to the whole-document PDF.
pub const KEY_FILE_PATH: &str = "file_path";
/// Structural key: ordered store-relative per-page paths.
pub const KEY_PAGES: &str = "pages";

const PAGE_KEY_PATTERN: &str = r"^page_(\d+)$";

/// Parse a `page_<n>` key, returning the 1-indexed page number.
pub fn parse_page_key(key: &str) -> Option<u32> {
    // Compiled per call; these are short strings on cold paths.
    let re = Regex::new(PAGE_KEY_PATTERN).expect("page key pattern is valid");
    re.captures(key)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Is `key` one the store itself maintains (fixed structural or `page_<n>`)?
pub fn is_structural_key(key: &str) -> bool {
    matches!(
        key,
        KEY_ORIGINAL_FILENAME | KEY_IMPORT_DATE | KEY_PAGE_COUNT | KEY_FILE_PATH | KEY_PAGES
    ) || parse_page_key(key).is_some()
}

/// The fields whose presence and shape the store guarantees after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralFields {
    pub original_filename: String,
    pub import_date: DateTime<Utc>,
    pub page_count: u32,
    pub file_path: String,
    pub pages: Vec<String>,
    /// `page_<n>` lookup entries, keyed by 1-indexed page number. Stored
    /// separately from `pages` so a targeted correction to one key never
    /// silently rewrites the other.
    pub page_entries: BTreeMap<u32, String>,
}

impl StructuralFields {
    /// Flatten into the JSON object shape shared by the per-document record
    /// and the registry entry, carrying every `page_<n>` entry present.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            KEY_ORIGINAL_FILENAME.into(),
            Value::String(self.original_filename.clone()),
        );
        map.insert(
            KEY_IMPORT_DATE.into(),
            Value::String(self.import_date.to_rfc3339()),
        );
        map.insert(KEY_PAGE_COUNT.into(), Value::from(self.page_count));
        map.insert(KEY_FILE_PATH.into(), Value::String(self.file_path.clone()));
        map.insert(
            KEY_PAGES.into(),
            Value::Array(self.pages.iter().cloned().map(Value::String).collect()),
        );
        for (n, path) in &self.page_entries {
            map.insert(format!("page_{}", n), Value::String(path.clone()));
        }
        map
    }

    /// The registry entry for this document: the flat structural object, with
    /// `page_<n>` entries restricted to `1..=page_count`. Stray entries beyond
    /// the page count stay in the per-document record but are never indexed.
    pub fn registry_entry(&self) -> Map<String, Value> {
        let mut map = self.to_map();
        let stray: Vec<String> = self
            .page_entries
            .keys()
            .filter(|&&n| n == 0 || n > self.page_count)
            .map(|n| format!("page_{}", n))
            .collect();
        for key in stray {
            map.remove(&key);
        }
        map
    }
}

/// The full per-document fact sheet: guaranteed structural fields plus an
/// open domain map.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    pub structural: StructuralFields,
    pub domain: Map<String, Value>,
}

impl MetadataRecord {
    /// Build a fresh record at ingestion time, overlaying any caller-supplied
    /// initial metadata (caller values win on key collision).
    pub fn new(
        structural: StructuralFields,
        initial: Option<Map<String, Value>>,
    ) -> StoreResult<MetadataRecord> {
        let mut record = MetadataRecord {
            structural,
            domain: Map::new(),
        };
        if let Some(patch) = initial {
            record.merge(&patch)?;
        }
        Ok(record)
    }

    /// Shallow merge: every key in `patch` overwrites the existing value;
    /// keys not mentioned are untouched. Returns whether any structural key
    /// (fixed or `page_<n>`) was touched, i.e. whether the registry entry
    /// must be re-derived.
    pub fn merge(&mut self, patch: &Map<String, Value>) -> StoreResult<bool> {
        let mut structural_touched = false;

        for (key, value) in patch {
            match key.as_str() {
                KEY_ORIGINAL_FILENAME => {
                    self.structural.original_filename = require_string(key, value)?;
                    structural_touched = true;
                }
                KEY_FILE_PATH => {
                    self.structural.file_path = require_string(key, value)?;
                    structural_touched = true;
                }
                KEY_IMPORT_DATE => {
                    let raw = require_string(key, value)?;
                    self.structural.import_date = DateTime::parse_from_rfc3339(&raw)
                        .map(|d| d.with_timezone(&Utc))
                        .map_err(|e| {
                            StoreError::InvalidInput(format!(
                                "key 'import_date' is not an RFC 3339 timestamp: {}",
                                e
                            ))
                        })?;
                    structural_touched = true;
                }
                KEY_PAGE_COUNT => {
                    let n = value.as_u64().ok_or_else(|| {
                        StoreError::InvalidInput(format!(
                            "key 'page_count' must be a non-negative integer, got {}",
                            value
                        ))
                    })?;
                    self.structural.page_count = u32::try_from(n).map_err(|_| {
                        StoreError::InvalidInput(format!("page_count {} out of range", n))
                    })?;
                    structural_touched = true;
                }
                KEY_PAGES => {
                    let list = value.as_array().ok_or_else(|| {
                        StoreError::InvalidInput(format!(
                            "key 'pages' must be an array of paths, got {}",
                            value
                        ))
                    })?;
                    let mut pages = Vec::with_capacity(list.len());
                    for item in list {
                        pages.push(require_string(KEY_PAGES, item)?);
                    }
                    self.structural.pages = pages;
                    structural_touched = true;
                }
                _ => {
                    if let Some(n) = parse_page_key(key) {
                        self.structural
                            .page_entries
                            .insert(n, require_string(key, value)?);
                        structural_touched = true;
                    } else {
                        self.domain.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        Ok(structural_touched)
    }

    /// Flatten to the single persisted JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.structural.to_map();
        for (key, value) in &self.domain {
            map.insert(key.clone(), value.clone());
        }
        map
    }

    /// Reconstruct from a persisted JSON value. Any missing or ill-typed
    /// structural field is an error; the caller decides whether that means
    /// `InconsistentRecord` or `InvalidInput` in its context.
    pub fn from_value(value: Value) -> StoreResult<MetadataRecord> {
        let Value::Object(mut map) = value else {
            return Err(StoreError::InvalidInput(
                "metadata record is not a JSON object".into(),
            ));
        };

        let original_filename = take_string(&mut map, KEY_ORIGINAL_FILENAME)?;
        let import_raw = take_string(&mut map, KEY_IMPORT_DATE)?;
        let import_date = DateTime::parse_from_rfc3339(&import_raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| {
                StoreError::InvalidInput(format!("key 'import_date' is not RFC 3339: {}", e))
            })?;
        let page_count = map
            .remove(KEY_PAGE_COUNT)
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                StoreError::InvalidInput("key 'page_count' missing or not an integer".into())
            })?;
        let file_path = take_string(&mut map, KEY_FILE_PATH)?;
        let pages = match map.remove(KEY_PAGES) {
            Some(Value::Array(items)) => {
                let mut pages = Vec::with_capacity(items.len());
                for item in &items {
                    pages.push(require_string(KEY_PAGES, item)?);
                }
                pages
            }
            _ => {
                return Err(StoreError::InvalidInput(
                    "key 'pages' missing or not an array".into(),
                ))
            }
        };

        let mut page_entries = BTreeMap::new();
        let mut domain = Map::new();
        for (key, value) in map {
            if let Some(n) = parse_page_key(&key) {
                page_entries.insert(n, require_string(&key, &value)?);
            } else {
                domain.insert(key, value);
            }
        }

        Ok(MetadataRecord {
            structural: StructuralFields {
                original_filename,
                import_date,
                page_count,
                file_path,
                pages,
                page_entries,
            },
            domain,
        })
    }
}

impl Serialize for MetadataRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::Object(self.to_map()).serialize(serializer)
    }
}

fn require_string(key: &str, value: &Value) -> StoreResult<String> {
    value.as_str().map(str::to_owned).ok_or_else(|| {
        StoreError::InvalidInput(format!("key '{}' must be a string, got {}", key, value))
    })
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> StoreResult<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(StoreError::InvalidInput(format!(
            "key '{}' must be a string, got {}",
            key, other
        ))),
        None => Err(StoreError::InvalidInput(format!("key '{}' missing", key))),
    }
}
