//! # Document Store
//!
//! The façade composing identity, page splitting, metadata records, and the
//! registry index. Creates documents, merges metadata patches, re-syncs the
//! registry when structural fields change, and answers enumeration queries.
//!
//! Documents are never deleted through this interface; a directory exists
//! exactly as long as its document does.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use super::id::{self, DocumentId};
use super::lock::StoreLock;
use super::record::{MetadataRecord, StructuralFields};
use super::registry::{write_json_atomic, RegistryIndex};
use super::splitter;

/// Per-document metadata record file name.
pub const METADATA_FILE: &str = "metadata.json";
/// Informational schema hint at the store root; never validated against.
pub const SCHEMA_FILE: &str = "metadata_schema.json";

const DOC_LOCK_FILE: &str = ".metadata.lock";

/// Id collisions are astronomically unlikely but handled: minting is retried
/// this many times before the collision is surfaced.
const MINT_ATTEMPTS: u32 = 3;

/// Outcome of a bulk ingestion: per-file results, failures isolated.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully ingested files, in processing order.
    pub added: Vec<(String, DocumentId)>,
    /// Files that failed, with the error each one hit.
    pub failures: Vec<(String, StoreError)>,
}

/// Page-splitting document store rooted at one directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    registry: RegistryIndex,
}

impl DocumentStore {
    /// Open (and if needed initialize) a store rooted at `root`: creates the
    /// directory, seeds an empty registry, and writes the schema hint file.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<DocumentStore> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;

        let registry = RegistryIndex::new(&root);
        registry.ensure_exists()?;

        let schema_path = root.join(SCHEMA_FILE);
        if !schema_path.exists() {
            write_json_atomic(&schema_path, &schema_hint())?;
        }

        Ok(DocumentStore { root, registry })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ingest one PDF: mint an id, split pages, build the structural record,
    /// overlay `initial` metadata (caller values win), persist, and register.
    ///
    /// Not idempotent: two calls with the same source produce two documents.
    pub fn add_document(
        &self,
        source: &Path,
        initial: Option<Map<String, Value>>,
    ) -> StoreResult<DocumentId> {
        let original_filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StoreError::InvalidInput(format!("source has no file name: {}", source.display()))
            })?
            .to_owned();

        let (id, doc_dir) = self.mint_with_retry()?;

        // Any failure past minting leaves a directory that was never
        // registered; drop it so directory existence keeps implying document
        // existence.
        match self.ingest_document(id, &doc_dir, source, &original_filename, initial) {
            Ok(record) => {
                tracing::info!(%id, file = %original_filename, pages = record.structural.page_count, "document added");
                Ok(id)
            }
            Err(e) => {
                if fs::remove_dir_all(&doc_dir).is_err() {
                    tracing::warn!(%id, "failed to clean up partial document directory");
                }
                Err(e)
            }
        }
    }

    /// Split, build, persist, and register one document inside an already
    /// minted directory. Every failure here is undone by the caller.
    fn ingest_document(
        &self,
        id: DocumentId,
        doc_dir: &Path,
        source: &Path,
        original_filename: &str,
        initial: Option<Map<String, Value>>,
    ) -> StoreResult<MetadataRecord> {
        let outcome = splitter::split(source, doc_dir)?;

        let page_entries = outcome
            .pages
            .iter()
            .enumerate()
            .map(|(i, path)| (i as u32 + 1, path.clone()))
            .collect();
        let structural = StructuralFields {
            original_filename: original_filename.to_owned(),
            import_date: Utc::now(),
            page_count: outcome.pages.len() as u32,
            file_path: outcome.file_path,
            pages: outcome.pages,
            page_entries,
        };
        let record = MetadataRecord::new(structural, initial)?;

        write_json_atomic(&doc_dir.join(METADATA_FILE), &record)?;
        self.registry.upsert(id, record.structural.registry_entry())?;
        Ok(record)
    }

    /// Bulk ingestion: every PDF directly inside `dir` (non-recursive), in
    /// file-name order. One bad file does not abort the batch; failures are
    /// collected alongside the successes.
    pub fn add_directory(&self, dir: &Path) -> StoreResult<BatchOutcome> {
        let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;

        let mut pdfs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
            })
            .collect();
        pdfs.sort();

        let mut outcome = BatchOutcome::default();
        for pdf in pdfs {
            let name = pdf
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.add_document(&pdf, None) {
                Ok(id) => outcome.added.push((name, id)),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "skipping file in batch ingestion");
                    outcome.failures.push((name, e));
                }
            }
        }
        Ok(outcome)
    }

    /// Shallow-merge `patch` into the document's record (every patch key
    /// overwrites, untouched keys survive), persist it, and re-sync the
    /// registry entry when a structural or `page_<n>` key was touched.
    /// Returns the full merged record.
    pub fn update_metadata(
        &self,
        id: DocumentId,
        patch: &Map<String, Value>,
    ) -> StoreResult<MetadataRecord> {
        let doc_dir = self.document_dir_checked(id)?;

        let _guard = StoreLock::acquire(&doc_dir.join(DOC_LOCK_FILE))?;

        let mut record = self.load_record(id, &doc_dir)?;
        let structural_touched = record.merge(patch)?;
        write_json_atomic(&doc_dir.join(METADATA_FILE), &record)?;

        if structural_touched {
            self.registry.upsert(id, record.structural.registry_entry())?;
        }

        Ok(record)
    }

    /// The full metadata record for one document. Read-only.
    pub fn document_metadata(&self, id: DocumentId) -> StoreResult<MetadataRecord> {
        let doc_dir = self.document_dir_checked(id)?;
        self.load_record(id, &doc_dir)
    }

    /// Registry contents verbatim: every document id mapped to its structural
    /// fields. Never opens per-document records.
    pub fn all_documents(
        &self,
    ) -> StoreResult<std::collections::BTreeMap<DocumentId, Map<String, Value>>> {
        self.registry.load_all()
    }

    /// Absolute path to a document's whole-document PDF.
    pub fn document_path(&self, id: DocumentId) -> PathBuf {
        self.root
            .join(id.dir_name())
            .join(splitter::WHOLE_DOC_FILE)
    }

    /// Absolute path to one page of a document (1-indexed).
    pub fn page_path(&self, id: DocumentId, page: u32) -> PathBuf {
        self.root
            .join(id.dir_name())
            .join(format!("page_{}.pdf", page))
    }

    fn mint_with_retry(&self) -> StoreResult<(DocumentId, PathBuf)> {
        let mut last = None;
        for _ in 0..MINT_ATTEMPTS {
            match id::create_document_directory(&self.root) {
                Err(e @ StoreError::AlreadyExists(_)) => last = Some(e),
                other => return other,
            }
        }
        Err(last.unwrap_or_else(|| StoreError::AlreadyExists(DocumentId::mint())))
    }

    fn document_dir_checked(&self, id: DocumentId) -> StoreResult<PathBuf> {
        let dir = self.root.join(id.dir_name());
        if !dir.is_dir() {
            return Err(StoreError::NotFound(id));
        }
        Ok(dir)
    }

    /// Load the record for a document whose directory is known to exist.
    /// A missing or unparsable record here is an inconsistent store, not a
    /// missing document.
    fn load_record(&self, id: DocumentId, doc_dir: &Path) -> StoreResult<MetadataRecord> {
        let path = doc_dir.join(METADATA_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::inconsistent(id, "metadata record file missing"));
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| StoreError::inconsistent(id, format!("unparsable metadata record: {}", e)))?;
        MetadataRecord::from_value(value).map_err(|e| match e {
            StoreError::InvalidInput(msg) => StoreError::inconsistent(id, msg),
            other => other,
        })
    }
}

/// The informational schema document seeded at the store root. A hint for
/// humans and external tooling; the store never validates against it.
fn schema_hint() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "original_filename": {"type": "string"},
            "import_date": {"type": "string", "format": "date-time"},
            "page_count": {"type": "integer"},
            "file_path": {"type": "string"},
            "pages": {"type": "array", "items": {"type": "string"}},

            // Individual page entries (`page_1`, `page_2`, ...) are added
            // dynamically. Domain fields below are populated later by
            // external collaborators.
            "request_date": {"type": "string"},
            "state_or_tribal_government": {"type": "string"},
            "request_purpose": {"type": "string"},
            "incident_type": {"type": "string"}
        },
        "required": ["original_filename", "import_date", "page_count", "file_path", "pages"]
    })
}
