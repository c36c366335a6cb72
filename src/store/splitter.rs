//! # Page Splitter
//!
//! Copies a source PDF into a document directory as `all.pdf` and writes one
//! single-page PDF per page (`page_<n>.pdf`, 1-indexed). Unparsable and
//! zero-page sources are rejected with `MalformedDocument`; a record whose
//! page files cannot exist is useless to every downstream consumer.
//!
//! On a mid-way failure the directory may hold partial page files; treating
//! the whole ingestion as failed (and cleaning up) is the caller's concern.

use std::fs;
use std::path::Path;

use lopdf::Document;

use super::errors::{StoreError, StoreResult};

/// Name of the whole-document copy inside a document directory.
pub const WHOLE_DOC_FILE: &str = "all.pdf";

/// Paths produced by a split, relative to the store root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Relative path to the whole-document copy.
    pub file_path: String,
    /// Ordered relative per-page paths, index 0 holding page 1.
    pub pages: Vec<String>,
}

/// Split `source` into `doc_dir`, which must be a direct child of the store
/// root. Writes `page_count + 1` files and returns root-relative paths.
pub fn split(source: &Path, doc_dir: &Path) -> StoreResult<SplitOutcome> {
    let dir_name = doc_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::InvalidInput("document directory has no name".into()))?
        .to_owned();

    let dest = doc_dir.join(WHOLE_DOC_FILE);
    fs::copy(source, &dest).map_err(|e| StoreError::io(source, e))?;

    let document = Document::load(source)
        .map_err(|e| StoreError::malformed(source, format!("not a parsable PDF: {}", e)))?;

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    let total = page_numbers.len() as u32;
    if total == 0 {
        return Err(StoreError::malformed(source, "document has zero pages"));
    }

    let mut pages = Vec::with_capacity(total as usize);
    for n in 1..=total {
        let page_path = doc_dir.join(format!("page_{}.pdf", n));
        write_single_page(&document, n, total, &page_path)?;
        pages.push(format!("{}/page_{}.pdf", dir_name, n));
    }

    tracing::debug!(pages = total, dir = %dir_name, "split source PDF");

    Ok(SplitOutcome {
        file_path: format!("{}/{}", dir_name, WHOLE_DOC_FILE),
        pages,
    })
}

/// Write page `keep` (1-indexed) of `document` as a standalone PDF by
/// deleting every other page from a copy of the parsed document.
fn write_single_page(document: &Document, keep: u32, total: u32, path: &Path) -> StoreResult<()> {
    let mut single = document.clone();
    let delete: Vec<u32> = (1..=total).filter(|&n| n != keep).collect();
    if !delete.is_empty() {
        single.delete_pages(&delete);
    }
    single.prune_objects();
    single.renumber_objects();
    single.compress();
    single
        .save(path)
        .map_err(|e| StoreError::io(path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    Ok(())
}
