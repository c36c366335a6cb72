//! Store Consistency Invariant Tests
//!
//! Tests for invariants:
//! - Structural fields in the record match the files physically present
//! - Merge is shallow, last-write-wins, and leaves unmentioned keys alone
//! - The registry indexes exactly the structural fields, never domain keys
//! - Bulk ingestion isolates per-file failures
//!
//! The registry is a partial projection of the per-document records; these
//! tests exercise the re-sync rules that keep it consistent.

use std::fs;

use declstore::store::{DocumentStore, StoreError};
use lopdf::Document;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

mod common;

// =============================================================================
// Test Utilities
// =============================================================================

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

// =============================================================================
// INVARIANT: page files and structural fields agree
// =============================================================================

/// Ingesting a 4-page PDF yields page_count=4, a 4-entry pages list, and a
/// resolvable single-page file per page_<i> key.
#[test]
fn test_ingest_four_page_pdf() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("decl.pdf");
    common::write_sample_pdf(&source, 4);

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let id = store.add_document(&source, None).unwrap();

    let record = store.document_metadata(id).unwrap();
    assert_eq!(record.structural.original_filename, "decl.pdf");
    assert_eq!(record.structural.page_count, 4);
    assert_eq!(record.structural.pages.len(), 4);
    assert!(record.structural.file_path.ends_with("all.pdf"));

    for n in 1..=4u32 {
        let rel = &record.structural.page_entries[&n];
        let abs = store.root().join(rel);
        assert!(abs.is_file(), "page_{} missing on disk", n);
        assert_eq!(abs, store.page_path(id, n));

        let page = Document::load(&abs).unwrap();
        assert_eq!(page.get_pages().len(), 1, "page_{} is not single-page", n);
    }
    assert!(store.document_path(id).is_file());
}

/// Caller-supplied initial metadata overlays the structural base, caller
/// values winning on collision.
#[test]
fn test_initial_metadata_overlay() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("decl.pdf");
    common::write_sample_pdf(&source, 1);

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let initial = as_map(json!({
        "ground_truth": true,
        "original_filename": "corrected-name.pdf",
    }));
    let id = store.add_document(&source, Some(initial)).unwrap();

    let record = store.document_metadata(id).unwrap();
    assert_eq!(record.domain["ground_truth"], json!(true));
    assert_eq!(record.structural.original_filename, "corrected-name.pdf");

    // The overlay was structural, so the registry entry reflects it too.
    let all = store.all_documents().unwrap();
    assert_eq!(all[&id]["original_filename"], json!("corrected-name.pdf"));
}

// =============================================================================
// INVARIANT: merge is shallow last-write-wins
// =============================================================================

/// Applying m1 then m2 equals the structural base merged with m1 then
/// overlaid with m2; later key wins on overlap, unmentioned keys survive.
#[test]
fn test_sequential_merges_compose() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("decl.pdf");
    common::write_sample_pdf(&source, 2);

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let id = store.add_document(&source, None).unwrap();

    let m1 = as_map(json!({"incident_type": "flood", "state_or_tribe": "Oregon"}));
    let m2 = as_map(json!({"state_or_tribe": "California", "request_date": "2025-01-15"}));

    store.update_metadata(id, &m1).unwrap();
    let merged = store.update_metadata(id, &m2).unwrap();

    assert_eq!(merged.domain["incident_type"], json!("flood"));
    assert_eq!(merged.domain["state_or_tribe"], json!("California"));
    assert_eq!(merged.domain["request_date"], json!("2025-01-15"));

    // The returned record matches what a fresh read observes.
    let reread = store.document_metadata(id).unwrap();
    assert_eq!(reread.domain, merged.domain);
    assert_eq!(reread.structural, merged.structural);
}

/// An ill-typed structural patch is rejected and leaves the stored record
/// untouched.
#[test]
fn test_invalid_patch_rejected_without_side_effects() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("decl.pdf");
    common::write_sample_pdf(&source, 1);

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let id = store.add_document(&source, None).unwrap();
    let before = store.document_metadata(id).unwrap();

    let result = store.update_metadata(id, &as_map(json!({"page_count": "four"})));
    assert!(matches!(result, Err(StoreError::InvalidInput(_))));

    let after = store.document_metadata(id).unwrap();
    assert_eq!(after.structural, before.structural);
}

// =============================================================================
// INVARIANT: the registry carries structural fields only
// =============================================================================

/// Updating only a domain key leaves the registry entry byte-identical;
/// the domain key is visible through document_metadata but never through
/// all_documents.
#[test]
fn test_domain_update_leaves_registry_alone() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("decl.pdf");
    common::write_sample_pdf(&source, 4);

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let id = store.add_document(&source, None).unwrap();
    let entry_before = store.all_documents().unwrap()[&id].clone();

    store
        .update_metadata(id, &as_map(json!({"state_or_tribe": "California"})))
        .unwrap();

    let record = store.document_metadata(id).unwrap();
    assert_eq!(record.domain["state_or_tribe"], json!("California"));

    let entry_after = store.all_documents().unwrap()[&id].clone();
    assert_eq!(entry_before, entry_after);
    assert!(entry_after.get("state_or_tribe").is_none());
}

/// Updating a structural key re-syncs the registry entry to match.
#[test]
fn test_structural_update_resyncs_registry() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("decl.pdf");
    common::write_sample_pdf(&source, 2);

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let id = store.add_document(&source, None).unwrap();

    store
        .update_metadata(id, &as_map(json!({"original_filename": "renamed.pdf"})))
        .unwrap();

    let entry = store.all_documents().unwrap()[&id].clone();
    assert_eq!(entry["original_filename"], json!("renamed.pdf"));
}

/// A `page_<n>` patch counts as structural and is re-synced too.
#[test]
fn test_page_key_update_resyncs_registry() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("decl.pdf");
    common::write_sample_pdf(&source, 2);

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let id = store.add_document(&source, None).unwrap();

    let replacement = format!("{}/page_2_rescan.pdf", id);
    store
        .update_metadata(id, &as_map(json!({ "page_2": replacement })))
        .unwrap();

    let entry = store.all_documents().unwrap()[&id].clone();
    assert_eq!(entry["page_2"], json!(replacement));
}

// =============================================================================
// Enumeration and identity
// =============================================================================

/// k successful adds yield exactly k registry entries, each resolvable to a
/// full record, all under distinct ids.
#[test]
fn test_enumeration_after_k_adds() {
    let temp = TempDir::new().unwrap();
    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();

    let mut ids = Vec::new();
    for i in 0..5 {
        let source = temp.path().join(format!("decl_{}.pdf", i));
        common::write_sample_pdf(&source, 1 + i % 3);
        ids.push(store.add_document(&source, None).unwrap());
    }

    let all = store.all_documents().unwrap();
    assert_eq!(all.len(), 5);
    for id in &ids {
        assert!(all.contains_key(id));
        store.document_metadata(*id).unwrap();
    }

    let mut dedup = ids.clone();
    dedup.sort();
    dedup.dedup();
    assert_eq!(dedup.len(), ids.len(), "a document id was reused");
}

/// Adding the same source twice produces two distinct documents.
#[test]
fn test_add_document_not_idempotent() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("decl.pdf");
    common::write_sample_pdf(&source, 1);

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let a = store.add_document(&source, None).unwrap();
    let b = store.add_document(&source, None).unwrap();

    assert_ne!(a, b);
    assert_eq!(store.all_documents().unwrap().len(), 2);
}

/// Ingestion that fails after page splitting (here: ill-typed initial
/// metadata) must not leave an orphan directory holding page files without a
/// metadata record, and must not register the id.
#[test]
fn test_rejected_initial_metadata_leaves_no_directory() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("decl.pdf");
    common::write_sample_pdf(&source, 2);

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let initial = as_map(json!({"page_count": "four"}));

    let result = store.add_document(&source, Some(initial));
    assert!(matches!(result, Err(StoreError::InvalidInput(_))));

    let orphans: Vec<_> = fs::read_dir(store.root())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    assert!(
        orphans.is_empty(),
        "orphan document directory left behind: {:?}",
        orphans.iter().map(|e| e.path()).collect::<Vec<_>>()
    );
    assert!(store.all_documents().unwrap().is_empty());
}

// =============================================================================
// Bulk ingestion isolation
// =============================================================================

/// One bad PDF in a directory does not abort the batch; it lands in the
/// failures list and every good file is ingested.
#[test]
fn test_add_directory_isolates_failures() {
    let temp = TempDir::new().unwrap();
    let inbox = temp.path().join("inbox");
    fs::create_dir(&inbox).unwrap();

    common::write_sample_pdf(&inbox.join("a.pdf"), 1);
    common::write_sample_pdf(&inbox.join("b.pdf"), 2);
    fs::write(inbox.join("broken.pdf"), b"this is not a pdf").unwrap();
    fs::write(inbox.join("notes.txt"), b"ignored, not a pdf").unwrap();

    let store = DocumentStore::open(temp.path().join("declarations")).unwrap();
    let outcome = store.add_directory(&inbox).unwrap();

    assert_eq!(outcome.added.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "broken.pdf");
    assert!(matches!(
        outcome.failures[0].1,
        StoreError::MalformedDocument { .. }
    ));

    let names: Vec<&str> = outcome.added.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    assert_eq!(store.all_documents().unwrap().len(), 2);
}
