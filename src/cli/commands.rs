//! CLI command implementations
//!
//! Each command is backed 1:1 by a document store façade operation; commands
//! parse input, call the store, and print the outcome.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::materialize;
use crate::store::{DocumentId, DocumentStore};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Dispatch a parsed command line.
pub fn run_command(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Add { source, root } => add(&source, &root),
        Command::List { root } => list(&root),
        Command::Update {
            doc_id,
            metadata,
            root,
        } => update(&doc_id, &metadata, &root),
        Command::Export { output, root } => export(output.as_deref(), &root),
    }
}

fn add(source: &Path, root: &Path) -> CliResult<()> {
    let store = DocumentStore::open(root)?;

    if source.is_file() {
        let id = store.add_document(source, None)?;
        println!(
            "Added {} -> UUID: {}",
            source.file_name().and_then(|n| n.to_str()).unwrap_or("?"),
            id
        );
        Ok(())
    } else if source.is_dir() {
        let outcome = store.add_directory(source)?;
        println!("Added {} PDF files", outcome.added.len());
        for (filename, id) in &outcome.added {
            println!("  {} -> {}", filename, id);
        }
        if !outcome.failures.is_empty() {
            eprintln!("Failed {} PDF files", outcome.failures.len());
            for (filename, error) in &outcome.failures {
                eprintln!("  {}: {}", filename, error);
            }
            return Err(CliError::BatchFailures {
                failed: outcome.failures.len(),
                total: outcome.added.len() + outcome.failures.len(),
            });
        }
        Ok(())
    } else {
        Err(CliError::Usage(format!(
            "{} is not a PDF file or directory",
            source.display()
        )))
    }
}

fn list(root: &Path) -> CliResult<()> {
    let store = DocumentStore::open(root)?;
    let documents = store.all_documents()?;

    println!("Found {} documents:", documents.len());
    for (id, info) in &documents {
        let filename = info
            .get("original_filename")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        let pages = info.get("page_count").and_then(|v| v.as_u64()).unwrap_or(0);
        println!("  {}: {} ({} pages)", id, filename, pages);
    }
    Ok(())
}

fn update(doc_id: &str, metadata: &str, root: &Path) -> CliResult<()> {
    let id: DocumentId = doc_id.parse()?;
    let patch = parse_metadata_arg(metadata)?;

    let store = DocumentStore::open(root)?;
    store.update_metadata(id, &patch)?;
    println!("Updated metadata for document {}", id);
    Ok(())
}

fn export(output: Option<&Path>, root: &Path) -> CliResult<()> {
    let count = materialize::materialize(root, output)?;
    println!("Materialized dataset with {} documents", count);
    Ok(())
}

/// The `--metadata` argument is either an inline JSON object or a path to a
/// JSON file holding one.
fn parse_metadata_arg(arg: &str) -> CliResult<Map<String, Value>> {
    let raw = if Path::new(arg).is_file() {
        fs::read_to_string(arg)?
    } else {
        arg.to_owned()
    };

    let value: Value =
        serde_json::from_str(&raw).map_err(|e| CliError::InvalidMetadata(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CliError::InvalidMetadata(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}
