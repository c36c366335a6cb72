//! CLI argument definitions using clap
//!
//! Commands:
//! - declstore add <source> --root <dir>
//! - declstore list --root <dir>
//! - declstore update <doc_id> --metadata <json-or-path> --root <dir>
//! - declstore export --output <path> --root <dir>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// declstore - page-splitting document store with a durable metadata registry
#[derive(Parser, Debug)]
#[command(name = "declstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a PDF file, or every PDF directly inside a directory
    Add {
        /// PDF file or directory to add
        source: PathBuf,

        /// Store root directory
        #[arg(long, default_value = "./declarations")]
        root: PathBuf,
    },

    /// List every document in the registry
    List {
        /// Store root directory
        #[arg(long, default_value = "./declarations")]
        root: PathBuf,
    },

    /// Merge a metadata patch into a document's record
    Update {
        /// Document identifier
        doc_id: String,

        /// JSON object, inline or a path to a JSON file
        #[arg(long)]
        metadata: String,

        /// Store root directory
        #[arg(long, default_value = "./declarations")]
        root: PathBuf,
    },

    /// Flatten the store into a single absolute-path dataset file
    Export {
        /// Output file (default: <root name>_dataset.json)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Store root directory
        #[arg(long, default_value = "./declarations")]
        root: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
