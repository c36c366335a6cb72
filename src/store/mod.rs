//! # Document Store Module
//!
//! Identity, on-disk layout, page splitting, metadata persistence, and
//! registry consistency for ingested PDF documents.

pub mod errors;
pub mod id;
pub mod lock;
pub mod record;
pub mod registry;
pub mod splitter;
#[allow(clippy::module_inception)]
pub mod store;

pub use errors::{StoreError, StoreResult};
pub use id::DocumentId;
pub use lock::StoreLock;
pub use record::{MetadataRecord, StructuralFields};
pub use registry::RegistryIndex;
pub use splitter::SplitOutcome;
pub use store::{BatchOutcome, DocumentStore};
