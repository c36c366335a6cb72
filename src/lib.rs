//! declstore - page-splitting document store with a durable metadata registry
//!
//! Ingests multi-page PDF documents, stores each one under a stable opaque
//! identifier, and maintains a store-wide registry of structural metadata so
//! downstream tooling can enumerate documents without opening every record.

pub mod cli;
pub mod materialize;
pub mod store;
