//! Schema front-end for subsumption checking.
//!
//! This crate prepares raw JSON Schema documents for compilation: it collects
//! `$defs`/`definitions` into a registry, detects reference cycles over the
//! `$ref` graph, fully inlines acyclic references, classifies keywords into
//! supported assertions vs. ignorable annotations, and extracts the finite
//! key universe shared by both sides of a check.

pub mod dialect;
pub mod errors;
pub mod registry;
pub mod unfold;
pub mod universe;

pub use errors::ResolveError;
pub use registry::SchemaRegistry;
pub use unfold::unfold;
pub use universe::KeyUniverse;
