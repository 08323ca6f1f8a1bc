//! EHS Policy - Safety-policy corpus and retrieval
//!
//! The corpus is process-wide, read-only, loaded once at startup, and
//! shared by reference across concurrent runs. Retrieval is the
//! `search(query, k)` seam the corrective-action stage is gated on.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod retriever;
pub mod store;

// Re-exports for convenience
pub use retriever::{PolicyRetriever, RetrievalError};
pub use store::{seed_documents, PolicyDocument, PolicyStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
