//! EHS Evidence - Per-file analysis and storage
//!
//! Three concerns:
//! - The analyzer seam, one stateless invocation per uploaded file
//! - A per-run filesystem store for raw blobs (sanitized names,
//!   containment-checked retrieval, size cap)
//! - The concurrent fan-out with its join barrier, the only point in a
//!   run where work genuinely runs in parallel

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analyzer;
pub mod fanout;
pub mod store;

// Re-exports for convenience
pub use analyzer::{AnalysisError, EvidenceAnalyzer};
pub use fanout::{analyse_all, FanOutCancelled, FanOutOptions};
pub use store::{sanitize_filename, EvidenceStore, StoreError, StoredEvidence, DEFAULT_MAX_BYTES};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
