//! Evidence analyzer seam
//!
//! One invocation per uploaded file, stateless, safe to run
//! concurrently across files.

use ehs_types::{EvidenceFile, EvidenceFinding};

/// Analyzer errors
///
/// Unsupported media is NOT an error: the contract requires degrading to
/// `EvidenceFinding::unsupported()` so a single odd file never aborts
/// the run. Errors here are genuine failures (backend down, unreadable
/// blob) and are recorded per file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    /// The analysis backend errored
    #[error("analysis backend failed: {0}")]
    Backend(String),

    /// The blob could not be read
    #[error("unreadable evidence: {0}")]
    Unreadable(String),
}

/// Per-file evidence analysis boundary
#[async_trait::async_trait]
pub trait EvidenceAnalyzer: Send + Sync {
    /// Analyse one file blob into a structured finding
    ///
    /// # Contract
    /// - Must not error for unsupported media types; return
    ///   `EvidenceFinding::unsupported()` instead.
    /// - Must be deterministic for a deterministic backend: same blob,
    ///   same finding.
    ///
    /// # Errors
    /// `AnalysisError` for genuine failures only.
    async fn analyse(&self, file: &EvidenceFile) -> Result<EvidenceFinding, AnalysisError>;
}
