//! Evidence analysis results
//!
//! One `EvidenceRecord` per uploaded file, immutable once produced and
//! owned exclusively by the run that created it.

use crate::id::FileId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One detected hazard in an evidence file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HazardDetection {
    /// Hazard label (e.g. "missing PPE", "blocked exit")
    pub label: String,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
}

impl HazardDetection {
    /// Create a detection, clamping confidence into [0, 1]
    #[inline]
    #[must_use]
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Structured finding for one analyzed evidence file
///
/// Unsupported media degrades to an empty hazard list with no caption
/// rather than a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceFinding {
    /// Detected hazards
    pub hazards: Vec<HazardDetection>,
    /// Free-text caption, absent for unsupported media
    #[serde(default)]
    pub caption: Option<String>,
}

impl EvidenceFinding {
    /// Finding for media the analyzer cannot interpret
    #[inline]
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            hazards: Vec::new(),
            caption: None,
        }
    }
}

/// Terminal per-file outcome after the fan-out join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Analysis produced a finding
    Analyzed(EvidenceFinding),
    /// Analysis failed; the run continues without this file
    Failed {
        /// Why the analysis failed
        reason: String,
    },
}

impl AnalysisOutcome {
    /// Finding, if the analysis succeeded
    #[inline]
    #[must_use]
    pub fn finding(&self) -> Option<&EvidenceFinding> {
        match self {
            AnalysisOutcome::Analyzed(f) => Some(f),
            AnalysisOutcome::Failed { .. } => None,
        }
    }

    /// Whether analysis succeeded
    #[inline]
    #[must_use]
    pub fn is_analyzed(&self) -> bool {
        matches!(self, AnalysisOutcome::Analyzed(_))
    }
}

/// Per-file record carried into the terminal report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// File identifier
    pub file_id: FileId,
    /// Original filename
    pub filename: String,
    /// Analysis outcome
    pub outcome: AnalysisOutcome,
}

impl EvidenceRecord {
    /// Record for a successful analysis
    #[inline]
    #[must_use]
    pub fn analyzed(file_id: FileId, filename: impl Into<String>, finding: EvidenceFinding) -> Self {
        Self {
            file_id,
            filename: filename.into(),
            outcome: AnalysisOutcome::Analyzed(finding),
        }
    }

    /// Record for a failed analysis
    #[inline]
    #[must_use]
    pub fn failed(file_id: FileId, filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file_id,
            filename: filename.into(),
            outcome: AnalysisOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    /// Caption of a successful analysis, if any
    #[inline]
    #[must_use]
    pub fn caption(&self) -> Option<&str> {
        self.outcome
            .finding()
            .and_then(|f| f.caption.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hazard_confidence_is_clamped() {
        assert_eq!(HazardDetection::new("spill", 1.4).confidence, 1.0);
        assert_eq!(HazardDetection::new("spill", -0.2).confidence, 0.0);
    }

    #[test]
    fn unsupported_finding_is_empty() {
        let finding = EvidenceFinding::unsupported();
        assert!(finding.hazards.is_empty());
        assert!(finding.caption.is_none());
    }

    #[test]
    fn failed_record_has_no_caption() {
        let record = EvidenceRecord::failed(FileId::new(), "a.bin", "timeout");
        assert!(record.caption().is_none());
        assert!(!record.outcome.is_analyzed());
    }
}
