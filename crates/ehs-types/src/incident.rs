//! Incident input and the normalized record stages consume
//!
//! Three input shapes are accepted: structured details, a freeform
//! message, or evidence files alone. At least one must be present;
//! `IncidentInput::validate` enforces that before any stage runs.

use crate::id::FileId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Severity classification used across intake and triage
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor incident, no escalation expected
    Low,
    /// Moderate incident
    Medium,
    /// Serious incident requiring prompt action
    High,
    /// Life-threatening or site-wide incident
    Critical,
}

impl Severity {
    /// Canonical lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured incident details supplied by the reporter
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IncidentDetails {
    /// Short incident title
    pub title: String,
    /// Full description of what happened
    pub description: String,
    /// Who reported the incident
    #[serde(default)]
    pub reported_by: Option<String>,
    /// Initial severity impression from the reporter
    #[serde(default)]
    pub severity_hint: Option<Severity>,
    /// Where the incident occurred
    #[serde(default)]
    pub location: Option<String>,
    /// When the incident occurred (reporter-supplied, free text)
    #[serde(default)]
    pub time_of_incident: Option<String>,
    /// People involved
    #[serde(default)]
    pub individuals_involved: Vec<String>,
}

impl IncidentDetails {
    /// Create details with the two required fields
    #[inline]
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            reported_by: None,
            severity_hint: None,
            location: None,
            time_of_incident: None,
            individuals_involved: Vec::new(),
        }
    }

    /// With severity hint
    #[inline]
    #[must_use]
    pub fn with_severity_hint(mut self, severity: Severity) -> Self {
        self.severity_hint = Some(severity);
        self
    }

    /// With location
    #[inline]
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// With reporter
    #[inline]
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl Into<String>) -> Self {
        self.reported_by = Some(reporter.into());
        self
    }
}

/// One uploaded evidence file: raw blob plus declared media type
#[derive(Debug, Clone)]
pub struct EvidenceFile {
    /// File identifier
    pub id: FileId,
    /// Original filename as uploaded
    pub filename: String,
    /// Declared media type (never trusted for parsing decisions)
    pub media_type: String,
    /// Raw content
    pub bytes: Vec<u8>,
}

impl EvidenceFile {
    /// Create a new evidence file
    #[inline]
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            id: FileId::new(),
            filename: filename.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// Raw submission for one incident run
#[derive(Debug, Clone, Default)]
pub struct IncidentInput {
    /// Optional structured details
    pub details: Option<IncidentDetails>,
    /// Optional freeform message
    pub message: Option<String>,
    /// Zero or more evidence files
    pub evidence: Vec<EvidenceFile>,
}

/// Input invariant violations
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    /// None of details, message, or evidence was supplied
    #[error("provide an incident payload, message, or evidence")]
    Empty,
}

impl IncidentInput {
    /// Input from structured details
    #[inline]
    #[must_use]
    pub fn from_details(details: IncidentDetails) -> Self {
        Self {
            details: Some(details),
            message: None,
            evidence: Vec::new(),
        }
    }

    /// Input from a freeform message
    #[inline]
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            details: None,
            message: Some(message.into()),
            evidence: Vec::new(),
        }
    }

    /// With evidence files
    #[inline]
    #[must_use]
    pub fn with_evidence(mut self, evidence: Vec<EvidenceFile>) -> Self {
        self.evidence = evidence;
        self
    }

    /// Enforce the input invariant: at least one of details, message,
    /// or evidence must be present.
    ///
    /// # Errors
    /// `InputError::Empty` if all three are absent (a blank message
    /// counts as absent).
    pub fn validate(&self) -> Result<(), InputError> {
        let has_message = self
            .message
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty());
        if self.details.is_none() && !has_message && self.evidence.is_empty() {
            return Err(InputError::Empty);
        }
        Ok(())
    }
}

/// Synthesized title/description used when no structured details exist
///
/// Derived from the freeform message plus captions of successfully
/// analyzed evidence. Failed analyses contribute nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeSeed {
    /// Synthesized title (first message line, truncated)
    pub title: String,
    /// Synthesized description
    pub description: String,
}

/// Fallback description for evidence-only submissions
pub const EVIDENCE_ONLY_NARRATIVE: &str = "Evidence submitted without accompanying narrative.";

const MAX_SEED_TITLE: usize = 80;

impl NarrativeSeed {
    /// Synthesize a seed from an optional message and evidence captions
    #[must_use]
    pub fn synthesize(message: Option<&str>, captions: &[String]) -> Self {
        let message = message.map(str::trim).filter(|m| !m.is_empty());
        let base = message.unwrap_or(EVIDENCE_ONLY_NARRATIVE);

        let title: String = base
            .lines()
            .next()
            .unwrap_or(base)
            .chars()
            .take(MAX_SEED_TITLE)
            .collect();

        let mut description = base.to_string();
        if !captions.is_empty() {
            description.push_str("\n\nEvidence Insights:\n");
            description.push_str(&captions.join("\n"));
        }

        Self { title, description }
    }
}

/// Normalized record the stages actually consume
///
/// Built either from structured details or from a `NarrativeSeed`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IncidentRecord {
    /// Incident title
    pub title: String,
    /// Incident description (evidence insights appended when present)
    pub description: String,
    /// Reporter, when known
    #[serde(default)]
    pub reported_by: Option<String>,
    /// Reporter's severity impression
    #[serde(default)]
    pub severity_hint: Option<Severity>,
    /// Location, when known
    #[serde(default)]
    pub location: Option<String>,
    /// Time of incident, when known
    #[serde(default)]
    pub time_of_incident: Option<String>,
    /// People involved
    #[serde(default)]
    pub individuals_involved: Vec<String>,
    /// References to stored evidence files
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl IncidentRecord {
    /// Build from structured details
    #[must_use]
    pub fn from_details(details: IncidentDetails) -> Self {
        Self {
            title: details.title,
            description: details.description,
            reported_by: details.reported_by,
            severity_hint: details.severity_hint,
            location: details.location,
            time_of_incident: details.time_of_incident,
            individuals_involved: details.individuals_involved,
            attachments: Vec::new(),
        }
    }

    /// Build from a synthesized narrative seed
    #[must_use]
    pub fn from_seed(seed: NarrativeSeed) -> Self {
        Self {
            title: seed.title,
            description: seed.description,
            reported_by: None,
            severity_hint: None,
            location: None,
            time_of_incident: None,
            individuals_involved: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Append evidence insight captions to the description
    pub fn append_evidence_insights(&mut self, captions: &[String]) {
        if captions.is_empty() {
            return;
        }
        self.description = format!(
            "{}\n\nEvidence Insights:\n{}",
            self.description.trim_end(),
            captions.join("\n")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_input_is_invalid() {
        let input = IncidentInput::default();
        assert_eq!(input.validate(), Err(InputError::Empty));
    }

    #[test]
    fn blank_message_is_invalid() {
        let input = IncidentInput::from_message("   \n ");
        assert_eq!(input.validate(), Err(InputError::Empty));
    }

    #[test]
    fn evidence_only_is_valid() {
        let input = IncidentInput::default()
            .with_evidence(vec![EvidenceFile::new("a.jpg", "image/jpeg", vec![1, 2])]);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn seed_title_is_first_line_truncated() {
        let message = format!("{}\nsecond line", "x".repeat(100));
        let seed = NarrativeSeed::synthesize(Some(&message), &[]);
        assert_eq!(seed.title.len(), 80);
        assert!(!seed.title.contains("second"));
    }

    #[test]
    fn seed_falls_back_for_evidence_only() {
        let captions = vec!["forklift near pallet stack".to_string()];
        let seed = NarrativeSeed::synthesize(None, &captions);
        assert!(seed.description.starts_with(EVIDENCE_ONLY_NARRATIVE));
        assert!(seed.description.contains("forklift"));
    }

    #[test]
    fn seed_includes_message_and_captions() {
        let seed = NarrativeSeed::synthesize(
            Some("Spill near dock 4"),
            &["liquid on floor".to_string(), "missing signage".to_string()],
        );
        assert_eq!(seed.title, "Spill near dock 4");
        assert!(seed.description.contains("Evidence Insights:"));
        assert!(seed.description.contains("missing signage"));
    }

    #[test]
    fn record_from_details_keeps_fields() {
        let details = IncidentDetails::new("Fall", "Worker fell from ladder")
            .with_severity_hint(Severity::High)
            .with_location("Warehouse B");
        let record = IncidentRecord::from_details(details);
        assert_eq!(record.severity_hint, Some(Severity::High));
        assert_eq!(record.location.as_deref(), Some("Warehouse B"));
    }

    #[test]
    fn severity_round_trips_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let back: Severity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Severity::Critical);
    }
}
