//! EHS Types - Data model for the incident workflow
//!
//! Defines the fundamental types for the pipeline:
//! - Run and file identifiers
//! - Incident input, its invariant, and the normalized record
//! - Per-file evidence findings and records
//! - Typed per-stage contracts (schema-checked at the executor boundary)
//! - Tagged stage outcomes with the failure taxonomy
//! - Accumulating workflow state and the terminal report

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod evidence;
pub mod id;
pub mod incident;
pub mod outcome;
pub mod stages;
pub mod state;

// Re-exports for convenience
pub use evidence::{AnalysisOutcome, EvidenceFinding, EvidenceRecord, HazardDetection};
pub use id::{FileId, RunId};
pub use incident::{
    EvidenceFile, IncidentDetails, IncidentInput, IncidentRecord, InputError, NarrativeSeed,
    Severity, EVIDENCE_ONLY_NARRATIVE,
};
pub use outcome::{StageFailure, StageOutcome};
pub use stages::{
    CorrectiveActionInput, CorrectiveActionPlan, EmailReceipt, EmailRequest, IntakeInput,
    IntakeSummary, NotificationInput, NotificationOutcome, NotificationPlan,
    NotificationReceipts, PolicyReference, PolicySnippet, RootCauseAnalysis, RootCauseInput,
    StageKind, TicketPriority, TicketReceipt, TicketRequest, TriageAssessment, TriageInput,
};
pub use state::{
    AuditEvent, Report, RunStatus, SkippedStage, SlotAlreadyFilled, StageFault, WorkflowState,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the incident workflow model
    pub use crate::{
        EvidenceFile, EvidenceRecord, IncidentDetails, IncidentInput, IncidentRecord, Report,
        RunId, RunStatus, Severity, StageFailure, StageKind, StageOutcome, WorkflowState,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
