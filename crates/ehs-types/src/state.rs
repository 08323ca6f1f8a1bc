//! Workflow state and terminal report
//!
//! `WorkflowState` is the single record threaded through the stages.
//! Slots accumulate monotonically: each stage adds its own slot and
//! never rewrites one written earlier. The `record_*` methods uphold
//! that invariant by refusing a second write.

use crate::evidence::EvidenceRecord;
use crate::id::RunId;
use crate::incident::IncidentRecord;
use crate::outcome::StageFailure;
use crate::stages::{
    CorrectiveActionPlan, IntakeSummary, NotificationOutcome, RootCauseAnalysis, StageKind,
    TriageAssessment,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The stage that halted progression and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFault {
    /// The failing stage
    pub stage: StageKind,
    /// Failure reason
    pub reason: StageFailure,
    /// Raw engine payload, when one was returned
    #[serde(default)]
    pub partial: Option<serde_json::Value>,
}

/// A stage that never ran because an upstream stage failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedStage {
    /// The skipped stage
    pub stage: StageKind,
    /// Why it was skipped
    pub reason: String,
}

/// Slot-rewrite attempts are programming errors surfaced explicitly
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("slot {0} already filled")]
pub struct SlotAlreadyFilled(pub StageKind);

/// Accumulating state for one incident run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Normalized incident record the stages consumed
    pub incident: IncidentRecord,
    /// Whether the incident record was synthesized (no structured details)
    pub narrative_synthesized: bool,
    /// Per-file evidence outcomes, in upload order
    pub evidence: Vec<EvidenceRecord>,
    /// Note recorded when policy retrieval failed and degraded to empty
    #[serde(default)]
    pub retrieval_note: Option<String>,
    intake: Option<IntakeSummary>,
    triage: Option<TriageAssessment>,
    root_cause: Option<RootCauseAnalysis>,
    corrective_actions: Option<CorrectiveActionPlan>,
    notifications: Option<NotificationOutcome>,
    /// First failing stage, when the run degraded
    #[serde(default)]
    pub fault: Option<StageFault>,
    /// Stages that never ran, in pipeline order
    #[serde(default)]
    pub skipped: Vec<SkippedStage>,
}

impl WorkflowState {
    /// Fresh state for a run over the given incident record
    #[must_use]
    pub fn new(incident: IncidentRecord, narrative_synthesized: bool) -> Self {
        Self {
            incident,
            narrative_synthesized,
            evidence: Vec::new(),
            retrieval_note: None,
            intake: None,
            triage: None,
            root_cause: None,
            corrective_actions: None,
            notifications: None,
            fault: None,
            skipped: Vec::new(),
        }
    }

    /// Intake slot
    #[inline]
    #[must_use]
    pub fn intake(&self) -> Option<&IntakeSummary> {
        self.intake.as_ref()
    }

    /// Triage slot
    #[inline]
    #[must_use]
    pub fn triage(&self) -> Option<&TriageAssessment> {
        self.triage.as_ref()
    }

    /// Root-cause slot
    #[inline]
    #[must_use]
    pub fn root_cause(&self) -> Option<&RootCauseAnalysis> {
        self.root_cause.as_ref()
    }

    /// Corrective-action slot
    #[inline]
    #[must_use]
    pub fn corrective_actions(&self) -> Option<&CorrectiveActionPlan> {
        self.corrective_actions.as_ref()
    }

    /// Notification slot
    #[inline]
    #[must_use]
    pub fn notifications(&self) -> Option<&NotificationOutcome> {
        self.notifications.as_ref()
    }

    /// Record the intake slot
    ///
    /// # Errors
    /// `SlotAlreadyFilled` if the slot was written before.
    pub fn record_intake(&mut self, summary: IntakeSummary) -> Result<(), SlotAlreadyFilled> {
        if self.intake.is_some() {
            return Err(SlotAlreadyFilled(StageKind::Intake));
        }
        self.intake = Some(summary);
        Ok(())
    }

    /// Record the triage slot
    ///
    /// # Errors
    /// `SlotAlreadyFilled` if the slot was written before.
    pub fn record_triage(&mut self, triage: TriageAssessment) -> Result<(), SlotAlreadyFilled> {
        if self.triage.is_some() {
            return Err(SlotAlreadyFilled(StageKind::Triage));
        }
        self.triage = Some(triage);
        Ok(())
    }

    /// Record the root-cause slot
    ///
    /// # Errors
    /// `SlotAlreadyFilled` if the slot was written before.
    pub fn record_root_cause(
        &mut self,
        analysis: RootCauseAnalysis,
    ) -> Result<(), SlotAlreadyFilled> {
        if self.root_cause.is_some() {
            return Err(SlotAlreadyFilled(StageKind::RootCause));
        }
        self.root_cause = Some(analysis);
        Ok(())
    }

    /// Record the corrective-action slot
    ///
    /// # Errors
    /// `SlotAlreadyFilled` if the slot was written before.
    pub fn record_corrective_actions(
        &mut self,
        plan: CorrectiveActionPlan,
    ) -> Result<(), SlotAlreadyFilled> {
        if self.corrective_actions.is_some() {
            return Err(SlotAlreadyFilled(StageKind::CorrectiveAction));
        }
        self.corrective_actions = Some(plan);
        Ok(())
    }

    /// Record the notification slot
    ///
    /// # Errors
    /// `SlotAlreadyFilled` if the slot was written before.
    pub fn record_notifications(
        &mut self,
        outcome: NotificationOutcome,
    ) -> Result<(), SlotAlreadyFilled> {
        if self.notifications.is_some() {
            return Err(SlotAlreadyFilled(StageKind::Notification));
        }
        self.notifications = Some(outcome);
        Ok(())
    }

    /// Record the first failing stage and mark everything downstream skipped
    pub fn record_fault(
        &mut self,
        stage: StageKind,
        reason: StageFailure,
        partial: Option<serde_json::Value>,
    ) {
        for downstream in stage.downstream() {
            self.skipped.push(SkippedStage {
                stage: downstream,
                reason: "skipped: upstream failure".to_string(),
            });
        }
        self.fault = Some(StageFault {
            stage,
            reason,
            partial,
        });
    }

    /// Stages whose slot is filled, in pipeline order
    #[must_use]
    pub fn filled_slots(&self) -> Vec<StageKind> {
        let mut filled = Vec::new();
        if self.intake.is_some() {
            filled.push(StageKind::Intake);
        }
        if self.triage.is_some() {
            filled.push(StageKind::Triage);
        }
        if self.root_cause.is_some() {
            filled.push(StageKind::RootCause);
        }
        if self.corrective_actions.is_some() {
            filled.push(StageKind::CorrectiveAction);
        }
        if self.notifications.is_some() {
            filled.push(StageKind::Notification);
        }
        filled
    }
}

/// Terminal run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All five stages produced their slot
    Complete,
    /// A stage failed or delivery degraded; the report is partial but usable
    Degraded,
}

/// One entry in the hash-chained run audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the chain, starting at 0
    pub seq: u64,
    /// When the event was appended
    pub timestamp: DateTime<Utc>,
    /// Phase the orchestrator was in
    pub phase: String,
    /// Event detail
    pub detail: String,
    /// Hex hash of the previous event (all zeroes for the first)
    pub prev_hash: String,
    /// Hex hash of this event
    pub hash: String,
}

/// Terminal artifact for one run; created once, never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run identifier, correlates the artifact to stored evidence
    pub run_id: RunId,
    /// Complete or degraded
    pub status: RunStatus,
    /// Full accumulated state
    pub state: WorkflowState,
    /// Hash-chained trail of phase transitions and outcomes
    pub audit: Vec<AuditEvent>,
    /// When the report was assembled
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Whether every stage slot is present
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }
}
