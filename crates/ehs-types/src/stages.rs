//! Typed per-stage contracts
//!
//! Every stage consumes a schema-checked input and produces a
//! schema-checked output. The input of stage N+1 is built only from
//! slots prior stages guarantee to have filled.

use crate::incident::{IncidentRecord, Severity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The five reasoning stages, in pipeline order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Summarize the report into an intake summary
    Intake,
    /// Determine urgency and containment
    Triage,
    /// Infer root causes
    RootCause,
    /// Draft a policy-aligned corrective action plan
    CorrectiveAction,
    /// Draft stakeholder notifications
    Notification,
}

impl StageKind {
    /// All stages in pipeline order
    #[inline]
    #[must_use]
    pub const fn all() -> [StageKind; 5] {
        [
            StageKind::Intake,
            StageKind::Triage,
            StageKind::RootCause,
            StageKind::CorrectiveAction,
            StageKind::Notification,
        ]
    }

    /// Canonical snake_case name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Intake => "intake",
            StageKind::Triage => "triage",
            StageKind::RootCause => "root_cause",
            StageKind::CorrectiveAction => "corrective_action",
            StageKind::Notification => "notification",
        }
    }

    /// Stages strictly after this one, in order
    #[must_use]
    pub fn downstream(&self) -> Vec<StageKind> {
        StageKind::all()
            .into_iter()
            .filter(|s| s > self)
            .collect()
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retrieved policy snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicySnippet {
    /// Corpus document id
    pub id: String,
    /// Snippet text
    pub text: String,
    /// Relevance score, higher is more relevant
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Stage outputs
// ---------------------------------------------------------------------------

/// Intake stage output: structured summary of the raw report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntakeSummary {
    /// Narrative restatement of the incident
    pub narrative: String,
    /// Key findings worth downstream attention
    pub key_findings: Vec<String>,
    /// Injuries or illnesses mentioned or implied
    pub injuries_or_illnesses: Vec<String>,
    /// Assigned severity
    pub severity: Severity,
}

/// Triage stage output: urgency and immediate containment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TriageAssessment {
    /// Assessed risk level
    pub risk_level: Severity,
    /// Immediate actions to take
    pub priority_actions: Vec<String>,
    /// Whether escalation beyond the local team is required
    pub escalation_required: bool,
    /// Channels to escalate through when required
    #[serde(default)]
    pub escalation_channels: Vec<String>,
    /// Plan for monitoring the situation
    pub monitoring_plan: String,
    /// Why this assessment was reached
    pub rationale: String,
}

/// Root-cause stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RootCauseAnalysis {
    /// Most plausible primary causes
    pub primary_causes: Vec<String>,
    /// Contributing factors
    #[serde(default)]
    pub contributing_factors: Vec<String>,
    /// Gaps needing further investigation
    #[serde(default)]
    pub uncertainty_gaps: Vec<String>,
}

/// Citation of a policy backing a corrective action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyReference {
    /// Policy title or tag
    pub title: String,
    /// Cited excerpt
    pub excerpt: String,
    /// Where the policy came from
    pub source: String,
}

/// Corrective-action stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CorrectiveActionPlan {
    /// Ordered corrective actions
    pub actions: Vec<String>,
    /// Who owns each action
    pub responsible_parties: Vec<String>,
    /// Target due dates, free text
    pub due_dates: Vec<String>,
    /// Policies the plan is aligned with; empty when retrieval found none
    #[serde(default)]
    pub policy_references: Vec<PolicyReference>,
}

/// Ticket priority for downstream ticketing systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    /// Routine follow-up
    Low,
    /// Normal queue
    Medium,
    /// Expedited
    High,
    /// Immediate attention
    Urgent,
}

/// A ticket to open in a downstream system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TicketRequest {
    /// Ticket title
    pub title: String,
    /// Ticket body
    pub description: String,
    /// Ticket priority
    pub priority: TicketPriority,
}

/// An outbound notification email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmailRequest {
    /// Recipient address
    pub recipient: String,
    /// Subject line
    pub subject: String,
    /// Email body
    pub body: String,
}

/// Notification stage output: the delivery plan
///
/// Only the plan is produced by the stage; executing it is the delivery
/// collaborator's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationPlan {
    /// Tickets to open
    #[serde(default)]
    pub tickets: Vec<TicketRequest>,
    /// Emails to send
    #[serde(default)]
    pub emails: Vec<EmailRequest>,
}

/// Receipt for one created ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketReceipt {
    /// Ticket id assigned by the delivery collaborator
    pub ticket_id: String,
    /// The original request
    pub request: TicketRequest,
}

/// Receipt for one dispatched email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailReceipt {
    /// Message id assigned by the delivery collaborator
    pub message_id: String,
    /// The original request
    pub request: EmailRequest,
}

/// Receipts produced by executing a notification plan
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotificationReceipts {
    /// Ticket receipts
    pub tickets: Vec<TicketReceipt>,
    /// Email receipts
    pub emails: Vec<EmailReceipt>,
    /// Collaborator notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Terminal notification slot: the plan plus what delivery did with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationOutcome {
    /// The plan the stage produced
    pub plan: NotificationPlan,
    /// Receipts, when delivery succeeded
    #[serde(default)]
    pub receipts: Option<NotificationReceipts>,
    /// Delivery failure, recorded only, never fatal
    #[serde(default)]
    pub delivery_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Stage inputs
// ---------------------------------------------------------------------------

/// Intake stage input
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IntakeInput {
    /// Normalized incident record
    pub incident: IncidentRecord,
}

/// Triage stage input
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TriageInput {
    /// Normalized incident record
    pub incident: IncidentRecord,
    /// Intake stage output
    pub intake: IntakeSummary,
}

/// Root-cause stage input
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RootCauseInput {
    /// Normalized incident record
    pub incident: IncidentRecord,
    /// Intake stage output
    pub intake: IntakeSummary,
    /// Triage stage output
    pub triage: TriageAssessment,
}

/// Corrective-action stage input; `policies` may be empty
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CorrectiveActionInput {
    /// Normalized incident record
    pub incident: IncidentRecord,
    /// Intake stage output
    pub intake: IntakeSummary,
    /// Triage stage output
    pub triage: TriageAssessment,
    /// Root-cause stage output
    pub root_cause: RootCauseAnalysis,
    /// Retrieved policy context, possibly empty
    #[serde(default)]
    pub policies: Vec<PolicySnippet>,
}

/// Notification stage input
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationInput {
    /// Normalized incident record
    pub incident: IncidentRecord,
    /// Intake stage output
    pub intake: IntakeSummary,
    /// Triage stage output
    pub triage: TriageAssessment,
    /// Corrective-action stage output
    pub corrective_actions: CorrectiveActionPlan,
}
