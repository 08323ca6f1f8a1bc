//! Markdown rendering of terminal incident reports
//!
//! Turns a [`Report`] into a human-readable document. Rendering is
//! total: a degraded report with missing slots renders its skip
//! markers and fault section instead of failing.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use std::fmt::Write as _;

use ehs_types::{AnalysisOutcome, Report, RunStatus};

/// Renders reports to Markdown
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    /// Omit the audit trail section
    pub skip_audit: bool,
}

impl ReportAssembler {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the whole report
    #[must_use]
    pub fn render(&self, report: &Report) -> String {
        let mut out = String::new();
        let state = &report.state;

        let _ = writeln!(out, "# Incident Report `{}`", report.run_id);
        let _ = writeln!(out);
        let status = match report.status {
            RunStatus::Complete => "Complete",
            RunStatus::Degraded => "Degraded",
        };
        let _ = writeln!(out, "- **Status:** {status}");
        let _ = writeln!(
            out,
            "- **Generated:** {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(out);

        // Incident
        let incident = &state.incident;
        let _ = writeln!(out, "## Incident");
        let _ = writeln!(out);
        let _ = writeln!(out, "**{}**", incident.title);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", incident.description);
        let _ = writeln!(out);
        if state.narrative_synthesized {
            let _ = writeln!(out, "_Narrative synthesized from submission._");
            let _ = writeln!(out);
        }
        if let Some(reporter) = &incident.reported_by {
            let _ = writeln!(out, "- Reported by: {reporter}");
        }
        if let Some(location) = &incident.location {
            let _ = writeln!(out, "- Location: {location}");
        }
        if let Some(time) = &incident.time_of_incident {
            let _ = writeln!(out, "- Time of incident: {time}");
        }
        if let Some(hint) = incident.severity_hint {
            let _ = writeln!(out, "- Reporter severity impression: {hint}");
        }
        for attachment in &incident.attachments {
            let _ = writeln!(out, "- Attachment: {attachment}");
        }
        let _ = writeln!(out);

        self.render_evidence(&mut out, report);
        self.render_stages(&mut out, report);
        self.render_skips_and_fault(&mut out, report);
        if !self.skip_audit {
            self.render_audit(&mut out, report);
        }

        out
    }

    fn render_evidence(&self, out: &mut String, report: &Report) {
        let evidence = &report.state.evidence;
        if evidence.is_empty() {
            return;
        }
        let _ = writeln!(out, "## Evidence");
        let _ = writeln!(out);
        let _ = writeln!(out, "| File | Outcome | Detail |");
        let _ = writeln!(out, "| --- | --- | --- |");
        for record in evidence {
            match &record.outcome {
                AnalysisOutcome::Analyzed(finding) => {
                    let caption = finding.caption.as_deref().unwrap_or("unsupported media");
                    let hazards = if finding.hazards.is_empty() {
                        String::new()
                    } else {
                        let labels: Vec<&str> =
                            finding.hazards.iter().map(|h| h.label.as_str()).collect();
                        format!(" (hazards: {})", labels.join(", "))
                    };
                    let _ = writeln!(
                        out,
                        "| {} | analyzed | {caption}{hazards} |",
                        record.filename
                    );
                }
                AnalysisOutcome::Failed { reason } => {
                    let _ = writeln!(out, "| {} | failed | {reason} |", record.filename);
                }
            }
        }
        let _ = writeln!(out);
    }

    fn render_stages(&self, out: &mut String, report: &Report) {
        let state = &report.state;

        if let Some(intake) = state.intake() {
            let _ = writeln!(out, "## Intake Summary");
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", intake.narrative);
            let _ = writeln!(out);
            let _ = writeln!(out, "- Severity: {}", intake.severity);
            for finding in &intake.key_findings {
                let _ = writeln!(out, "- Finding: {finding}");
            }
            for injury in &intake.injuries_or_illnesses {
                let _ = writeln!(out, "- Injury/illness: {injury}");
            }
            let _ = writeln!(out);
        }

        if let Some(triage) = state.triage() {
            let _ = writeln!(out, "## Triage");
            let _ = writeln!(out);
            let _ = writeln!(out, "- Risk level: {}", triage.risk_level);
            let _ = writeln!(
                out,
                "- Escalation required: {}",
                if triage.escalation_required { "yes" } else { "no" }
            );
            for channel in &triage.escalation_channels {
                let _ = writeln!(out, "- Escalation channel: {channel}");
            }
            for action in &triage.priority_actions {
                let _ = writeln!(out, "- Priority action: {action}");
            }
            let _ = writeln!(out, "- Monitoring: {}", triage.monitoring_plan);
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", triage.rationale);
            let _ = writeln!(out);
        }

        if let Some(root_cause) = state.root_cause() {
            let _ = writeln!(out, "## Root Cause Analysis");
            let _ = writeln!(out);
            for cause in &root_cause.primary_causes {
                let _ = writeln!(out, "- Primary cause: {cause}");
            }
            for factor in &root_cause.contributing_factors {
                let _ = writeln!(out, "- Contributing factor: {factor}");
            }
            for gap in &root_cause.uncertainty_gaps {
                let _ = writeln!(out, "- Open question: {gap}");
            }
            let _ = writeln!(out);
        }

        if let Some(note) = &state.retrieval_note {
            let _ = writeln!(out, "> Policy context unavailable: {note}");
            let _ = writeln!(out);
        }

        if let Some(plan) = state.corrective_actions() {
            let _ = writeln!(out, "## Corrective Actions");
            let _ = writeln!(out);
            for (idx, action) in plan.actions.iter().enumerate() {
                let _ = writeln!(out, "{}. {action}", idx + 1);
            }
            let _ = writeln!(out);
            for party in &plan.responsible_parties {
                let _ = writeln!(out, "- Responsible: {party}");
            }
            for due in &plan.due_dates {
                let _ = writeln!(out, "- Due: {due}");
            }
            if !plan.policy_references.is_empty() {
                let _ = writeln!(out);
                let _ = writeln!(out, "### Policy References");
                let _ = writeln!(out);
                for reference in &plan.policy_references {
                    let _ = writeln!(
                        out,
                        "- **{}** ({}): {}",
                        reference.title, reference.source, reference.excerpt
                    );
                }
            }
            let _ = writeln!(out);
        }

        if let Some(notifications) = state.notifications() {
            let _ = writeln!(out, "## Notifications");
            let _ = writeln!(out);
            for ticket in &notifications.plan.tickets {
                let _ = writeln!(out, "- Ticket ({:?}): {}", ticket.priority, ticket.title);
            }
            for email in &notifications.plan.emails {
                let _ = writeln!(out, "- Email to {}: {}", email.recipient, email.subject);
            }
            match (&notifications.receipts, &notifications.delivery_error) {
                (Some(receipts), _) => {
                    for receipt in &receipts.tickets {
                        let _ = writeln!(out, "- Created: {}", receipt.ticket_id);
                    }
                    for receipt in &receipts.emails {
                        let _ = writeln!(out, "- Sent: {}", receipt.message_id);
                    }
                    if let Some(notes) = &receipts.notes {
                        let _ = writeln!(out, "- Note: {notes}");
                    }
                }
                (None, Some(error)) => {
                    let _ = writeln!(out, "- **Delivery failed:** {error}");
                }
                (None, None) => {}
            }
            let _ = writeln!(out);
        }
    }

    fn render_skips_and_fault(&self, out: &mut String, report: &Report) {
        let state = &report.state;
        if let Some(fault) = &state.fault {
            let _ = writeln!(out, "## Stage Failure");
            let _ = writeln!(out);
            let _ = writeln!(out, "- Stage: {}", fault.stage);
            let _ = writeln!(out, "- Reason: {}", fault.reason);
            if let Some(partial) = &fault.partial {
                let _ = writeln!(out);
                let _ = writeln!(out, "Raw payload returned by the stage:");
                let _ = writeln!(out);
                let _ = writeln!(out, "```json");
                let rendered = serde_json::to_string_pretty(partial)
                    .unwrap_or_else(|_| partial.to_string());
                let _ = writeln!(out, "{rendered}");
                let _ = writeln!(out, "```");
            }
            let _ = writeln!(out);
        }
        for skipped in &state.skipped {
            let _ = writeln!(out, "- {}: {}", skipped.stage, skipped.reason);
        }
        if !state.skipped.is_empty() {
            let _ = writeln!(out);
        }
    }

    fn render_audit(&self, out: &mut String, report: &Report) {
        if report.audit.is_empty() {
            return;
        }
        let _ = writeln!(out, "## Audit Trail");
        let _ = writeln!(out);
        let _ = writeln!(out, "| # | Phase | Detail | Hash |");
        let _ = writeln!(out, "| --- | --- | --- | --- |");
        for event in &report.audit {
            let prefix: String = event.hash.chars().take(12).collect();
            let _ = writeln!(
                out,
                "| {} | {} | {} | `{prefix}` |",
                event.seq, event.phase, event.detail
            );
        }
        let _ = writeln!(out);
    }
}
