//! Workflow orchestrator
//!
//! Drives one incident run through the fixed sequence: evidence
//! fan-out, intake, triage, root cause, policy retrieval, corrective
//! action, notification. Progression is strictly forward; a stage
//! failure records a fault, marks everything downstream skipped, and
//! jumps straight to report assembly. Only invalid input and
//! cancellation abort without a report.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use ehs_evidence::{analyse_all, EvidenceAnalyzer, EvidenceStore, FanOutOptions};
use ehs_notify::NotificationDelivery;
use ehs_policy::PolicyRetriever;
use ehs_types::{
    CorrectiveActionInput, CorrectiveActionPlan, IncidentInput, IncidentRecord, IntakeInput,
    IntakeSummary, NarrativeSeed, NotificationInput, NotificationOutcome, NotificationPlan,
    Report, RootCauseAnalysis, RootCauseInput, RunId, RunStatus, StageKind, StageOutcome,
    TriageAssessment, TriageInput, WorkflowState,
};

use crate::audit::RunLog;
use crate::config::WorkflowConfig;
use crate::engine::ReasoningEngine;
use crate::error::WorkflowError;
use crate::executor::StageExecutor;

/// Orchestrates incident runs over pluggable collaborators
pub struct WorkflowOrchestrator {
    engine: Arc<dyn ReasoningEngine>,
    executor: StageExecutor,
    retriever: Arc<dyn PolicyRetriever>,
    analyzer: Arc<dyn EvidenceAnalyzer>,
    delivery: Arc<dyn NotificationDelivery>,
    evidence_store: Option<Arc<EvidenceStore>>,
    config: WorkflowConfig,
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("config", &self.config)
            .field("has_evidence_store", &self.evidence_store.is_some())
            .finish()
    }
}

impl WorkflowOrchestrator {
    /// Create an orchestrator with default configuration
    #[must_use]
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        retriever: Arc<dyn PolicyRetriever>,
        analyzer: Arc<dyn EvidenceAnalyzer>,
        delivery: Arc<dyn NotificationDelivery>,
    ) -> Self {
        let config = WorkflowConfig::default();
        let executor = StageExecutor::new(Arc::clone(&engine), config.stage_timeout());
        Self {
            engine,
            executor,
            retriever,
            analyzer,
            delivery,
            evidence_store: None,
            config,
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.executor = StageExecutor::new(Arc::clone(&self.engine), config.stage_timeout());
        self.config = config;
        self
    }

    /// Persist uploaded evidence through this store
    #[must_use]
    pub fn with_evidence_store(mut self, store: Arc<EvidenceStore>) -> Self {
        self.evidence_store = Some(store);
        self
    }

    /// Run one incident to its terminal report
    ///
    /// # Errors
    /// `WorkflowError::InvalidInput` when the input is empty; nothing
    /// else aborts the run.
    pub async fn run(&self, input: IncidentInput) -> Result<Report, WorkflowError> {
        self.run_cancellable(input, CancellationToken::new()).await
    }

    /// Run one incident under an external cancellation token
    ///
    /// Cancellation drops in-flight work and returns
    /// `WorkflowError::Cancelled`; no report is produced.
    ///
    /// # Errors
    /// `WorkflowError::InvalidInput` or `WorkflowError::Cancelled`.
    pub async fn run_cancellable(
        &self,
        input: IncidentInput,
        cancel: CancellationToken,
    ) -> Result<Report, WorkflowError> {
        input.validate()?;

        let run_id = RunId::new();
        let log = RunLog::new();
        log.append(
            "start",
            format!("run accepted with {} evidence file(s)", input.evidence.len()),
        );
        tracing::info!(run_id = %run_id, evidence = input.evidence.len(), "workflow run started");

        let IncidentInput {
            details,
            message,
            evidence,
        } = input;

        // Persist uploads before analysis so the record can reference them
        let attachments = self.persist_evidence(run_id, &evidence, &log);

        // Concurrent fan-out over the uploads; one slow or broken file
        // never blocks its siblings
        let fan_out = FanOutOptions {
            max_parallelism: self.config.max_evidence_parallelism,
            timeout: self.config.evidence_timeout(),
        };
        let records =
            analyse_all(Arc::clone(&self.analyzer), evidence, &fan_out, &cancel)
                .await
                .map_err(|_| WorkflowError::Cancelled)?;
        let analyzed = records.iter().filter(|r| r.outcome.is_analyzed()).count();
        log.append(
            "evidence",
            format!("{analyzed}/{} file(s) analyzed", records.len()),
        );

        // Captions from successful analyses only
        let captions: Vec<String> = records
            .iter()
            .filter_map(|r| r.caption().map(str::to_string))
            .collect();

        let narrative_synthesized = details.is_none();
        let mut incident = match details {
            Some(details) => {
                let mut record = IncidentRecord::from_details(details);
                record.append_evidence_insights(&captions);
                record
            }
            None => {
                let seed = NarrativeSeed::synthesize(message.as_deref(), &captions);
                IncidentRecord::from_seed(seed)
            }
        };
        incident.attachments = attachments;
        if narrative_synthesized {
            log.append("normalize", "incident narrative synthesized");
        }

        let mut state = WorkflowState::new(incident, narrative_synthesized);
        state.evidence = records;

        self.run_stages(&mut state, &log, &cancel).await?;

        let status = if state.fault.is_none()
            && state
                .notifications()
                .is_some_and(|n| n.delivery_error.is_none())
        {
            RunStatus::Complete
        } else {
            RunStatus::Degraded
        };
        log.append("report", format!("assembled with status {status:?}"));
        tracing::info!(run_id = %run_id, ?status, "workflow run finished");

        Ok(Report {
            run_id,
            status,
            state,
            audit: log.events(),
            generated_at: Utc::now(),
        })
    }

    /// The five-stage reasoning sequence plus retrieval and delivery
    ///
    /// Returns `Ok(())` both on full completion and on a recorded
    /// fault; errors are reserved for cancellation and sequencing bugs.
    async fn run_stages(
        &self,
        state: &mut WorkflowState,
        log: &RunLog,
        cancel: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        // Intake
        let intake_input = IntakeInput {
            incident: state.incident.clone(),
        };
        let outcome: StageOutcome<IntakeSummary> = with_cancel(
            cancel,
            self.executor.execute(StageKind::Intake, &intake_input),
        )
        .await?;
        let intake = match outcome {
            StageOutcome::Success(summary) => {
                log.append("intake", "success");
                state.record_intake(summary.clone())?;
                summary
            }
            StageOutcome::Failed { reason, partial } => {
                log.append("intake", format!("failed: {reason}"));
                state.record_fault(StageKind::Intake, reason, partial);
                return Ok(());
            }
        };

        // Triage
        let triage_input = TriageInput {
            incident: state.incident.clone(),
            intake,
        };
        let outcome: StageOutcome<TriageAssessment> = with_cancel(
            cancel,
            self.executor.execute(StageKind::Triage, &triage_input),
        )
        .await?;
        let triage = match outcome {
            StageOutcome::Success(triage) => {
                log.append("triage", "success");
                state.record_triage(triage.clone())?;
                triage
            }
            StageOutcome::Failed { reason, partial } => {
                log.append("triage", format!("failed: {reason}"));
                state.record_fault(StageKind::Triage, reason, partial);
                return Ok(());
            }
        };

        // Root cause
        let root_cause_input = RootCauseInput {
            incident: state.incident.clone(),
            intake: triage_input.intake,
            triage,
        };
        let outcome: StageOutcome<RootCauseAnalysis> = with_cancel(
            cancel,
            self.executor
                .execute(StageKind::RootCause, &root_cause_input),
        )
        .await?;
        let root_cause = match outcome {
            StageOutcome::Success(analysis) => {
                log.append("root_cause", "success");
                state.record_root_cause(analysis.clone())?;
                analysis
            }
            StageOutcome::Failed { reason, partial } => {
                log.append("root_cause", format!("failed: {reason}"));
                state.record_fault(StageKind::RootCause, reason, partial);
                return Ok(());
            }
        };

        // Policy retrieval sits between root cause and corrective
        // action; an empty or failed retrieval degrades to no policy
        // context, never to a fault
        let policies = self.retrieve_policies(state, log, cancel).await?;

        // Corrective action
        let corrective_input = CorrectiveActionInput {
            incident: state.incident.clone(),
            intake: root_cause_input.intake,
            triage: root_cause_input.triage,
            root_cause,
            policies,
        };
        let outcome: StageOutcome<CorrectiveActionPlan> = with_cancel(
            cancel,
            self.executor
                .execute(StageKind::CorrectiveAction, &corrective_input),
        )
        .await?;
        let corrective_actions = match outcome {
            StageOutcome::Success(plan) => {
                log.append("corrective_action", "success");
                state.record_corrective_actions(plan.clone())?;
                plan
            }
            StageOutcome::Failed { reason, partial } => {
                log.append("corrective_action", format!("failed: {reason}"));
                state.record_fault(StageKind::CorrectiveAction, reason, partial);
                return Ok(());
            }
        };

        // Notification: plan first, then delivery; a delivery failure
        // degrades the run but never discards the plan
        let notification_input = NotificationInput {
            incident: state.incident.clone(),
            intake: corrective_input.intake,
            triage: corrective_input.triage,
            corrective_actions,
        };
        let outcome: StageOutcome<NotificationPlan> = with_cancel(
            cancel,
            self.executor
                .execute(StageKind::Notification, &notification_input),
        )
        .await?;
        let plan = match outcome {
            StageOutcome::Success(plan) => plan,
            StageOutcome::Failed { reason, partial } => {
                log.append("notification", format!("failed: {reason}"));
                state.record_fault(StageKind::Notification, reason, partial);
                return Ok(());
            }
        };

        let (receipts, delivery_error) = match with_cancel(
            cancel,
            tokio::time::timeout(self.config.stage_timeout(), self.delivery.execute(&plan)),
        )
        .await?
        {
            Ok(Ok(receipts)) => {
                log.append(
                    "notification",
                    format!(
                        "delivered {} ticket(s), {} email(s)",
                        receipts.tickets.len(),
                        receipts.emails.len()
                    ),
                );
                (Some(receipts), None)
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "notification delivery failed");
                log.append("notification", format!("delivery failed: {err}"));
                (None, Some(err.to_string()))
            }
            Err(_) => {
                let detail = format!(
                    "delivery timed out after {}s",
                    self.config.stage_timeout_secs
                );
                tracing::warn!("notification delivery timed out");
                log.append("notification", format!("delivery failed: {detail}"));
                (None, Some(detail))
            }
        };
        state.record_notifications(NotificationOutcome {
            plan,
            receipts,
            delivery_error,
        })?;

        Ok(())
    }

    /// Query the policy corpus; failures degrade to an empty context
    async fn retrieve_policies(
        &self,
        state: &mut WorkflowState,
        log: &RunLog,
        cancel: &CancellationToken,
    ) -> Result<Vec<ehs_types::PolicySnippet>, WorkflowError> {
        let mut query = state.incident.description.clone();
        if let Some(intake) = state.intake() {
            query.push('\n');
            query.push_str(&intake.narrative);
        }
        if let Some(root_cause) = state.root_cause() {
            query.push('\n');
            query.push_str(&root_cause.primary_causes.join(", "));
        }

        let searched = with_cancel(
            cancel,
            tokio::time::timeout(
                self.config.stage_timeout(),
                self.retriever.search(&query, self.config.retrieval_k),
            ),
        )
        .await?;

        match searched {
            Ok(Ok(snippets)) => {
                log.append(
                    "policy_retrieve",
                    format!("{} snippet(s) retrieved", snippets.len()),
                );
                Ok(snippets)
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "policy retrieval failed; continuing without context");
                log.append("policy_retrieve", format!("failed: {err}"));
                state.retrieval_note = Some(format!("policy retrieval unavailable: {err}"));
                Ok(Vec::new())
            }
            Err(_) => {
                let detail = format!(
                    "policy retrieval timed out after {}s",
                    self.config.stage_timeout_secs
                );
                tracing::warn!("policy retrieval timed out; continuing without context");
                log.append("policy_retrieve", format!("failed: {detail}"));
                state.retrieval_note = Some(detail);
                Ok(Vec::new())
            }
        }
    }

    /// Persist uploads, returning stored references for the record
    fn persist_evidence(
        &self,
        run_id: RunId,
        files: &[ehs_types::EvidenceFile],
        log: &RunLog,
    ) -> Vec<String> {
        let Some(store) = &self.evidence_store else {
            return Vec::new();
        };
        let mut attachments = Vec::with_capacity(files.len());
        for file in files {
            match store.save(run_id, file) {
                Ok(stored) => attachments.push(stored.url),
                Err(err) => {
                    tracing::warn!(filename = %file.filename, error = %err, "evidence persist failed");
                    log.append("evidence", format!("persist failed for {}: {err}", file.filename));
                }
            }
        }
        attachments
    }
}

/// Race a future against run cancellation
async fn with_cancel<F>(cancel: &CancellationToken, fut: F) -> Result<F::Output, WorkflowError>
where
    F: std::future::Future,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(WorkflowError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    // These tests exercise collaborators from ehs-test-utils, which links
    // the externally built ehs-core. Import everything through that same
    // copy (self dev-dependency) so trait impls line up; `crate::` paths
    // here would name the separately compiled unit-test copy.
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use ehs_core::{
        EngineError, ReasoningEngine, StageRequest, WorkflowError, WorkflowOrchestrator,
    };
    use ehs_notify::StubDelivery;
    use ehs_policy::PolicyStore;
    use ehs_test_utils::{scripted_outputs, KeywordAnalyzer, ScriptedEngine};
    use ehs_types::{IncidentDetails, IncidentInput, RunStatus, StageKind};

    fn orchestrator(engine: Arc<ScriptedEngine>) -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(
            engine,
            Arc::new(PolicyStore::with_seed()),
            Arc::new(KeywordAnalyzer::default()),
            Arc::new(StubDelivery),
        )
    }

    #[tokio::test]
    async fn empty_input_runs_no_stage() {
        let engine = Arc::new(ScriptedEngine::new(scripted_outputs()));
        let orchestrator = orchestrator(Arc::clone(&engine));
        let err = orchestrator.run(IncidentInput::default()).await.unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start_reports_cancelled() {
        let engine = Arc::new(ScriptedEngine::new(scripted_outputs()));
        let orchestrator = orchestrator(engine);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let input = IncidentInput::from_details(IncidentDetails::new("t", "d"));
        let err = orchestrator.run_cancellable(input, cancel).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Cancelled));
    }

    /// Engine that always fails, for fault-path assertions
    struct DownEngine;

    #[async_trait::async_trait]
    impl ReasoningEngine for DownEngine {
        async fn invoke(&self, _request: StageRequest) -> Result<serde_json::Value, EngineError> {
            Err(EngineError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn intake_fault_skips_everything_downstream() {
        let orchestrator = WorkflowOrchestrator::new(
            Arc::new(DownEngine),
            Arc::new(PolicyStore::with_seed()),
            Arc::new(KeywordAnalyzer::default()),
            Arc::new(StubDelivery),
        );
        let input = IncidentInput::from_details(IncidentDetails::new("t", "d"));
        let report = orchestrator.run(input).await.unwrap();
        assert_eq!(report.status, RunStatus::Degraded);
        let fault = report.state.fault.as_ref().unwrap();
        assert_eq!(fault.stage, StageKind::Intake);
        assert_eq!(report.state.skipped.len(), 4);
        assert!(report.state.filled_slots().is_empty());
    }
}
