//! Testing utilities for the EHS workflow workspace
//!
//! Shared fakes and fixtures: a scripted reasoning engine, a
//! deterministic evidence analyzer, a failing delivery collaborator,
//! and canned stage outputs that satisfy every stage schema.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{json, Value};

use ehs_core::{EngineError, ReasoningEngine, StageRequest};
use ehs_evidence::{AnalysisError, EvidenceAnalyzer};
use ehs_notify::{DeliveryError, NotificationDelivery};
use ehs_types::{
    EvidenceFile, EvidenceFinding, HazardDetection, IncidentDetails, IncidentInput,
    NotificationPlan, NotificationReceipts, Severity, StageKind,
};

/// Reasoning engine that replays canned JSON per stage
///
/// Counts invocations so tests can assert the one-call-per-stage
/// contract. Stages can be scripted to fail or stall instead.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    outputs: HashMap<StageKind, Value>,
    failures: HashMap<StageKind, EngineError>,
    delays: HashMap<StageKind, Duration>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(outputs: HashMap<StageKind, Value>) -> Self {
        Self {
            outputs,
            failures: HashMap::new(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace one stage's output (e.g. with schema-invalid JSON)
    #[must_use]
    pub fn with_output(mut self, stage: StageKind, output: Value) -> Self {
        self.outputs.insert(stage, output);
        self
    }

    /// Make one stage fail with the given error
    #[must_use]
    pub fn with_failure(mut self, stage: StageKind, error: EngineError) -> Self {
        self.failures.insert(stage, error);
        self
    }

    /// Make one stage sleep before responding, for timeout tests
    #[must_use]
    pub fn with_delay(mut self, stage: StageKind, delay: Duration) -> Self {
        self.delays.insert(stage, delay);
        self
    }

    /// Total invocations across all stages
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn invoke(&self, request: StageRequest) -> Result<Value, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&request.stage) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(error) = self.failures.get(&request.stage) {
            return Err(error.clone());
        }
        self.outputs
            .get(&request.stage)
            .cloned()
            .ok_or_else(|| EngineError::Failed(format!("no scripted output for {}", request.stage)))
    }
}

/// Valid canned outputs for all five stages
pub fn scripted_outputs() -> HashMap<StageKind, Value> {
    let mut outputs = HashMap::new();
    outputs.insert(
        StageKind::Intake,
        json!({
            "narrative": "A worker reported a coolant spill near the press line.",
            "key_findings": ["coolant on walkway", "no barrier tape in place"],
            "injuries_or_illnesses": [],
            "severity": "medium"
        }),
    );
    outputs.insert(
        StageKind::Triage,
        json!({
            "risk_level": "medium",
            "priority_actions": ["cordon off the walkway", "deploy absorbent"],
            "escalation_required": false,
            "escalation_channels": [],
            "monitoring_plan": "Supervisor walk-through each shift until resolved.",
            "rationale": "Slip hazard contained to one walkway, no injury reported."
        }),
    );
    outputs.insert(
        StageKind::RootCause,
        json!({
            "primary_causes": ["coolant line fitting loosened by vibration"],
            "contributing_factors": ["missed weekly inspection"],
            "uncertainty_gaps": ["maintenance log for the press line"]
        }),
    );
    outputs.insert(
        StageKind::CorrectiveAction,
        json!({
            "actions": ["replace the fitting", "add vibration check to weekly inspection"],
            "responsible_parties": ["maintenance lead"],
            "due_dates": ["within 7 days"],
            "policy_references": [{
                "title": "Chemical Handling",
                "excerpt": "Spill kits must be accessible in all chemical storage areas.",
                "source": "chemical_handling"
            }]
        }),
    );
    outputs.insert(
        StageKind::Notification,
        json!({
            "tickets": [{
                "title": "Coolant spill - press line",
                "description": "Replace loosened fitting and restock spill kit.",
                "priority": "medium"
            }],
            "emails": [{
                "recipient": "ehs-team@example.com",
                "subject": "Incident follow-up: coolant spill",
                "body": "Corrective actions assigned, see ticket."
            }]
        }),
    );
    outputs
}

/// Deterministic evidence analyzer keyed on filename and media type
///
/// Images and text are "analyzed" into a caption derived from the
/// filename; anything else comes back unsupported. Same file, same
/// finding, every time.
#[derive(Debug, Default)]
pub struct KeywordAnalyzer {
    fail_on: Vec<String>,
    slow_on: Vec<String>,
    delay: Option<Duration>,
}

impl KeywordAnalyzer {
    /// Fail analysis for this exact filename
    #[must_use]
    pub fn fail_on(mut self, filename: impl Into<String>) -> Self {
        self.fail_on.push(filename.into());
        self
    }

    /// Stall analysis of this exact filename past any sane timeout
    #[must_use]
    pub fn slow_on(mut self, filename: impl Into<String>) -> Self {
        self.slow_on.push(filename.into());
        self
    }

    /// Sleep before every analysis, for timeout tests
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl EvidenceAnalyzer for KeywordAnalyzer {
    async fn analyse(&self, file: &EvidenceFile) -> Result<EvidenceFinding, AnalysisError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.slow_on.iter().any(|f| f == &file.filename) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_on.iter().any(|f| f == &file.filename) {
            return Err(AnalysisError::Backend(format!(
                "scripted failure for {}",
                file.filename
            )));
        }
        let supported =
            file.media_type.starts_with("image/") || file.media_type.starts_with("text/");
        if !supported {
            return Ok(EvidenceFinding::unsupported());
        }
        let mut hazards = Vec::new();
        if file.filename.contains("spill") {
            hazards.push(HazardDetection::new("liquid spill", 0.9));
        }
        if file.filename.contains("forklift") {
            hazards.push(HazardDetection::new("vehicle proximity", 0.8));
        }
        Ok(EvidenceFinding {
            hazards,
            caption: Some(format!("Scene from {}", file.filename)),
        })
    }
}

/// Delivery collaborator that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDelivery;

#[async_trait::async_trait]
impl NotificationDelivery for FailingDelivery {
    async fn execute(
        &self,
        _plan: &NotificationPlan,
    ) -> Result<NotificationReceipts, DeliveryError> {
        Err(DeliveryError::Integration(
            "ticketing system unreachable".to_string(),
        ))
    }
}

/// Structured details for a typical mid-severity incident
pub fn sample_details() -> IncidentDetails {
    IncidentDetails::new(
        "Coolant spill near press line",
        "Coolant pooled across the walkway next to press 4 during second shift.",
    )
    .with_severity_hint(Severity::Medium)
    .with_location("Building 2, press line")
    .with_reporter("J. Alvarez")
}

/// Structured-details input with no evidence
pub fn sample_input() -> IncidentInput {
    IncidentInput::from_details(sample_details())
}

/// An image evidence file with the given filename
pub fn image_evidence(filename: &str) -> EvidenceFile {
    EvidenceFile::new(filename, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
}
