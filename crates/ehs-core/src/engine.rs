//! Reasoning engine seam
//!
//! Each of the five stages is one call through this boundary. The
//! engine receives the stage's instructions and its schema-valid input
//! as JSON, and returns raw JSON that the executor validates against
//! the stage's output schema. A plugin implementation satisfies exactly
//! this trait.

use crate::error::EngineError;
use ehs_types::StageKind;
use serde_json::Value;

/// One stage invocation as seen by the engine
#[derive(Debug, Clone)]
pub struct StageRequest {
    /// Which stage is being invoked
    pub stage: StageKind,
    /// Stage instructions (role and task framing)
    pub instructions: String,
    /// Schema-valid stage input
    pub input: Value,
}

/// The plugin seam every reasoning implementation must satisfy
#[async_trait::async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Perform the stage's judgment and return its raw output
    ///
    /// Called exactly once per stage invocation; the executor never
    /// retries. Output that does not match the stage's schema is
    /// reported as an invalid-output failure, not propagated raw.
    ///
    /// # Errors
    /// `EngineError` when the collaborator itself fails.
    async fn invoke(&self, request: StageRequest) -> Result<Value, EngineError>;
}

/// Stage instructions, adapted per stage
///
/// Severity-based differentiation happens here and in the engine, never
/// in the orchestrator's stage sequence.
#[must_use]
pub fn instructions(stage: StageKind) -> &'static str {
    match stage {
        StageKind::Intake => {
            "You are an incident intake specialist for an Environmental Health & Safety team. \
             Summarize the report clearly, highlight key findings, note any injuries, and \
             assign a severity based on the description."
        }
        StageKind::Triage => {
            "You are an EHS triage officer. Based on the incident summary, determine the risk \
             level, immediate actions, escalation requirements, and monitoring plan. Justify \
             your recommendations."
        }
        StageKind::RootCause => {
            "You are a root cause analyst for EHS incidents. Provide plausible causes and \
             contributing factors. Highlight any gaps requiring further investigation."
        }
        StageKind::CorrectiveAction => {
            "You are responsible for proposing corrective actions after an EHS incident. \
             Outline actionable steps with responsible parties, target due dates, and cite \
             relevant policies or procedures. When no policies are provided, base \
             recommendations on best practice."
        }
        StageKind::Notification => {
            "You coordinate incident communications. Decide which tickets to create and who \
             to email, ensuring compliance with escalation protocol and data privacy \
             guidelines."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_has_instructions() {
        for stage in StageKind::all() {
            assert!(!instructions(stage).is_empty());
        }
    }
}
