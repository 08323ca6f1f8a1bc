//! Stage executor
//!
//! Uniform invocation boundary between the orchestrator and a reasoning
//! step:
//! - Validates the typed input against its JSON schema (a violation is
//!   a local programming error, surfaced distinctly and never retried)
//! - Performs exactly one engine call per invocation, under the
//!   configured per-invocation timeout
//! - Validates and deserializes the engine's response against the
//!   output schema; a mismatch is `Failed(InvalidOutput)` carrying the
//!   raw payload, never propagated as data

use crate::engine::{instructions, ReasoningEngine, StageRequest};
use dashmap::DashMap;
use ehs_types::{StageFailure, StageKind, StageOutcome};
use jsonschema::JSONSchema;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Uniform adapter binding the five stages to one engine
pub struct StageExecutor {
    engine: Arc<dyn ReasoningEngine>,
    timeout: Duration,
    // Compiled schemas, keyed by contract type, built once per executor
    schemas: DashMap<&'static str, Arc<JSONSchema>>,
}

impl std::fmt::Debug for StageExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageExecutor")
            .field("timeout", &self.timeout)
            .field("cached_schemas", &self.schemas.len())
            .finish()
    }
}

impl StageExecutor {
    /// Create an executor over an engine with a per-invocation timeout
    #[must_use]
    pub fn new(engine: Arc<dyn ReasoningEngine>, timeout: Duration) -> Self {
        Self {
            engine,
            timeout,
            schemas: DashMap::new(),
        }
    }

    /// Execute one stage: `execute(stage, typed input) -> StageOutcome`
    ///
    /// Exactly one engine call, no internal retry loop.
    pub async fn execute<I, O>(&self, stage: StageKind, input: &I) -> StageOutcome<O>
    where
        I: Serialize + JsonSchema,
        O: DeserializeOwned + JsonSchema,
    {
        // Input contract
        let input_value = match serde_json::to_value(input) {
            Ok(value) => value,
            Err(err) => {
                return StageOutcome::failed(StageFailure::InputContract {
                    detail: err.to_string(),
                })
            }
        };
        if let Some(detail) = self.first_violation::<I>(&input_value) {
            tracing::error!(stage = %stage, %detail, "stage input violates its contract");
            return StageOutcome::failed(StageFailure::InputContract { detail });
        }

        // One engine call, under the timeout
        let request = StageRequest {
            stage,
            instructions: instructions(stage).to_string(),
            input: input_value,
        };
        let raw = match tokio::time::timeout(self.timeout, self.engine.invoke(request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                tracing::warn!(stage = %stage, error = %err, "reasoning call failed");
                return StageOutcome::failed(StageFailure::Upstream {
                    detail: err.to_string(),
                });
            }
            Err(_) => {
                tracing::warn!(stage = %stage, "reasoning call timed out");
                return StageOutcome::failed(StageFailure::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        // Output contract
        if let Some(detail) = self.first_violation::<O>(&raw) {
            tracing::warn!(stage = %stage, %detail, "engine output failed schema validation");
            return StageOutcome::Failed {
                reason: StageFailure::InvalidOutput { detail },
                partial: Some(raw),
            };
        }
        match serde_json::from_value::<O>(raw.clone()) {
            Ok(output) => StageOutcome::Success(output),
            Err(err) => StageOutcome::Failed {
                reason: StageFailure::InvalidOutput {
                    detail: err.to_string(),
                },
                partial: Some(raw),
            },
        }
    }

    /// First schema violation for `value` against `T`'s schema, if any
    fn first_violation<T: JsonSchema>(&self, value: &Value) -> Option<String> {
        let compiled = match self.compiled::<T>() {
            Ok(compiled) => compiled,
            Err(detail) => return Some(detail),
        };
        let violation = match compiled.validate(value) {
            Ok(()) => None,
            Err(mut errors) => Some(
                errors
                    .next()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "schema violation".to_string()),
            ),
        };
        violation
    }

    fn compiled<T: JsonSchema>(&self) -> Result<Arc<JSONSchema>, String> {
        let key = std::any::type_name::<T>();
        if let Some(cached) = self.schemas.get(key) {
            return Ok(Arc::clone(&cached));
        }
        let schema_value =
            serde_json::to_value(schemars::schema_for!(T)).map_err(|e| e.to_string())?;
        let compiled = JSONSchema::compile(&schema_value)
            .map_err(|e| format!("schema compile failed: {e}"))?;
        let compiled = Arc::new(compiled);
        self.schemas.insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use ehs_types::{IntakeInput, IntakeSummary};
    use ehs_types::{IncidentDetails, IncidentRecord};
    use parking_lot::Mutex;

    /// Engine that replays a fixed response
    struct FixedEngine {
        response: Result<Value, EngineError>,
        calls: Mutex<usize>,
    }

    impl FixedEngine {
        fn ok(value: Value) -> Self {
            Self {
                response: Ok(value),
                calls: Mutex::new(0),
            }
        }

        fn err(err: EngineError) -> Self {
            Self {
                response: Err(err),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl ReasoningEngine for FixedEngine {
        async fn invoke(&self, _request: StageRequest) -> Result<Value, EngineError> {
            *self.calls.lock() += 1;
            self.response.clone()
        }
    }

    struct SlowEngine;

    #[async_trait::async_trait]
    impl ReasoningEngine for SlowEngine {
        async fn invoke(&self, _request: StageRequest) -> Result<Value, EngineError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Value::Null)
        }
    }

    fn intake_input() -> IntakeInput {
        IntakeInput {
            incident: IncidentRecord::from_details(IncidentDetails::new(
                "Spill",
                "Coolant spill near press 2",
            )),
        }
    }

    fn valid_summary() -> Value {
        serde_json::json!({
            "narrative": "Coolant spilled near press 2",
            "key_findings": ["slip hazard"],
            "injuries_or_illnesses": [],
            "severity": "medium"
        })
    }

    #[tokio::test]
    async fn valid_output_is_success() {
        let engine = Arc::new(FixedEngine::ok(valid_summary()));
        let executor = StageExecutor::new(engine.clone(), Duration::from_secs(5));

        let outcome: StageOutcome<IntakeSummary> =
            executor.execute(StageKind::Intake, &intake_input()).await;
        let summary = outcome.into_success().unwrap();
        assert_eq!(summary.key_findings, vec!["slip hazard"]);
        // Exactly one call, no retry
        assert_eq!(*engine.calls.lock(), 1);
    }

    /// Serializes only `note`, while its declared schema also requires
    /// `operator_id`
    #[derive(Serialize)]
    struct UnderfilledInput {
        note: String,
    }

    impl JsonSchema for UnderfilledInput {
        fn schema_name() -> String {
            "UnderfilledInput".to_string()
        }

        fn json_schema(_: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
            serde_json::from_value(serde_json::json!({
                "type": "object",
                "required": ["note", "operator_id"],
                "properties": {
                    "note": { "type": "string" },
                    "operator_id": { "type": "string" }
                }
            }))
            .unwrap()
        }
    }

    #[tokio::test]
    async fn input_contract_violation_never_reaches_the_engine() {
        let engine = Arc::new(FixedEngine::ok(valid_summary()));
        let executor = StageExecutor::new(engine.clone(), Duration::from_secs(5));

        let input = UnderfilledInput {
            note: "missing operator".to_string(),
        };
        let outcome: StageOutcome<IntakeSummary> =
            executor.execute(StageKind::Intake, &input).await;
        assert!(matches!(
            outcome.failure(),
            Some(StageFailure::InputContract { .. })
        ));
        assert_eq!(*engine.calls.lock(), 0);
    }

    #[tokio::test]
    async fn schema_invalid_output_is_failed_with_partial() {
        let raw = serde_json::json!({"narrative": 42});
        let engine = Arc::new(FixedEngine::ok(raw.clone()));
        let executor = StageExecutor::new(engine, Duration::from_secs(5));

        let outcome: StageOutcome<IntakeSummary> =
            executor.execute(StageKind::Intake, &intake_input()).await;
        match outcome {
            StageOutcome::Failed { reason, partial } => {
                assert!(matches!(reason, StageFailure::InvalidOutput { .. }));
                assert_eq!(partial, Some(raw));
            }
            StageOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn engine_error_is_upstream_failure() {
        let engine = Arc::new(FixedEngine::err(EngineError::Unavailable(
            "connection refused".to_string(),
        )));
        let executor = StageExecutor::new(engine, Duration::from_secs(5));

        let outcome: StageOutcome<IntakeSummary> =
            executor.execute(StageKind::Intake, &intake_input()).await;
        assert!(matches!(
            outcome.failure(),
            Some(StageFailure::Upstream { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_timeout_failure() {
        let executor = StageExecutor::new(Arc::new(SlowEngine), Duration::from_secs(1));

        let outcome: StageOutcome<IntakeSummary> =
            executor.execute(StageKind::Intake, &intake_input()).await;
        assert!(matches!(
            outcome.failure(),
            Some(StageFailure::Timeout { secs: 1 })
        ));
    }

    #[tokio::test]
    async fn schemas_are_compiled_once() {
        let engine = Arc::new(FixedEngine::ok(valid_summary()));
        let executor = StageExecutor::new(engine, Duration::from_secs(5));

        let _: StageOutcome<IntakeSummary> =
            executor.execute(StageKind::Intake, &intake_input()).await;
        let cached = executor.schemas.len();
        let _: StageOutcome<IntakeSummary> =
            executor.execute(StageKind::Intake, &intake_input()).await;
        assert_eq!(executor.schemas.len(), cached);
    }
}
