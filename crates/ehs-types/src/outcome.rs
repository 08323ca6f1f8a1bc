//! Tagged stage outcomes
//!
//! Every stage invocation returns exactly one `StageOutcome`. A failed
//! outcome carries a reason from the fixed failure taxonomy plus the raw
//! engine payload when one exists, so the terminal report can show what
//! the engine actually returned.

use serde::{Deserialize, Serialize};

/// Why a stage invocation failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageFailure {
    /// The per-invocation timeout elapsed
    #[error("timeout after {secs}s")]
    Timeout {
        /// Configured timeout in seconds
        secs: u64,
    },

    /// Engine response failed output-schema validation
    #[error("invalid output: {detail}")]
    InvalidOutput {
        /// First validation error
        detail: String,
    },

    /// The reasoning collaborator itself errored
    #[error("upstream failure: {detail}")]
    Upstream {
        /// Collaborator error message
        detail: String,
    },

    /// Stage input failed its own schema: a local programming error,
    /// never retried
    #[error("input contract violation: {detail}")]
    InputContract {
        /// First validation error
        detail: String,
    },
}

/// Result of one stage invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum StageOutcome<T> {
    /// Stage produced a schema-valid payload
    Success(T),
    /// Stage failed; downstream progression stops
    Failed {
        /// Failure reason
        reason: StageFailure,
        /// Raw engine payload, when one was returned
        #[serde(default)]
        partial: Option<serde_json::Value>,
    },
}

impl<T> StageOutcome<T> {
    /// Failed outcome without a partial payload
    #[inline]
    #[must_use]
    pub fn failed(reason: StageFailure) -> Self {
        Self::Failed {
            reason,
            partial: None,
        }
    }

    /// Whether the stage succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Consume into the success payload
    #[inline]
    #[must_use]
    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }

    /// Failure reason, if failed
    #[inline]
    #[must_use]
    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failed { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_predicates() {
        let outcome: StageOutcome<u32> = StageOutcome::Success(7);
        assert!(outcome.is_success());
        assert_eq!(outcome.into_success(), Some(7));
    }

    #[test]
    fn failed_keeps_reason_and_partial() {
        let outcome: StageOutcome<u32> = StageOutcome::Failed {
            reason: StageFailure::InvalidOutput {
                detail: "missing field".to_string(),
            },
            partial: Some(serde_json::json!({"actions": 3})),
        };
        assert!(!outcome.is_success());
        assert!(matches!(
            outcome.failure(),
            Some(StageFailure::InvalidOutput { .. })
        ));
    }

    #[test]
    fn outcomes_serialize_for_any_payload() {
        let success: StageOutcome<u32> = StageOutcome::Success(7);
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "success", "data": 7}));

        let failed: StageOutcome<u32> = StageOutcome::failed(StageFailure::Timeout { secs: 5 });
        let back: StageOutcome<u32> =
            serde_json::from_value(serde_json::to_value(&failed).unwrap()).unwrap();
        assert_eq!(back, failed);
    }

    #[test]
    fn failure_display_names_the_kind() {
        let reason = StageFailure::Timeout { secs: 30 };
        assert_eq!(reason.to_string(), "timeout after 30s");
    }
}
