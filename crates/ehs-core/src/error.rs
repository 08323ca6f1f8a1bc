//! Run-level error types
//!
//! Only two conditions prevent a report: an input rejected before any
//! stage runs, and cancellation. Everything else degrades into the
//! report itself.

use ehs_types::{InputError, SlotAlreadyFilled};

/// Errors that abort a run without producing a report
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Input invariant violated; no stage executed
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// The run was cancelled; distinct from every failure kind
    #[error("run cancelled")]
    Cancelled,

    /// A slot was written twice - a bug in stage sequencing
    #[error("internal state error: {0}")]
    Internal(#[from] SlotAlreadyFilled),
}

impl WorkflowError {
    /// Whether this error is client-facing (bad request) rather than
    /// operational
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Errors from the reasoning collaborator itself
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The engine could not be reached
    #[error("reasoning engine unavailable: {0}")]
    Unavailable(String),

    /// The engine was reached but errored
    #[error("reasoning engine failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_is_client_error() {
        let err = WorkflowError::InvalidInput(InputError::Empty);
        assert!(err.is_client_error());
        assert!(!WorkflowError::Cancelled.is_client_error());
    }

    #[test]
    fn cancelled_is_distinct_in_display() {
        assert_eq!(WorkflowError::Cancelled.to_string(), "run cancelled");
    }
}
