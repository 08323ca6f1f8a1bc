//! EHS Core - incident workflow orchestration
//!
//! The engine that drives one safety-incident report through the fixed
//! stage sequence:
//! - Normalizes raw input (structured, freeform, or evidence-only)
//! - Fans out concurrent evidence analysis with a join barrier
//! - Executes intake, triage, root cause, corrective action, and
//!   notification through one schema-validated boundary
//! - Grounds corrective actions in retrieved policy context
//! - Degrades on stage failure instead of aborting, and assembles an
//!   auditable terminal report either way
//!
//! # Example
//!
//! ```rust,ignore
//! use ehs_core::{WorkflowOrchestrator, WorkflowConfig};
//! use ehs_types::{IncidentDetails, IncidentInput};
//!
//! # async fn example(orchestrator: WorkflowOrchestrator) -> Result<(), Box<dyn std::error::Error>> {
//! let input = IncidentInput::from_details(
//!     IncidentDetails::new("Forklift near-miss", "Forklift reversed into aisle 3"),
//! );
//! let report = orchestrator.run(input).await?;
//! println!("run {} finished: {:?}", report.run_id, report.status);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod telemetry;

pub use audit::{verify_integrity, AuditIntegrityError, RunLog};
pub use config::{
    WorkflowConfig, DEFAULT_EVIDENCE_TIMEOUT_SECS, DEFAULT_RETRIEVAL_K, DEFAULT_STAGE_TIMEOUT_SECS,
};
pub use engine::{instructions, ReasoningEngine, StageRequest};
pub use error::{EngineError, WorkflowError};
pub use executor::StageExecutor;
pub use orchestrator::WorkflowOrchestrator;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running workflows
    pub use crate::{
        ReasoningEngine, StageExecutor, StageRequest, WorkflowConfig, WorkflowError,
        WorkflowOrchestrator,
    };
    pub use ehs_types::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
