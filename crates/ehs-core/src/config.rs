//! Workflow configuration
//!
//! Timeouts, fan-out bounds and resource locations. Values come from
//! defaults, an optional config file deserialized by the embedder, or
//! `EHS_*` environment variables via [`WorkflowConfig::from_env`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-stage reasoning timeout
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 60;
/// Default per-file evidence analysis timeout
pub const DEFAULT_EVIDENCE_TIMEOUT_SECS: u64 = 30;
/// Default number of policy snippets requested per run
pub const DEFAULT_RETRIEVAL_K: usize = 4;

/// Tunables for a [`WorkflowOrchestrator`](crate::WorkflowOrchestrator)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Per-stage reasoning call budget in seconds
    pub stage_timeout_secs: u64,
    /// Per-file evidence analysis budget in seconds
    pub evidence_timeout_secs: u64,
    /// Cap on concurrent evidence analyses; `None` runs one task per file
    pub max_evidence_parallelism: Option<usize>,
    /// Policy snippets requested from the retriever
    pub retrieval_k: usize,
    /// Credential handed to the reasoning engine implementation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_credential: Option<String>,
    /// Directory of `.txt` policy documents; seed corpus when unset
    pub policy_corpus_dir: Option<PathBuf>,
    /// Root directory for persisted evidence files
    pub evidence_root: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            evidence_timeout_secs: DEFAULT_EVIDENCE_TIMEOUT_SECS,
            max_evidence_parallelism: None,
            retrieval_k: DEFAULT_RETRIEVAL_K,
            reasoning_credential: None,
            policy_corpus_dir: None,
            evidence_root: None,
        }
    }
}

impl WorkflowConfig {
    /// Defaults overridden by any `EHS_*` environment variables present
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_parse("EHS_STAGE_TIMEOUT_SECS") {
            config.stage_timeout_secs = secs;
        }
        if let Some(secs) = env_parse("EHS_EVIDENCE_TIMEOUT_SECS") {
            config.evidence_timeout_secs = secs;
        }
        if let Some(n) = env_parse("EHS_MAX_EVIDENCE_PARALLELISM") {
            config.max_evidence_parallelism = Some(n);
        }
        if let Some(k) = env_parse("EHS_RETRIEVAL_K") {
            config.retrieval_k = k;
        }
        if let Ok(credential) = std::env::var("EHS_REASONING_CREDENTIAL") {
            config.reasoning_credential = Some(credential);
        }
        if let Ok(dir) = std::env::var("EHS_POLICY_CORPUS_DIR") {
            config.policy_corpus_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("EHS_EVIDENCE_ROOT") {
            config.evidence_root = Some(PathBuf::from(dir));
        }
        config
    }

    /// Set the per-stage reasoning budget
    #[inline]
    #[must_use]
    pub fn with_stage_timeout(mut self, secs: u64) -> Self {
        self.stage_timeout_secs = secs;
        self
    }

    /// Set the per-file evidence analysis budget
    #[inline]
    #[must_use]
    pub fn with_evidence_timeout(mut self, secs: u64) -> Self {
        self.evidence_timeout_secs = secs;
        self
    }

    /// Bound concurrent evidence analyses
    #[inline]
    #[must_use]
    pub fn with_max_evidence_parallelism(mut self, limit: usize) -> Self {
        self.max_evidence_parallelism = Some(limit);
        self
    }

    /// Set the number of policy snippets requested per run
    #[inline]
    #[must_use]
    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    /// Per-stage budget as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Per-file evidence budget as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn evidence_timeout(&self) -> Duration {
        Duration::from_secs(self.evidence_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
