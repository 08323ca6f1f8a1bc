//! Hash-chained run audit trail
//!
//! Every phase transition and stage outcome is appended as an event
//! whose hash covers the previous event's hash, so the terminal
//! report's trail is tamper-evident.

use chrono::Utc;
use ehs_types::AuditEvent;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Chain integrity violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("audit chain integrity violation at seq {0}")]
pub struct AuditIntegrityError(pub u64);

/// Append-only, hash-chained event log for one run
#[derive(Debug, Default)]
pub struct RunLog {
    inner: Mutex<Vec<AuditEvent>>,
}

impl RunLog {
    /// Empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event, chaining it to the previous one
    pub fn append(&self, phase: impl Into<String>, detail: impl Into<String>) {
        let mut guard = self.inner.lock();
        let seq = guard.len() as u64;
        let prev_hash = guard
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(zero_hash);
        let mut event = AuditEvent {
            seq,
            timestamp: Utc::now(),
            phase: phase.into(),
            detail: detail.into(),
            prev_hash,
            hash: String::new(),
        };
        event.hash = compute_hash(&event);
        guard.push(event);
    }

    /// Snapshot of the chain so far
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.inner.lock().clone()
    }
}

/// Verify a chain snapshot end to end
///
/// # Errors
/// `AuditIntegrityError` with the first offending sequence number.
pub fn verify_integrity(events: &[AuditEvent]) -> Result<(), AuditIntegrityError> {
    let mut prev = zero_hash();
    for event in events {
        if event.prev_hash != prev || event.hash != compute_hash(event) {
            return Err(AuditIntegrityError(event.seq));
        }
        prev = event.hash.clone();
    }
    Ok(())
}

fn zero_hash() -> String {
    "0".repeat(64)
}

fn compute_hash(event: &AuditEvent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event.seq.to_le_bytes());
    hasher.update(event.timestamp.to_rfc3339().as_bytes());
    hasher.update(event.phase.as_bytes());
    hasher.update([0]);
    hasher.update(event.detail.as_bytes());
    hasher.update([0]);
    hasher.update(event.prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}
