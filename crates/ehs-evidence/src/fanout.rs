//! Concurrent evidence fan-out with a join barrier
//!
//! One analyzer invocation per file, bounded by optional max
//! parallelism, each under its own timeout. A member's timeout or
//! failure never cancels its siblings; run cancellation aborts every
//! outstanding member. Results come back in upload order so downstream
//! stages stay deterministic.

use crate::analyzer::EvidenceAnalyzer;
use ehs_types::{EvidenceFile, EvidenceRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Fan-out tuning
#[derive(Debug, Clone)]
pub struct FanOutOptions {
    /// Max concurrent analyzer calls; `None` means one task per file
    pub max_parallelism: Option<usize>,
    /// Per-call timeout
    pub timeout: Duration,
}

impl Default for FanOutOptions {
    fn default() -> Self {
        Self {
            max_parallelism: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// The whole run was cancelled while the fan-out was in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("evidence fan-out cancelled")]
pub struct FanOutCancelled;

/// Analyse every file concurrently and join on completion of all
///
/// An empty file set completes immediately with an empty result.
///
/// # Errors
/// `FanOutCancelled` when `cancel` fires before the join completes;
/// outstanding members are aborted and no partial result is returned.
pub async fn analyse_all<A>(
    analyzer: Arc<A>,
    files: Vec<EvidenceFile>,
    options: &FanOutOptions,
    cancel: &CancellationToken,
) -> Result<Vec<EvidenceRecord>, FanOutCancelled>
where
    A: EvidenceAnalyzer + ?Sized + 'static,
{
    if files.is_empty() {
        return Ok(Vec::new());
    }
    if cancel.is_cancelled() {
        return Err(FanOutCancelled);
    }

    let permits = options.max_parallelism.unwrap_or(files.len()).max(1);
    let semaphore = Arc::new(Semaphore::new(permits));
    let timeout = options.timeout;

    tracing::debug!(files = files.len(), permits, "starting evidence fan-out");

    let mut join_set: JoinSet<(usize, EvidenceRecord)> = JoinSet::new();
    let mut slots: Vec<Option<EvidenceRecord>> = Vec::new();
    slots.resize_with(files.len(), || None);
    let identities: Vec<(ehs_types::FileId, String)> = files
        .iter()
        .map(|f| (f.id, f.filename.clone()))
        .collect();

    for (idx, file) in files.into_iter().enumerate() {
        let analyzer = Arc::clone(&analyzer);
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let record = analyse_one(analyzer, semaphore, file, timeout).await;
            (idx, record)
        });
    }

    // Join barrier: wait for every member, or abort all on cancellation.
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("run cancelled; aborting outstanding evidence analyses");
                join_set.abort_all();
                return Err(FanOutCancelled);
            }
            joined = join_set.join_next() => {
                match joined {
                    Some(Ok((idx, record))) => slots[idx] = Some(record),
                    Some(Err(err)) => tracing::error!(error = %err, "evidence task panicked"),
                    None => break,
                }
            }
        }
    }

    let records = slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.unwrap_or_else(|| {
                let (file_id, filename) = identities[idx].clone();
                EvidenceRecord::failed(file_id, filename, "analysis task failed")
            })
        })
        .collect();
    Ok(records)
}

async fn analyse_one<A>(
    analyzer: Arc<A>,
    semaphore: Arc<Semaphore>,
    file: EvidenceFile,
    timeout: Duration,
) -> EvidenceRecord
where
    A: EvidenceAnalyzer + ?Sized,
{
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return EvidenceRecord::failed(file.id, file.filename, "fan-out pool closed");
        }
    };

    match tokio::time::timeout(timeout, analyzer.analyse(&file)).await {
        Ok(Ok(finding)) => EvidenceRecord::analyzed(file.id, file.filename, finding),
        Ok(Err(err)) => {
            tracing::warn!(filename = %file.filename, error = %err, "evidence analysis failed");
            EvidenceRecord::failed(file.id, file.filename, err.to_string())
        }
        Err(_) => {
            tracing::warn!(filename = %file.filename, "evidence analysis timed out");
            EvidenceRecord::failed(file.id, file.filename, "analysis timed out")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalysisError;
    use ehs_types::{EvidenceFinding, HazardDetection};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Captions by blob length; fails on empty blobs, sleeps on the
    /// marker name "slow".
    struct TestAnalyzer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TestAnalyzer {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl EvidenceAnalyzer for TestAnalyzer {
        async fn analyse(&self, file: &EvidenceFile) -> Result<EvidenceFinding, AnalysisError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);

            if file.filename == "slow" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            } else {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if file.bytes.is_empty() {
                return Err(AnalysisError::Unreadable("empty blob".to_string()));
            }
            Ok(EvidenceFinding {
                hazards: vec![HazardDetection::new("hazard", 0.9)],
                caption: Some(format!("{} bytes", file.bytes.len())),
            })
        }
    }

    fn file(name: &str, bytes: &[u8]) -> EvidenceFile {
        EvidenceFile::new(name, "image/jpeg", bytes.to_vec())
    }

    #[tokio::test]
    async fn empty_set_joins_immediately() {
        let records = analyse_all(
            Arc::new(TestAnalyzer::new()),
            vec![],
            &FanOutOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn results_preserve_upload_order() {
        let files = vec![file("a", b"1"), file("b", b"22"), file("c", b"333")];
        let records = analyse_all(
            Arc::new(TestAnalyzer::new()),
            files,
            &FanOutOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(records[2].caption(), Some("3 bytes"));
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let files = vec![file("good", b"ok"), file("bad", b""), file("also-good", b"ok")];
        let records = analyse_all(
            Arc::new(TestAnalyzer::new()),
            files,
            &FanOutOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(records[0].outcome.is_analyzed());
        assert!(!records[1].outcome.is_analyzed());
        assert!(records[2].outcome.is_analyzed());
    }

    #[tokio::test]
    async fn member_timeout_is_recorded_not_fatal() {
        let files = vec![file("slow", b"x"), file("fast", b"y")];
        let options = FanOutOptions {
            max_parallelism: None,
            timeout: Duration::from_millis(50),
        };
        let records = analyse_all(
            Arc::new(TestAnalyzer::new()),
            files,
            &options,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(matches!(
            &records[0].outcome,
            ehs_types::AnalysisOutcome::Failed { reason } if reason == "analysis timed out"
        ));
        assert!(records[1].outcome.is_analyzed());
    }

    #[tokio::test]
    async fn parallelism_is_bounded() {
        let analyzer = Arc::new(TestAnalyzer::new());
        let files = (0..8).map(|i| file(&format!("f{i}"), b"x")).collect();
        let options = FanOutOptions {
            max_parallelism: Some(2),
            timeout: Duration::from_secs(5),
        };
        analyse_all(Arc::clone(&analyzer), files, &options, &CancellationToken::new())
            .await
            .unwrap();
        assert!(analyzer.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancellation_aborts_outstanding_members() {
        let cancel = CancellationToken::new();
        let files = vec![file("slow", b"x"), file("slow", b"y")];
        let options = FanOutOptions {
            max_parallelism: None,
            timeout: Duration::from_secs(60),
        };

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_clone.cancel();
        });

        let result = analyse_all(Arc::new(TestAnalyzer::new()), files, &options, &cancel).await;
        assert_eq!(result.unwrap_err(), FanOutCancelled);
    }

    #[tokio::test]
    async fn deterministic_analyzer_is_idempotent() {
        let files = vec![file("a", b"same-blob")];
        let options = FanOutOptions::default();
        let cancel = CancellationToken::new();

        let first = analyse_all(
            Arc::new(TestAnalyzer::new()),
            files.clone(),
            &options,
            &cancel,
        )
        .await
        .unwrap();
        let second = analyse_all(Arc::new(TestAnalyzer::new()), files, &options, &cancel)
            .await
            .unwrap();
        assert_eq!(first[0].outcome, second[0].outcome);
    }
}
