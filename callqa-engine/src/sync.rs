//! Debounced score synchronization
//!
//! When a scoring pass yields a value that differs from the stored
//! baseline by more than the rounding tolerance, a single delayed write
//! is scheduled to the score-sync collaborator. Every new recompute
//! replaces the pending write (the timer resets), teardown cancels it,
//! and failures are logged but never retried — the next natural
//! recompute supersedes a lost write.
//!
//! At most one write is ever in flight per scheduler.

use crate::services::{ScoreSyncRequest, SyncError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Sink for score writes; the production implementation is the HTTP
/// score-sync client
#[async_trait::async_trait]
pub trait ScoreSink: Send + Sync {
    async fn sync_score(&self, request: &ScoreSyncRequest) -> Result<(), SyncError>;
}

/// Owns the single pending debounced write
pub struct ScoreSyncScheduler {
    sink: Arc<dyn ScoreSink>,
    debounce: Duration,
    tolerance: u32,
    cancel: CancellationToken,
    pending: Mutex<Option<JoinHandle<()>>>,
    adopted_tx: watch::Sender<Option<u32>>,
}

impl ScoreSyncScheduler {
    pub fn new(sink: Arc<dyn ScoreSink>, debounce_ms: u64, tolerance: u32) -> Self {
        let (adopted_tx, _) = watch::channel(None);
        Self {
            sink,
            debounce: Duration::from_millis(debounce_ms),
            tolerance,
            cancel: CancellationToken::new(),
            pending: Mutex::new(None),
            adopted_tx,
        }
    }

    /// Observe scores the collaborator has acknowledged; the caller
    /// adopts each as its new stored baseline.
    pub fn subscribe(&self) -> watch::Receiver<Option<u32>> {
        self.adopted_tx.subscribe()
    }

    /// Reconcile a freshly computed score against the stored baseline.
    ///
    /// Within tolerance: any pending write is cancelled (the values
    /// converged). Beyond tolerance: the pending write is replaced by a
    /// new one delayed by the debounce interval.
    pub fn reconcile(&self, call_id: Uuid, new_score: u32, stored_score: u32, reason: &str) {
        let diff = new_score.abs_diff(stored_score);
        if diff <= self.tolerance {
            self.abort_pending();
            return;
        }

        tracing::debug!(
            %call_id,
            new_score,
            stored_score,
            "score drifted beyond tolerance, scheduling debounced sync"
        );

        let request = ScoreSyncRequest {
            call_id,
            new_score,
            reason: reason.to_string(),
        };
        let sink = Arc::clone(&self.sink);
        let cancel = self.cancel.clone();
        let debounce = self.debounce;
        let adopted_tx = self.adopted_tx.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    match sink.sync_score(&request).await {
                        Ok(()) => {
                            let _ = adopted_tx.send(Some(request.new_score));
                        }
                        Err(e) => {
                            // No retry: the next recompute re-attempts if
                            // the discrepancy persists
                            tracing::warn!(call_id = %request.call_id, error = %e, "score sync failed");
                        }
                    }
                }
            }
        });

        self.replace_pending(handle);
    }

    /// Cancel everything; no write fires after this returns.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.abort_pending();
    }

    fn replace_pending(&self, handle: JoinHandle<()>) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    fn abort_pending(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

impl Drop for ScoreSyncScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<ScoreSyncRequest>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ScoreSink for RecordingSink {
        async fn sync_score(&self, request: &ScoreSyncRequest) -> Result<(), SyncError> {
            self.calls.lock().unwrap().push(request.clone());
            if self.fail {
                Err(SyncError::Api(500, "boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn call_count(sink: &RecordingSink) -> usize {
        sink.calls.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_within_tolerance_never_writes() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = ScoreSyncScheduler::new(sink.clone(), 10, 1);
        scheduler.reconcile(Uuid::new_v4(), 80, 81, "recompute");
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(call_count(&sink), 0);
    }

    #[tokio::test]
    async fn test_drift_writes_once_after_debounce() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = ScoreSyncScheduler::new(sink.clone(), 10, 1);
        let call_id = Uuid::new_v4();
        scheduler.reconcile(call_id, 50, 80, "recompute");
        tokio::time::sleep(Duration::from_millis(80)).await;

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].call_id, call_id);
        assert_eq!(calls[0].new_score, 50);
    }

    #[tokio::test]
    async fn test_reschedule_replaces_pending_write() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = ScoreSyncScheduler::new(sink.clone(), 40, 1);
        let call_id = Uuid::new_v4();
        scheduler.reconcile(call_id, 50, 80, "first");
        tokio::time::sleep(Duration::from_millis(5)).await;
        scheduler.reconcile(call_id, 60, 80, "second");
        tokio::time::sleep(Duration::from_millis(120)).await;

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].new_score, 60);
    }

    #[tokio::test]
    async fn test_convergence_cancels_pending_write() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = ScoreSyncScheduler::new(sink.clone(), 40, 1);
        let call_id = Uuid::new_v4();
        scheduler.reconcile(call_id, 50, 80, "drifted");
        // The next recompute matches the stored value again
        scheduler.reconcile(call_id, 80, 80, "converged");
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(call_count(&sink), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_write() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = ScoreSyncScheduler::new(sink.clone(), 40, 1);
        scheduler.reconcile(Uuid::new_v4(), 50, 80, "recompute");
        scheduler.shutdown();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(call_count(&sink), 0);
    }

    #[tokio::test]
    async fn test_success_publishes_adopted_baseline() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = ScoreSyncScheduler::new(sink.clone(), 10, 1);
        let mut adopted = scheduler.subscribe();
        scheduler.reconcile(Uuid::new_v4(), 50, 80, "recompute");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(*adopted.borrow_and_update(), Some(50));
    }

    #[tokio::test]
    async fn test_failure_is_not_retried() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let scheduler = ScoreSyncScheduler::new(sink.clone(), 10, 1);
        let mut adopted = scheduler.subscribe();
        scheduler.reconcile(Uuid::new_v4(), 50, 80, "recompute");
        tokio::time::sleep(Duration::from_millis(120)).await;
        // Exactly one attempt, baseline never adopted
        assert_eq!(call_count(&sink), 1);
        assert_eq!(*adopted.borrow_and_update(), None);
    }
}
