//! Cancellable job polling.
//!
//! The original monitoring behavior is a fixed-cadence refresh that must
//! die with the view that started it. [`JobWatcher::spawn`] makes that
//! explicit: it returns a [`WatchHandle`] whose `stop` tears the poll
//! task down and only returns once the task is gone, so no snapshot is
//! ever published after it. A response still in flight at stop time is
//! discarded, not applied.
//!
//! One watcher never overlaps polls for its job: a new cycle starts only
//! after the previous response has resolved.

use crate::models::EmailJob;
use crate::types::AppResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Where a watcher gets its job snapshots. The live implementation is
/// [`SessionJobSource`](crate::api::SessionJobSource); tests substitute
/// their own.
#[async_trait]
pub trait JobSource: Send + Sync + 'static {
    async fn fetch(&self, job_id: &str) -> AppResult<EmailJob>;
}

pub struct JobWatcher;

impl JobWatcher {
    /// Start polling `job_id` on a fixed interval. The first poll fires
    /// immediately. The task ends on its own once the job reaches a
    /// terminal state, or when the handle stops it.
    pub fn spawn(
        source: Arc<dyn JobSource>,
        job_id: impl Into<String>,
        interval: Duration,
    ) -> WatchHandle {
        let job_id = job_id.into();
        let (snapshot_tx, snapshot_rx) = watch::channel::<Option<EmailJob>>(None);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }

                // Racing the fetch against stop drops an in-flight
                // response instead of applying it after teardown.
                let fetched = tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    fetched = source.fetch(&job_id) => fetched,
                };

                match fetched {
                    Ok(job) => {
                        let terminal = job.status.is_terminal();
                        if snapshot_tx.send(Some(job)).is_err() {
                            // Nobody is listening anymore.
                            break;
                        }
                        if terminal {
                            debug!(job_id = %job_id, "Job reached terminal state, watcher done");
                            break;
                        }
                    }
                    Err(e) => {
                        // Keep the last good snapshot and try again next tick.
                        warn!(job_id = %job_id, "Job poll failed: {}", e);
                    }
                }
            }
        });

        WatchHandle {
            snapshot_rx,
            stop_tx: Some(stop_tx),
            task,
        }
    }
}

/// Handle to a running poll task. Dropping it without `stop` detaches the
/// task, which then winds down on its next cycle; `stop` is the orderly
/// teardown with the no-publish-after guarantee.
pub struct WatchHandle {
    snapshot_rx: watch::Receiver<Option<EmailJob>>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Receiver of job snapshots; `None` until the first poll lands.
    pub fn snapshots(&self) -> watch::Receiver<Option<EmailJob>> {
        self.snapshot_rx.clone()
    }

    /// The most recent snapshot, if any poll has landed.
    pub fn latest(&self) -> Option<EmailJob> {
        self.snapshot_rx.borrow().clone()
    }

    /// Whether the poll task has ended (stopped or terminal job).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling. Returns only after the task has fully wound down;
    /// from then on no snapshot will ever be published.
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobStatus;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn job(status: JobStatus, sent: u32) -> EmailJob {
        EmailJob {
            job_id: "J1".to_string(),
            status,
            total_emails: 10,
            sent_emails: sent,
            failed_emails: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            estimated_completion_time: None,
            progress: None,
            server_info: None,
        }
    }

    /// Walks through a fixed status sequence, one entry per fetch.
    struct ScriptedSource {
        sequence: Vec<EmailJob>,
        cursor: AtomicUsize,
        fetch_delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(sequence: Vec<EmailJob>) -> Self {
            Self {
                sequence,
                cursor: AtomicUsize::new(0),
                fetch_delay: Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.fetch_delay = delay;
            self
        }
    }

    #[async_trait]
    impl JobSource for ScriptedSource {
        async fn fetch(&self, _job_id: &str) -> AppResult<EmailJob> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
            let index = self.cursor.fetch_add(1, Ordering::SeqCst);
            let job = self.sequence[index.min(self.sequence.len() - 1)].clone();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(job)
        }
    }

    #[tokio::test]
    async fn test_watcher_polls_until_terminal() {
        let source = Arc::new(ScriptedSource::new(vec![
            job(JobStatus::Pending, 0),
            job(JobStatus::Processing, 4),
            job(JobStatus::Completed, 10),
        ]));
        let handle = JobWatcher::spawn(source, "J1", Duration::from_millis(10));

        let mut rx = handle.snapshots();
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            if let Some(job) = rx.borrow().clone() {
                let status = job.status;
                seen.push(status);
                if status.is_terminal() {
                    break;
                }
            }
        }

        // A watch channel may coalesce intermediate snapshots; the
        // terminal one must always arrive last.
        assert_eq!(*seen.last().unwrap(), JobStatus::Completed);
        // Terminal state ends the task without an explicit stop.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_no_snapshot_after_stop() {
        // Fetches take long enough that stop lands mid-flight.
        let source = Arc::new(
            ScriptedSource::new(vec![job(JobStatus::Processing, 1)])
                .with_delay(Duration::from_millis(80)),
        );
        let handle = JobWatcher::spawn(source, "J1", Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let rx = handle.snapshots();
        handle.stop().await;

        // The in-flight response must have been discarded, and nothing
        // can arrive later.
        assert!(rx.borrow().is_none());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_polls_never_overlap() {
        let source = Arc::new(
            ScriptedSource::new(vec![
                job(JobStatus::Processing, 1),
                job(JobStatus::Processing, 2),
                job(JobStatus::Processing, 3),
                job(JobStatus::Completed, 10),
            ])
            // Slower than the tick cadence on purpose.
            .with_delay(Duration::from_millis(30)),
        );
        let handle = JobWatcher::spawn(source.clone(), "J1", Duration::from_millis(5));

        let mut rx = handle.snapshots();
        while rx.changed().await.is_ok() {
            let terminal = rx
                .borrow()
                .as_ref()
                .map(|j| j.status.is_terminal())
                .unwrap_or(false);
            if terminal {
                break;
            }
        }

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }

    struct FlakyThenOk {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobSource for FlakyThenOk {
        async fn fetch(&self, _job_id: &str) -> AppResult<EmailJob> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(crate::types::AppError::Network("connection reset".to_string()))
            } else {
                Ok(job(JobStatus::Completed, 10))
            }
        }
    }

    #[tokio::test]
    async fn test_poll_errors_keep_last_snapshot_and_retry() {
        let source = Arc::new(FlakyThenOk {
            calls: AtomicUsize::new(0),
        });
        let handle = JobWatcher::spawn(source, "J1", Duration::from_millis(10));

        let mut rx = handle.snapshots();
        rx.changed().await.unwrap();
        let seen = rx.borrow().clone().unwrap();
        assert_eq!(seen.status, JobStatus::Completed);
    }
}
