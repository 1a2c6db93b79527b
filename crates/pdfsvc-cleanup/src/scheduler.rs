//! Periodic sweep task and its lifecycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use pdfsvc_core::config::CleanupConfig;
use pdfsvc_core::result::AppResult;

use crate::queue::DeadlineQueue;
use crate::sweep::sweep;

/// Owns the deadline queue and the background task sweeping it.
///
/// Exactly one scheduler should exist per running service; the owning
/// process constructs it at startup and hands clones of the queue to
/// whatever code registers directories. Sweeps never overlap: the single
/// task awaits each sweep before sleeping for the next period, so a sweep
/// that runs long simply delays the next tick.
#[derive(Debug)]
pub struct CleanupScheduler {
    queue: Arc<DeadlineQueue>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CleanupScheduler {
    /// Start the periodic sweep with settings from configuration.
    pub fn start(config: &CleanupConfig) -> Self {
        let queue = Arc::new(DeadlineQueue::with_max_delay(config.max_delay()));
        Self::start_with_queue(queue, config.sweep_period())
    }

    /// Start the periodic sweep against an existing queue.
    ///
    /// The first sweep runs immediately, then repeats every `period` until
    /// [`shutdown`](Self::shutdown) is called.
    pub fn start_with_queue(queue: Arc<DeadlineQueue>, period: Duration) -> Self {
        let (shutdown, mut cancel) = watch::channel(false);
        let task_queue = Arc::clone(&queue);

        let handle = tokio::spawn(async move {
            tracing::info!(period_secs = period.as_secs(), "Cleanup scheduler started");

            loop {
                let report = sweep(&task_queue, Utc::now()).await;
                if report.drained > 0 {
                    tracing::info!(
                        removed = report.removed,
                        already_gone = report.already_gone,
                        failed = report.failed,
                        pending = task_queue.len(),
                        "Sweep complete"
                    );
                }

                tokio::select! {
                    changed = cancel.changed() => {
                        // A closed channel means the owning handle was
                        // dropped without an explicit shutdown; stop
                        // rather than sweep on a dead handle.
                        if changed.is_err() || *cancel.borrow() {
                            tracing::info!("Cleanup scheduler received shutdown signal");
                            break;
                        }
                    }
                    _ = time::sleep(period) => {}
                }
            }
        });

        Self {
            queue,
            shutdown,
            handle,
        }
    }

    /// Register a path for deletion after `delay` has elapsed.
    ///
    /// Never blocks on disk; only on the queue's brief insert section.
    pub fn register_for_deletion(
        &self,
        path: impl Into<PathBuf>,
        delay: Duration,
    ) -> AppResult<()> {
        self.queue.register(path, delay)
    }

    /// Shared handle to the backing queue, for callers that register
    /// entries from other tasks (request handlers, the recovery scan).
    pub fn queue(&self) -> Arc<DeadlineQueue> {
        Arc::clone(&self.queue)
    }

    /// Stop the periodic sweep.
    ///
    /// An in-flight sweep is allowed to finish. Entries still pending are
    /// discarded with the process; the next run's recovery scan picks up
    /// whatever they would have deleted.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                tracing::warn!(error = %e, "Cleanup task ended abnormally");
            }
        }
        tracing::info!("Cleanup scheduler shut down");
    }
}
