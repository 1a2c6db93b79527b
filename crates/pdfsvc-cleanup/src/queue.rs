//! Deadline queue — the sorted set of pending deletion obligations.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use pdfsvc_core::error::AppError;
use pdfsvc_core::result::AppResult;

/// Default maximum deferral horizon (24 hours).
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(24 * 3600);

/// One pending deletion obligation.
///
/// The due time is computed once at registration and never changes.
/// Registering the same path twice creates two independent entries.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Subtree (file or directory) to delete.
    pub path: PathBuf,
    /// Instant after which the entry becomes eligible for deletion.
    pub due_at: DateTime<Utc>,
    /// Insertion counter, breaks ordering ties between equal due times.
    seq: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_at
            .cmp(&other.due_at)
            .then(self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Default)]
struct QueueInner {
    entries: BTreeSet<Entry>,
    next_seq: u64,
}

/// Sorted, concurrently-accessible collection of pending deletions.
///
/// Many request handlers register entries concurrently while a single
/// periodic sweep drains the due prefix. Both operations are brief
/// critical sections under one lock; no disk I/O ever happens while the
/// lock is held.
#[derive(Debug)]
pub struct DeadlineQueue {
    inner: Mutex<QueueInner>,
    max_delay: Duration,
}

impl DeadlineQueue {
    /// Create a queue with the default 24-hour deferral horizon.
    pub fn new() -> Self {
        Self::with_max_delay(DEFAULT_MAX_DELAY)
    }

    /// Create a queue with a custom maximum deferral horizon.
    pub fn with_max_delay(max_delay: Duration) -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            max_delay,
        }
    }

    /// Register a path for deletion after `delay` has elapsed.
    ///
    /// The due time is fixed at `now + delay`. Validation happens before
    /// any mutation: a rejected registration leaves the queue untouched.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if the path is empty, the delay is
    /// zero, or the delay exceeds the maximum horizon.
    pub fn register(&self, path: impl Into<PathBuf>, delay: Duration) -> AppResult<()> {
        let path = path.into();

        if path.as_os_str().is_empty() {
            return Err(AppError::validation("Deletion path must not be empty"));
        }
        if delay.is_zero() {
            return Err(AppError::validation(
                "Deletion delay must be greater than zero",
            ));
        }
        if delay > self.max_delay {
            return Err(AppError::validation(format!(
                "Deletion delay {delay:?} exceeds the maximum horizon {:?}",
                self.max_delay
            )));
        }

        let delta = TimeDelta::from_std(delay)
            .map_err(|e| AppError::validation(format!("Deletion delay out of range: {e}")))?;
        let due_at = Utc::now() + delta;

        tracing::debug!(path = %path.display(), %due_at, "Queued for deletion");

        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(Entry { path, due_at, seq });
        Ok(())
    }

    /// Atomically remove and return every entry due strictly before `now`,
    /// in ascending due-time order.
    ///
    /// The queue is sorted, so this is a prefix pop: the scan stops at the
    /// first not-yet-due entry. The whole scan-and-remove is one critical
    /// section, so a racing registration either lands entirely in the
    /// result or entirely in the remainder.
    pub fn drain_due(&self, now: DateTime<Utc>) -> Vec<Entry> {
        let mut inner = self.lock();
        let mut due = Vec::new();
        while inner.entries.first().is_some_and(|e| e.due_at < now) {
            if let Some(entry) = inner.entries.pop_first() {
                due.push(entry);
            }
        }
        due
    }

    /// Number of entries currently pending.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the queue holds no pending entries.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    // A panic while holding the lock cannot leave the set half-mutated
    // (insert and pop_first are atomic at this level), so poisoning is
    // recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DeadlineQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfsvc_core::error::ErrorKind;

    #[test]
    fn register_valid_entry() {
        let queue = DeadlineQueue::new();
        queue
            .register("/tmp/pdfgen-job1", Duration::from_secs(120))
            .unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn register_same_path_twice_creates_two_entries() {
        let queue = DeadlineQueue::new();
        queue
            .register("/tmp/pdfgen-job1", Duration::from_secs(60))
            .unwrap();
        queue
            .register("/tmp/pdfgen-job1", Duration::from_secs(60))
            .unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn register_empty_path_is_rejected() {
        let queue = DeadlineQueue::new();
        let err = queue.register("", Duration::from_secs(300)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn register_zero_delay_is_rejected() {
        let queue = DeadlineQueue::new();
        let err = queue
            .register("/tmp/pdfgen-job1", Duration::ZERO)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn register_beyond_horizon_is_rejected() {
        let queue = DeadlineQueue::new();
        let err = queue
            .register("/tmp/pdfgen-job1", Duration::from_secs(25 * 3600))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn register_at_exact_horizon_is_accepted() {
        let queue = DeadlineQueue::new();
        queue
            .register("/tmp/pdfgen-job1", DEFAULT_MAX_DELAY)
            .unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drain_returns_due_prefix_in_order() {
        let queue = DeadlineQueue::new();
        queue
            .register("/tmp/pdfgen-late", Duration::from_secs(3600))
            .unwrap();
        queue
            .register("/tmp/pdfgen-soon", Duration::from_millis(1))
            .unwrap();
        queue
            .register("/tmp/pdfgen-sooner", Duration::from_millis(1))
            .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        let due = queue.drain_due(Utc::now());

        assert_eq!(due.len(), 2);
        assert!(due[0].due_at <= due[1].due_at);
        // Complement stays behind.
        assert_eq!(queue.len(), 1);
        let remaining = queue.drain_due(Utc::now() + TimeDelta::hours(2));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].path, PathBuf::from("/tmp/pdfgen-late"));
    }

    #[test]
    fn drain_on_empty_queue_is_noop() {
        let queue = DeadlineQueue::new();
        assert!(queue.drain_due(Utc::now()).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_excludes_not_yet_due_entries() {
        let queue = DeadlineQueue::new();
        queue
            .register("/tmp/pdfgen-job1", Duration::from_secs(3600))
            .unwrap();
        assert!(queue.drain_due(Utc::now()).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn equal_due_times_drain_in_insertion_order() {
        let queue = DeadlineQueue::new();
        let now = Utc::now();
        {
            let mut inner = queue.lock();
            for name in ["a", "b", "c"] {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.entries.insert(Entry {
                    path: PathBuf::from(format!("/tmp/pdfgen-{name}")),
                    due_at: now,
                    seq,
                });
            }
        }

        let due = queue.drain_due(now + TimeDelta::seconds(1));
        let names: Vec<_> = due.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("/tmp/pdfgen-a"),
                PathBuf::from("/tmp/pdfgen-b"),
                PathBuf::from("/tmp/pdfgen-c"),
            ]
        );
    }
}
