//! One drain-and-delete cycle over the deadline queue.
//!
//! The sweep is a plain async function, separate from the timer that
//! drives it, so tests can invoke it synchronously with a chosen cutoff.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::fs;

use crate::queue::DeadlineQueue;

/// Outcome summary of a single sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries drained from the queue this sweep.
    pub drained: usize,
    /// Subtrees fully removed from disk.
    pub removed: usize,
    /// Entries whose path had already vanished before the attempt.
    pub already_gone: usize,
    /// Entries whose deletion hit at least one unexpected I/O error.
    pub failed: usize,
}

/// Per-entry result of a subtree deletion attempt.
#[derive(Debug, PartialEq, Eq)]
enum DeleteOutcome {
    Removed,
    AlreadyGone,
    Failed,
}

/// Drain every entry due before `now` and delete its subtree from disk.
///
/// Failures are handled per entry: an entry whose deletion fails is logged
/// and discarded, never re-queued. The deletion attempt is at-most-once;
/// the startup recovery scan of a later process is the backstop for
/// anything left behind.
pub async fn sweep(queue: &DeadlineQueue, now: DateTime<Utc>) -> SweepReport {
    let due = queue.drain_due(now);
    let mut report = SweepReport {
        drained: due.len(),
        ..SweepReport::default()
    };

    if due.is_empty() {
        tracing::trace!("Sweep found no due entries");
        return report;
    }

    tracing::debug!(due = due.len(), pending = queue.len(), "Sweeping due entries");

    for entry in due {
        match remove_tree(&entry.path).await {
            DeleteOutcome::Removed => {
                tracing::debug!(path = %entry.path.display(), "Deleted");
                report.removed += 1;
            }
            DeleteOutcome::AlreadyGone => {
                // Expected race with a peer instance sharing the work dir.
                tracing::debug!(
                    path = %entry.path.display(),
                    "Already removed by another deleter"
                );
                report.already_gone += 1;
            }
            DeleteOutcome::Failed => {
                report.failed += 1;
            }
        }
    }

    report
}

/// Recursively delete a subtree, post-order, tolerating missing nodes.
///
/// Any node reported as not-found is treated as already deleted and the
/// walk continues. Other I/O errors are logged per node; the walk still
/// visits everything it can before giving up on the entry.
async fn remove_tree(root: &Path) -> DeleteOutcome {
    let meta = match fs::symlink_metadata(root).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return DeleteOutcome::AlreadyGone,
        Err(e) => {
            tracing::error!(path = %root.display(), error = %e, "Failed to stat deletion root");
            return DeleteOutcome::Failed;
        }
    };

    if !meta.is_dir() {
        return match fs::remove_file(root).await {
            Ok(()) => DeleteOutcome::Removed,
            Err(e) if e.kind() == io::ErrorKind::NotFound => DeleteOutcome::AlreadyGone,
            Err(e) => {
                tracing::error!(path = %root.display(), error = %e, "Failed to delete file");
                DeleteOutcome::Failed
            }
        };
    }

    remove_dir_tree(root).await
}

/// Delete a directory tree whose root has been observed as a directory.
///
/// Directories are discovered pre-order while files are deleted on sight;
/// the directories themselves are removed afterwards in reverse discovery
/// order, so each one is empty by the time it is deleted. The root may
/// have vanished since it was observed; that counts as already gone.
async fn remove_dir_tree(root: &Path) -> DeleteOutcome {
    let mut failures = 0usize;
    let mut pending = vec![root.to_path_buf()];
    let mut dirs: Vec<std::path::PathBuf> = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut reader = match fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::error!(path = %dir.display(), error = %e, "Failed to read directory");
                failures += 1;
                continue;
            }
        };
        dirs.push(dir.clone());

        loop {
            match reader.next_entry().await {
                Ok(Some(child)) => {
                    let path = child.path();
                    let file_type = match child.file_type().await {
                        Ok(ft) => ft,
                        Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                        Err(e) => {
                            tracing::error!(path = %path.display(), error = %e, "Failed to stat entry");
                            failures += 1;
                            continue;
                        }
                    };

                    // Symlinks are removed like files, never followed.
                    if file_type.is_dir() {
                        pending.push(path);
                    } else {
                        match fs::remove_file(&path).await {
                            Ok(()) => {}
                            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                            Err(e) => {
                                tracing::error!(path = %path.display(), error = %e, "Failed to delete file");
                                failures += 1;
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(path = %dir.display(), error = %e, "Directory iteration failed");
                    failures += 1;
                    break;
                }
            }
        }
    }

    for dir in dirs.iter().rev() {
        match fs::remove_dir(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(path = %dir.display(), error = %e, "Failed to delete directory");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        DeleteOutcome::Failed
    } else if dirs.is_empty() {
        // The root vanished before it could be read; nothing was deleted.
        DeleteOutcome::AlreadyGone
    } else {
        DeleteOutcome::Removed
    }
}
