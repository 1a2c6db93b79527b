//! Startup recovery scan over the shared work directory.

use std::io;
use std::path::Path;
use std::time::Duration;

use tokio::fs;

use pdfsvc_core::error::{AppError, ErrorKind};
use pdfsvc_core::result::AppResult;

use crate::queue::DeadlineQueue;

/// Re-register leftover job subtrees from a previous run.
///
/// Scans the work directory one level deep and queues every entry whose
/// name starts with `job_prefix` for deletion after `delay`. Instances
/// sharing the same work directory may each recover the same leftovers;
/// the sweep tolerates the resulting double deletion.
///
/// A missing work directory is a no-op (first boot). Returns the number
/// of entries re-registered.
pub async fn recover_work_dir(
    queue: &DeadlineQueue,
    root: &Path,
    job_prefix: &str,
    delay: Duration,
) -> AppResult<usize> {
    let mut reader = match fs::read_dir(root).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(root = %root.display(), "Work directory does not exist, nothing to recover");
            return Ok(0);
        }
        Err(e) => {
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to scan work directory: {}", root.display()),
                e,
            ));
        }
    };

    let mut recovered = 0usize;
    loop {
        let child = reader.next_entry().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to scan work directory: {}", root.display()),
                e,
            )
        })?;
        let Some(child) = child else { break };

        let name = child.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(job_prefix) {
            queue.register(child.path(), delay)?;
            recovered += 1;
        }
    }

    if recovered > 0 {
        tracing::info!(
            recovered,
            root = %root.display(),
            "Re-registered leftover job directories from a previous run"
        );
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn leftovers_matching_prefix_are_registered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("pdfgen-aaa")).await.unwrap();
        fs::create_dir(dir.path().join("pdfgen-bbb")).await.unwrap();
        fs::create_dir(dir.path().join("unrelated")).await.unwrap();
        // Stray files with the prefix count too, as in depth-1 scans.
        fs::write(dir.path().join("pdfgen-stray.tmp"), b"x")
            .await
            .unwrap();

        let queue = DeadlineQueue::new();
        let recovered = recover_work_dir(&queue, dir.path(), "pdfgen", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(recovered, 3);
        assert_eq!(queue.len(), 3);
    }

    #[tokio::test]
    async fn missing_work_dir_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-created");

        let queue = DeadlineQueue::new();
        let recovered = recover_work_dir(&queue, &missing, "pdfgen", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(recovered, 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn empty_work_dir_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();

        let queue = DeadlineQueue::new();
        let recovered = recover_work_dir(&queue, dir.path(), "pdfgen", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(recovered, 0);
        assert!(queue.is_empty());
    }
}
