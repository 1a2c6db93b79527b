//! End-to-end lifecycle: recovery scan feeding the periodic scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::fs;

use pdfsvc_cleanup::{CleanupScheduler, DeadlineQueue, recover_work_dir};

#[tokio::test]
async fn recovered_leftovers_are_eventually_swept() {
    let work_dir = tempfile::tempdir().unwrap();

    // Leftovers from a "previous run".
    let stale = work_dir.path().join("pdfgen-stale");
    fs::create_dir_all(stale.join("fonts")).await.unwrap();
    fs::write(stale.join("fonts/body.ttf"), b"\0\x01\0\0").await.unwrap();
    fs::write(stale.join("render.fo"), b"<fo:root/>").await.unwrap();

    // Not a job directory; must survive.
    let keep = work_dir.path().join("fonts-cache");
    fs::create_dir(&keep).await.unwrap();

    let queue = Arc::new(DeadlineQueue::new());
    let recovered = recover_work_dir(
        &queue,
        work_dir.path(),
        "pdfgen",
        Duration::from_millis(1),
    )
    .await
    .unwrap();
    assert_eq!(recovered, 1);

    let scheduler =
        CleanupScheduler::start_with_queue(Arc::clone(&queue), Duration::from_millis(50));

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(!stale.exists());
    assert!(keep.exists());
    assert!(queue.is_empty());

    scheduler.shutdown().await;
}

#[tokio::test]
async fn fresh_registrations_and_recovered_entries_share_one_queue() {
    let work_dir = tempfile::tempdir().unwrap();

    let stale = work_dir.path().join("pdfgen-old");
    fs::create_dir(&stale).await.unwrap();
    let fresh = work_dir.path().join("pdfgen-new");
    fs::create_dir(&fresh).await.unwrap();

    let queue = Arc::new(DeadlineQueue::new());
    recover_work_dir(&queue, work_dir.path(), "pdfgen-old", Duration::from_millis(1))
        .await
        .unwrap();

    let scheduler =
        CleanupScheduler::start_with_queue(Arc::clone(&queue), Duration::from_millis(50));
    scheduler
        .register_for_deletion(&fresh, Duration::from_millis(1))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(!stale.exists());
    assert!(!fresh.exists());
    assert!(queue.is_empty());

    scheduler.shutdown().await;
}
