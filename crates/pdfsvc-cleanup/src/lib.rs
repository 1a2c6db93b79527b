//! Deferred deletion of per-job working directories.
//!
//! Every rendering job materializes its inputs into a temporary working
//! directory under a shared root. Once the response has been sent, the
//! directory is registered here with a grace delay and reclaimed later by
//! a periodic background sweep.
//!
//! This crate provides:
//! - A deadline queue of (path, due-time) deletion obligations
//! - A sweep that drains due entries and removes their subtrees from disk
//! - A periodic scheduler task that drives the sweep
//! - A startup recovery scan that re-registers leftovers from a prior run
//!
//! The work directory may be shared by several service instances, so every
//! deletion tolerates the path having already been removed by a peer.

pub mod queue;
pub mod recovery;
pub mod scheduler;
pub mod sweep;

pub use queue::DeadlineQueue;
pub use recovery::recover_work_dir;
pub use scheduler::CleanupScheduler;
pub use sweep::{SweepReport, sweep};
