//! PDF service entry point.
//!
//! Wires configuration, logging, the shared work directory, and the
//! deferred-deletion scheduler together. The HTTP resource layer and the
//! rendering engine run as external collaborators; their job directories
//! land under the work root and are registered with the scheduler.

use std::path::PathBuf;

use tracing_subscriber::{EnvFilter, fmt};

use pdfsvc_cleanup::{CleanupScheduler, recover_work_dir};
use pdfsvc_core::config::AppConfig;
use pdfsvc_core::error::{AppError, ErrorKind};

#[tokio::main]
async fn main() {
    let env = std::env::var("PDFSVC_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Service error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main service run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting pdfsvc v{}", env!("CARGO_PKG_VERSION"));

    let work_root = PathBuf::from(&config.workdir.root);
    tokio::fs::create_dir_all(&work_root).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to create work directory: {}", work_root.display()),
            e,
        )
    })?;

    let scheduler = if config.cleanup.enabled {
        let scheduler = CleanupScheduler::start(&config.cleanup);

        // Subdirectories left behind by a previous run (or by a peer
        // instance sharing the work directory) get a short grace period
        // and are then swept like any other job directory.
        let recovered = recover_work_dir(
            &scheduler.queue(),
            &work_root,
            &config.workdir.job_prefix,
            config.cleanup.recovery_delay(),
        )
        .await?;
        tracing::info!(recovered, "Work directory recovery scan complete");

        Some(scheduler)
    } else {
        tracing::warn!("Cleanup scheduler disabled; job directories will not be reclaimed");
        None
    };

    tokio::signal::ctrl_c().await.map_err(|e| {
        AppError::with_source(ErrorKind::Internal, "Failed to listen for shutdown signal", e)
    })?;
    tracing::info!("Shutdown signal received");

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }

    tracing::info!("Service has finished shutting down");
    Ok(())
}
