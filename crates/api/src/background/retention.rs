//! Periodic cleanup of the upload and cache directories.
//!
//! The first sweep runs as soon as the task starts, then every `interval`
//! until `cancel` fires. Each sweep walks the filesystem on the blocking
//! pool so request handling is never stalled behind it.

use std::time::Duration;

use keychain_core::retention::{self, format_bytes, RetentionPolicy};
use tokio_util::sync::CancellationToken;

/// Run the retention sweep loop until `cancel` is triggered.
pub async fn run(policy: RetentionPolicy, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        dirs = ?policy.dirs,
        max_age_secs = policy.max_age.as_secs(),
        interval_secs = interval.as_secs(),
        "Retention job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Retention job stopping");
                break;
            }
            _ = ticker.tick() => {
                let policy = policy.clone();
                match tokio::task::spawn_blocking(move || retention::sweep(&policy)).await {
                    Ok(report) => {
                        if report.files_deleted > 0 {
                            tracing::info!(
                                deleted = report.files_deleted,
                                scanned = report.files_scanned,
                                reclaimed = %format_bytes(report.bytes_reclaimed),
                                "Retention: removed old files"
                            );
                        } else {
                            tracing::debug!(scanned = report.files_scanned, "Retention: nothing to remove");
                        }
                        if !report.errors.is_empty() {
                            tracing::warn!(errors = report.errors.len(), "Retention: sweep finished with errors");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Retention: sweep task failed");
                    }
                }
            }
        }
    }
}
