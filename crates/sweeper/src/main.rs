//! One-shot cleanup of the generator's scratch directories.
//!
//! Deletes files older than 24 hours from the cache, preview and upload
//! directories, logs a summary and exits. Intended for cron or a systemd
//! timer. Per-file failures are logged but do not change the exit status.
//! Set `SWEEP_REPORT_JSON=1` to print the report as JSON on stdout.

use keychain_core::retention::{self, format_bytes, RetentionPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keychain_sweeper=info,keychain_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let policy = RetentionPolicy::standalone();
    tracing::info!(
        dirs = ?policy.dirs,
        max_age_secs = policy.max_age.as_secs(),
        "Starting sweep"
    );

    let report = retention::sweep(&policy);

    tracing::info!(
        scanned = report.files_scanned,
        deleted = report.files_deleted,
        reclaimed = %format_bytes(report.bytes_reclaimed),
        errors = report.errors.len(),
        "Sweep complete"
    );

    if std::env::var("SWEEP_REPORT_JSON").is_ok_and(|v| v == "1") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
