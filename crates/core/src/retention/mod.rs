//! Age-based cleanup of working directories.
//!
//! A sweep deletes every regular file whose modification time is older than
//! the policy's cutoff. Failures on individual files are logged and recorded
//! in the [`SweepReport`]; they never abort the sweep. The walk uses blocking
//! `std::fs` calls, so async callers should run it on the blocking pool.

pub mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

pub use types::{format_bytes, RetentionPolicy, SweepReport};

/// Directories swept by the standalone one-shot sweeper.
pub const STANDALONE_DIRS: &[&str] = &["/tmp/cache", "/tmp/preview_models", "/tmp/temp_uploads"];

/// Age threshold used by the standalone one-shot sweeper (24 hours).
pub const STANDALONE_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24);

impl RetentionPolicy {
    /// The fixed policy of the standalone sweeper.
    pub fn standalone() -> Self {
        Self {
            dirs: STANDALONE_DIRS.iter().map(PathBuf::from).collect(),
            max_age: STANDALONE_MAX_AGE,
        }
    }
}

/// Sweep every directory in `policy` relative to the current time.
pub fn sweep(policy: &RetentionPolicy) -> SweepReport {
    sweep_at(policy, Utc::now())
}

/// Sweep every directory in `policy` as if the current time were `now`.
pub fn sweep_at(policy: &RetentionPolicy, now: DateTime<Utc>) -> SweepReport {
    let cutoff = match chrono::Duration::from_std(policy.max_age) {
        Ok(age) => now - age,
        // An age too large to represent means nothing is ever old enough.
        Err(_) => DateTime::<Utc>::MIN_UTC,
    };

    let mut report = SweepReport::default();
    for dir in &policy.dirs {
        match sweep_directory(dir, cutoff) {
            Ok(dir_report) => report.merge(dir_report),
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Retention: cannot list directory");
                report.errors.push(format!("{}: {e}", dir.display()));
            }
        }
    }
    report
}

/// Delete regular files in `dir` modified before `cutoff`.
///
/// A missing directory is treated as empty. Only a failure to list the
/// directory itself is returned as an error.
pub fn sweep_directory(dir: &Path, cutoff: DateTime<Utc>) -> std::io::Result<SweepReport> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "Retention: directory does not exist, skipping");
            return Ok(SweepReport::default());
        }
        Err(e) => return Err(e),
    };

    let mut report = SweepReport::default();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Retention: unreadable entry");
                report.errors.push(format!("{}: {e}", dir.display()));
                continue;
            }
        };

        match expire_file(&path, cutoff) {
            Ok(Expiry::NotAFile) => {}
            Ok(Expiry::Retained) => report.files_scanned += 1,
            Ok(Expiry::Deleted { bytes }) => {
                report.files_scanned += 1;
                report.files_deleted += 1;
                report.bytes_reclaimed += bytes;
                tracing::info!(path = %path.display(), bytes, "Deleted old file");
            }
            Err(e) => {
                report.files_scanned += 1;
                tracing::warn!(path = %path.display(), error = %e, "Error cleaning file");
                report.errors.push(format!("{}: {e}", path.display()));
            }
        }
    }

    Ok(report)
}

enum Expiry {
    NotAFile,
    Retained,
    Deleted { bytes: u64 },
}

fn expire_file(path: &Path, cutoff: DateTime<Utc>) -> std::io::Result<Expiry> {
    let meta = std::fs::metadata(path)?;
    if !meta.is_file() {
        return Ok(Expiry::NotAFile);
    }

    let modified: DateTime<Utc> = meta.modified()?.into();
    if modified >= cutoff {
        return Ok(Expiry::Retained);
    }

    std::fs::remove_file(path)?;
    Ok(Expiry::Deleted { bytes: meta.len() })
}
