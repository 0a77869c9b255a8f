//! Shared types for the retention sweeper.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Which directories to sweep and how old a file must be to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub dirs: Vec<PathBuf>,
    /// Files whose modification time is older than `now - max_age` are deleted.
    pub max_age: Duration,
}

/// Outcome of a sweep over one or more directories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub files_scanned: u64,
    pub files_deleted: u64,
    pub bytes_reclaimed: u64,
    pub errors: Vec<String>,
}

impl SweepReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: SweepReport) {
        self.files_scanned += other.files_scanned;
        self.files_deleted += other.files_deleted;
        self.bytes_reclaimed += other.bytes_reclaimed;
        self.errors.extend(other.errors);
    }
}

/// Human-readable byte formatting.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}
