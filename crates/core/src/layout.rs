//! On-disk working directories.

use std::path::{Path, PathBuf};

/// The four directories the service reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    /// Read-only reference STEP models shipped with the service.
    pub base_models_dir: PathBuf,
    /// User-uploaded STEP files (`<uuid>.step`).
    pub uploads_dir: PathBuf,
    /// Generated STL artifacts (`<sha256>.stl`).
    pub cache_dir: PathBuf,
    /// Converted GLB previews (`<uuid>.glb`).
    pub preview_dir: PathBuf,
}

impl StorageLayout {
    /// Lay out all four directories under one root. Used by tests and local runs.
    pub fn under(root: &Path) -> Self {
        Self {
            base_models_dir: root.join("base_models"),
            uploads_dir: root.join("temp_uploads"),
            cache_dir: root.join("cache"),
            preview_dir: root.join("preview_models"),
        }
    }

    /// Create every directory that does not exist yet.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in self.all_dirs() {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    pub fn all_dirs(&self) -> [&Path; 4] {
        [
            &self.base_models_dir,
            &self.uploads_dir,
            &self.cache_dir,
            &self.preview_dir,
        ]
    }

    /// Look `name` up in the uploads directory.
    ///
    /// Only plain file names are considered; anything with a path separator
    /// or a `..` component is never treated as an upload.
    pub async fn find_upload(&self, name: &str) -> Option<PathBuf> {
        if !is_plain_file_name(name) {
            return None;
        }
        let candidate = self.uploads_dir.join(name);
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => Some(candidate),
            _ => None,
        }
    }
}

/// True if `name` is a single, non-empty path component.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}
