//! STEP upload validation and storage.

use std::path::Path;

/// Maximum accepted upload size (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Every STEP (ISO 10303-21) file starts with this marker.
pub const STEP_MAGIC: &[u8] = b"ISO-10303-21";

/// Accepted file extensions (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["step", "stp"];

/// Extension used for stored uploads, regardless of the client's extension.
pub const STORED_EXTENSION: &str = "step";

/// Reasons an upload is refused.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File too large")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid file extension")]
    InvalidExtension,

    #[error("Invalid STEP content")]
    InvalidContent,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check an uploaded file against the size, extension and magic-byte rules,
/// in that order.
pub fn validate_step_upload(filename: Option<&str>, content: &[u8]) -> Result<(), UploadError> {
    if content.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size: content.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let has_allowed_extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
    if !has_allowed_extension {
        return Err(UploadError::InvalidExtension);
    }

    if !content.starts_with(STEP_MAGIC) {
        return Err(UploadError::InvalidContent);
    }

    Ok(())
}

/// Validate and write an upload to `<uploads_dir>/<uuid>.step`.
///
/// Returns the generated filename. Nothing is written if validation fails.
pub async fn store_step_upload(
    uploads_dir: &Path,
    filename: Option<&str>,
    content: &[u8],
) -> Result<String, UploadError> {
    validate_step_upload(filename, content)?;

    let stored_name = format!("{}.{STORED_EXTENSION}", uuid::Uuid::new_v4());
    tokio::fs::create_dir_all(uploads_dir).await?;
    tokio::fs::write(uploads_dir.join(&stored_name), content).await?;

    tracing::info!(
        original = filename.unwrap_or_default(),
        stored = %stored_name,
        bytes = content.len(),
        "Stored uploaded base model"
    );
    Ok(stored_name)
}
