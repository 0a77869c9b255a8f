//! Handler for user-supplied STEP base models.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use keychain_core::upload::store_step_upload;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Typed response for the upload endpoint.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Generated `<uuid>.step` name to pass as `baseModel` later.
    pub filename: String,
}

/// POST /upload-base-model
///
/// Accept a multipart upload with a `file` field, validate it as a STEP file
/// and store it under a generated name. Other fields are ignored.
pub async fn upload_base_model(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut file: Option<(Option<String>, axum::body::Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        file = Some((filename, data));
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    let stored = store_step_upload(&state.layout().uploads_dir, filename.as_deref(), &data).await?;

    Ok(Json(UploadResponse { filename: stored }))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File too large".into())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
