pub mod generate;
pub mod upload;

use std::path::Path;

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};

/// Stream a file from disk as an attachment with the given media type.
pub(crate) async fn file_response(path: &Path, media_type: &'static str) -> AppResult<Response> {
    let file = tokio::fs::File::open(path).await.map_err(AppError::internal)?;
    let len = file.metadata().await.map_err(AppError::internal)?.len();

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(AppError::internal)?;

    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static(media_type)),
        (CONTENT_DISPOSITION, disposition),
        (CONTENT_LENGTH, HeaderValue::from(len)),
    ];
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((headers, body).into_response())
}
