use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keychain_core::upload::UploadError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Renders as `{"detail": <message>, "code": <CODE>}`. Internal errors carry
/// the underlying message verbatim; the browser client shows it to the user.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A referenced file does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A bad request with a human-readable message.
    #[error("{0}")]
    BadRequest(String),

    /// The request body exceeds an accepted size.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// A rejected STEP upload.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Anything else that went wrong while serving the request.
    #[error("{0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Wrap any displayable error as a 500.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::InternalError(err.to_string())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            AppError::Upload(upload) => match upload {
                UploadError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
                UploadError::InvalidExtension | UploadError::InvalidContent => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST")
                }
                UploadError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            AppError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %message, "Request rejected");
        }

        let body = json!({
            "detail": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
