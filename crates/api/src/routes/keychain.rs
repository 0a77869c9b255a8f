//! Keychain generation and upload routes.
//!
//! ```text
//! POST /generate-stl        generate (or reuse) an STL
//! POST /generate-glb        generate an STL and convert it to a GLB preview
//! POST /upload-base-model   store a STEP base model, returns its name
//! ```

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use keychain_core::upload::MAX_UPLOAD_BYTES;

use crate::handlers::{generate, upload};
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself,
/// so a slightly oversized file still reaches the handler's size check.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-stl", post(generate::generate_stl))
        .route("/generate-glb", post(generate::generate_glb))
        .route(
            "/upload-base-model",
            post(upload::upload_base_model).layer(DefaultBodyLimit::max(
                MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES,
            )),
        )
}
