//! Handlers for keychain generation.
//!
//! Both endpoints accept a [`GenerationRequest`] and stream the resulting
//! artifact back. `/generate-stl` reports every failure as a 500;
//! `/generate-glb` distinguishes a missing base model (404).

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use keychain_core::generator::{GenerateError, GeneratedStl};
use keychain_core::mesh::convert_to_glb;
use keychain_core::types::GenerationRequest;

use crate::error::{AppError, AppResult};
use crate::handlers::file_response;
use crate::state::AppState;

/// Media type for STL responses.
pub const STL_MEDIA_TYPE: &str = "application/sla";

/// Media type for GLB responses.
pub const GLB_MEDIA_TYPE: &str = "model/gltf-binary";

/// POST /generate-stl
///
/// Return the (possibly cached) STL for the request.
pub async fn generate_stl(
    State(state): State<AppState>,
    Json(req): Json<GenerationRequest>,
) -> AppResult<Response> {
    let generated = run_generation(&state, &req)
        .await
        .map_err(AppError::internal)?;

    file_response(&generated.path, STL_MEDIA_TYPE).await
}

/// POST /generate-glb
///
/// Generate (or reuse) the STL, then convert it to a fresh GLB preview.
pub async fn generate_glb(
    State(state): State<AppState>,
    Json(req): Json<GenerationRequest>,
) -> AppResult<Response> {
    let generated = run_generation(&state, &req).await.map_err(|e| match e {
        GenerateError::BaseModelNotFound(path) => AppError::NotFound(format!(
            "Base model file not found at {}",
            path.display()
        )),
        other => AppError::internal(other),
    })?;

    let preview_dir = state.layout().preview_dir.clone();
    let stl_path = generated.path;
    let glb_path = tokio::task::spawn_blocking(move || convert_to_glb(&stl_path, &preview_dir))
        .await
        .map_err(|e| AppError::InternalError(format!("GLB conversion task failed: {e}")))?
        .map_err(AppError::internal)?;

    file_response(&glb_path, GLB_MEDIA_TYPE).await
}

/// Resolve the requested base model and run the generator.
///
/// A same-named file in the uploads directory takes precedence over the raw
/// value, which the generator then resolves as a path or base-model name.
async fn run_generation(
    state: &AppState,
    req: &GenerationRequest,
) -> Result<GeneratedStl, GenerateError> {
    let base_model = match state.layout().find_upload(&req.base_model).await {
        Some(upload) => upload.to_string_lossy().into_owned(),
        None => req.base_model.clone(),
    };
    tracing::debug!(requested = %req.base_model, resolved = %base_model, "Resolved base model");

    state
        .generator
        .generate(&req.bar_heights, &base_model, req.extrusion_height)
        .await
}
