//! Preset sketch endpoints.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use pencilflux_core::error::CoreError;

use crate::error::{AppError, AppResult};
use crate::presets::PresetInfo;
use crate::state::AppState;

/// GET /api/sketches
pub async fn list(State(state): State<AppState>) -> Json<Vec<PresetInfo>> {
    Json(state.presets.list())
}

/// GET /api/sketches/{sketch_id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(sketch_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let preset = state
        .presets
        .get(&sketch_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Sketch",
            id: sketch_id,
        }))?;

    Ok((
        [(header::CONTENT_TYPE, "image/png")],
        preset.image_bytes.clone(),
    ))
}
