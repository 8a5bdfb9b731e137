//! Health and public-config endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub comfyui_reachable: bool,
    pub comfyui_url: String,
}

/// GET /api/health
///
/// Probes the rendering backend; never errors, unreachability is data.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = state.generator.health_check().await;
    Json(HealthResponse {
        comfyui_reachable: reachable,
        comfyui_url: state.generator.backend_url().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub dev_mode: bool,
    pub daily_free_limit: i64,
}

/// GET /api/config
///
/// The subset of configuration the frontend is allowed to see.
pub async fn config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        dev_mode: state.config.dev_mode,
        daily_free_limit: state.config.daily_free_limit,
    })
}
