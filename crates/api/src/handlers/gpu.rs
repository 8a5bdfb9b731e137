//! GPU / queue visibility endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GpuStatsResponse {
    pub gpu_name: String,
    pub vram_total: u64,
    pub vram_free: u64,
    pub torch_vram_total: u64,
    pub torch_vram_free: u64,
    pub active_jobs: usize,
}

/// GET /api/gpu
///
/// Summarizes the backend's `/system_stats` plus the local active-job
/// count. An unreachable backend yields zeros, not an error -- this
/// endpoint backs a dashboard widget.
pub async fn stats(State(state): State<AppState>) -> Json<GpuStatsResponse> {
    let active_jobs = state.jobs.active_count();

    let device = state
        .generator
        .system_stats()
        .await
        .and_then(|stats| stats.get("devices").and_then(|d| d.get(0)).cloned());

    let response = match device {
        Some(gpu) => GpuStatsResponse {
            gpu_name: gpu
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            vram_total: u64_field(&gpu, "vram_total"),
            vram_free: u64_field(&gpu, "vram_free"),
            torch_vram_total: u64_field(&gpu, "torch_vram_total"),
            torch_vram_free: u64_field(&gpu, "torch_vram_free"),
            active_jobs,
        },
        None => GpuStatsResponse {
            gpu_name: "Unavailable".to_string(),
            vram_total: 0,
            vram_free: 0,
            torch_vram_total: 0,
            torch_vram_free: 0,
            active_jobs,
        },
    };

    Json(response)
}

fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}
