//! Job status, cancellation, and result retrieval.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use pencilflux_core::error::CoreError;
use pencilflux_core::job::JobStatus;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::jobs::JobSnapshot;
use crate::state::AppState;

fn not_found(id: String) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Job", id })
}

/// GET /api/status/{job_id}
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<JobSnapshot>> {
    let snapshot = state.jobs.snapshot(&job_id).ok_or_else(|| not_found(job_id))?;
    Ok(Json(snapshot))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: String,
    pub status: JobStatus,
}

/// POST /api/cancel/{job_id}
///
/// Cancel-wins: a running generation keeps going backend-side, but its
/// eventual result will be discarded. Cancelling a terminal job is a
/// no-op that reports the existing state.
pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<CancelResponse>> {
    let status = state.jobs.cancel(&job_id).ok_or_else(|| not_found(job_id.clone()))?;
    if status == JobStatus::Cancelled {
        tracing::info!(job_id = %job_id, "Job cancelled");
    }
    Ok(Json(CancelResponse { job_id, status }))
}

/// GET /api/result/{job_id}
///
/// The artifact is only served for a `completed` job; asking earlier is
/// a conflict, not an error in the job itself.
pub async fn result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (status, artifact) = state
        .jobs
        .result(&job_id)
        .ok_or_else(|| not_found(job_id.clone()))?;

    match artifact {
        Some(bytes) if status == JobStatus::Completed => {
            Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
        }
        _ => Err(AppError::Core(CoreError::Conflict(format!(
            "Job not completed (status: {status})",
        )))),
    }
}
