//! Generation submission.
//!
//! Admission (rate limit, daily quota) happens before any job state is
//! created, so a rejected request leaves nothing behind. Input images
//! are validated and normalized to PNG before they ever reach the
//! backend.

use std::io::Cursor;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::Engine;
use pencilflux_comfyui::GenerateRequest;
use pencilflux_core::error::CoreError;
use pencilflux_core::job::{Job, JobStatus};
use pencilflux_core::rate_limit::RateLimit;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::identity::{client_identity, PeerAddr};
use crate::jobs::spawn_generation;
use crate::state::AppState;

/// Rate-limit bucket for generation submissions.
const GENERATE_BUCKET: &str = "generate";

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitGeneration {
    /// Preset id (e.g. `house`) or a base64-encoded image.
    pub sketch: String,
    pub prompt: Option<String>,
    #[serde(default = "default_steps")]
    #[validate(range(min = 1, max = 50))]
    pub steps: u32,
    #[serde(default = "default_denoise")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub denoise: f32,
    #[serde(default)]
    pub hd: bool,
    pub seed: Option<u64>,
}

fn default_steps() -> u32 {
    4
}

fn default_denoise() -> f32 {
    0.75
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub job_id: String,
    pub status: JobStatus,
}

/// POST /api/generate
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    PeerAddr(peer): PeerAddr,
    Json(input): Json<SubmitGeneration>,
) -> AppResult<Json<GenerateResponse>> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let identity = client_identity(&headers, peer, &state.config.usage_salt);

    let limit = RateLimit::new(state.config.rate_limit_window, state.config.rate_limit_max);
    if !state.rate_limiter.allow(GENERATE_BUCKET, &identity, limit) {
        return Err(AppError::Core(CoreError::AdmissionDenied(format!(
            "Rate limited: max {} requests per {}s",
            limit.max_requests,
            limit.window.as_secs(),
        ))));
    }

    if state.config.daily_free_limit > 0 {
        let used_today = state.usage.get_today(&identity).await?;
        if used_today >= state.config.daily_free_limit {
            return Err(AppError::Core(CoreError::AdmissionDenied(format!(
                "Daily limit reached: {} free generations per day",
                state.config.daily_free_limit,
            ))));
        }
    }

    let (image, prompt) = resolve_sketch(&state, &input)?;

    state.usage.record(&identity).await?;

    let job = Job::new();
    let job_id = state.jobs.insert(job);
    tracing::info!(job_id = %job_id, steps = input.steps, "Generation accepted");

    spawn_generation(
        Arc::clone(&state.jobs),
        Arc::clone(&state.generator),
        job_id.clone(),
        GenerateRequest {
            image,
            prompt,
            steps: input.steps,
            denoise: input.denoise,
            hd: input.hd,
            seed: input.seed,
        },
    );

    Ok(Json(GenerateResponse {
        job_id,
        status: JobStatus::Queued,
    }))
}

/// Resolve the `sketch` field into input bytes and an effective prompt.
///
/// A known preset id wins; anything else is treated as a base64 image,
/// size-capped, decoded to prove it is an image, and re-encoded as PNG.
fn resolve_sketch(
    state: &AppState,
    input: &SubmitGeneration,
) -> Result<(Vec<u8>, String), AppError> {
    if let Some(preset) = state.presets.get(&input.sketch) {
        let prompt = input
            .prompt
            .clone()
            .unwrap_or_else(|| preset.default_prompt.to_string());
        return Ok((preset.image_bytes.clone(), prompt));
    }

    let raw = base64::engine::general_purpose::STANDARD
        .decode(&input.sketch)
        .map_err(|_| {
            AppError::Core(CoreError::Validation(
                "sketch must be a preset ID or valid base64".into(),
            ))
        })?;

    if raw.len() > state.config.max_image_size {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Image exceeds {} bytes",
            state.config.max_image_size,
        ))));
    }

    let decoded = image::load_from_memory(&raw)
        .map_err(|_| AppError::Core(CoreError::Validation("Invalid image data".into())))?;
    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| AppError::InternalError(format!("PNG re-encode failed: {e}")))?;

    let prompt = input
        .prompt
        .clone()
        .unwrap_or_else(|| state.config.default_prompt.clone());
    Ok((png, prompt))
}
