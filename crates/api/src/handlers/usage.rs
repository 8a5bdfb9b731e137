//! Usage accounting endpoints.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::identity::{client_identity, PeerAddr};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub today: i64,
    pub total: i64,
    pub daily_limit: i64,
    /// Remaining free generations today; `-1` when unlimited.
    pub remaining: i64,
    pub global_today: i64,
    pub global_total: i64,
    pub unique_users_today: i64,
}

/// GET /api/usage
pub async fn usage(
    State(state): State<AppState>,
    headers: HeaderMap,
    PeerAddr(peer): PeerAddr,
) -> AppResult<Json<UsageResponse>> {
    let identity = client_identity(&headers, peer, &state.config.usage_salt);
    let today = state.usage.get_today(&identity).await?;
    let limit = state.config.daily_free_limit;
    let remaining = if limit > 0 { (limit - today).max(0) } else { -1 };

    Ok(Json(UsageResponse {
        today,
        total: state.usage.get_total(&identity).await?,
        daily_limit: limit,
        remaining,
        global_today: state.usage.get_global_today().await?,
        global_total: state.usage.get_global_total().await?,
        unique_users_today: state.usage.get_unique_today().await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct UsageStatsResponse {
    pub global_today: i64,
    pub global_total: i64,
    pub unique_users_today: i64,
}

/// GET /api/usage/stats
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<UsageStatsResponse>> {
    Ok(Json(UsageStatsResponse {
        global_today: state.usage.get_global_today().await?,
        global_total: state.usage.get_global_total().await?,
        unique_users_today: state.usage.get_unique_today().await?,
    }))
}
