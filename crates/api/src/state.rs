use std::sync::Arc;

use pencilflux_comfyui::Generator;
use pencilflux_core::rate_limit::RateLimiter;
use pencilflux_db::usage::UsageTracker;

use crate::config::ServerConfig;
use crate::jobs::JobStore;
use crate::presets::PresetCatalog;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`). Nothing here is a process-wide global: handlers and the
/// orchestrator receive everything through this struct.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Durable usage ledger.
    pub usage: UsageTracker,
    /// In-memory registry of generation jobs.
    pub jobs: Arc<JobStore>,
    /// Sliding-window admission control.
    pub rate_limiter: Arc<RateLimiter>,
    /// Generation backend (real ComfyUI client or the dev-mode mock).
    pub generator: Arc<dyn Generator>,
    /// Preset sketches loaded at startup.
    pub presets: Arc<PresetCatalog>,
}
