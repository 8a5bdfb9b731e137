//! The generation backend seam.
//!
//! The orchestrator only ever talks to a [`Generator`]; in production
//! that is [`crate::ComfyUIClient`], in dev mode and tests it is
//! [`crate::MockGenerator`].

use async_trait::async_trait;
use pencilflux_core::job::JobStatus;
use serde_json::Value;

use crate::error::ComfyUIError;

/// Callback invoked with each job-state transition as the pipeline
/// reaches it.
pub type StatusHook<'a> = &'a (dyn Fn(JobStatus) + Send + Sync);

/// Parameters for one generation.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Validated PNG input bytes.
    pub image: Vec<u8>,
    pub prompt: String,
    pub steps: u32,
    pub denoise: f32,
    pub hd: bool,
    /// Explicit seed; when absent the client draws one so the backend
    /// never sees an unseeded (cacheable) graph.
    pub seed: Option<u64>,
}

/// A backend capable of executing one generation end-to-end.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run the full pipeline and return the artifact bytes, reporting
    /// progress through `on_status`.
    async fn generate(
        &self,
        request: GenerateRequest,
        on_status: StatusHook<'_>,
    ) -> Result<Vec<u8>, ComfyUIError>;

    /// Whether the backend is currently reachable.
    async fn health_check(&self) -> bool;

    /// Backend base URL as reported to operators.
    fn backend_url(&self) -> &str;

    /// GPU / VRAM stats, if the backend exposes them.
    async fn system_stats(&self) -> Option<Value>;
}
