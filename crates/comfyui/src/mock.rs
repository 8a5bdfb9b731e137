//! Deterministic in-process generation backend.
//!
//! Used in dev mode (no GPU required) and by integration tests. The
//! same request with the same explicit seed always yields byte-identical
//! output, which is what the end-to-end determinism tests rely on.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use pencilflux_core::job::JobStatus;
use serde_json::Value;

use crate::error::ComfyUIError;
use crate::generator::{GenerateRequest, Generator, StatusHook};
use crate::workflow::random_seed;

/// Edge length of the generated square image.
const MOCK_IMAGE_SIZE: u32 = 64;

/// Simulates the real pipeline with short stage delays.
pub struct MockGenerator {
    stage_delay: Duration,
}

impl MockGenerator {
    /// `stage_delay` is slept once per pipeline stage, so a full
    /// generation takes roughly four times this long.
    pub fn new(stage_delay: Duration) -> Self {
        Self { stage_delay }
    }

    /// Fold the request parameters into a single deterministic value.
    fn digest(request: &GenerateRequest, seed: u64) -> u64 {
        let mut acc = seed ^ 0x9e37_79b9_7f4a_7c15;
        for byte in request.prompt.bytes() {
            acc = acc.rotate_left(5) ^ u64::from(byte);
        }
        acc = acc.wrapping_mul(u64::from(request.steps) | 1);
        acc ^= u64::from((request.denoise * 1000.0) as u32);
        if request.hd {
            acc = acc.rotate_left(17);
        }
        acc
    }

    /// Render a small gradient PNG derived from the digest.
    fn render(digest: u64) -> Result<Vec<u8>, ComfyUIError> {
        let base = [
            (digest & 0xff) as u8,
            ((digest >> 8) & 0xff) as u8,
            ((digest >> 16) & 0xff) as u8,
        ];
        let img = RgbImage::from_fn(MOCK_IMAGE_SIZE, MOCK_IMAGE_SIZE, |x, y| {
            Rgb([
                base[0].wrapping_add((x * 2) as u8),
                base[1].wrapping_add((y * 2) as u8),
                base[2].wrapping_add((x + y) as u8),
            ])
        });

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| ComfyUIError::Execution(format!("mock render failed: {e}")))?;
        Ok(bytes)
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(
        &self,
        request: GenerateRequest,
        on_status: StatusHook<'_>,
    ) -> Result<Vec<u8>, ComfyUIError> {
        for status in [
            JobStatus::Uploading,
            JobStatus::Submitted,
            JobStatus::Processing,
            JobStatus::Downloading,
        ] {
            on_status(status);
            tokio::time::sleep(self.stage_delay).await;
        }

        let seed = request.seed.unwrap_or_else(random_seed);
        Self::render(Self::digest(&request, seed))
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_url(&self) -> &str {
        "mock://dev-mode"
    }

    async fn system_stats(&self) -> Option<Value> {
        let vram_total: u64 = 24 * 1024 * 1024 * 1024;
        let vram_used: u64 = 8 * 1024 * 1024 * 1024;
        Some(serde_json::json!({
            "devices": [{
                "name": "Dev Mode (Mock GPU)",
                "vram_total": vram_total,
                "vram_free": vram_total - vram_used,
                "torch_vram_total": vram_total,
                "torch_vram_free": vram_total - vram_used,
            }]
        }))
    }
}
