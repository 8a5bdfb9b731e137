//! Background generation orchestrator.
//!
//! One spawned task per accepted request drives the backend pipeline
//! and reflects its progress onto the job record. Every failure is
//! converted into a terminal `failed` state with a human-readable
//! message -- nothing escapes as an unhandled fault. Cancellation is
//! cooperative: the store discards a result that arrives after the job
//! was cancelled.

use std::sync::Arc;

use pencilflux_comfyui::{GenerateRequest, Generator};

use crate::jobs::JobStore;

/// Launch the generation for an already-registered job.
pub fn spawn_generation(
    jobs: Arc<JobStore>,
    generator: Arc<dyn Generator>,
    job_id: String,
    request: GenerateRequest,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let hook_jobs = Arc::clone(&jobs);
        let hook_id = job_id.clone();

        // The pipeline runs in its own task so that even a panic inside
        // the generator surfaces as a failed job, not a stuck one.
        let pipeline = tokio::spawn({
            let request_id = job_id.clone();
            async move {
                let on_status = move |status| {
                    hook_jobs.advance(&hook_id, status);
                };
                tracing::info!(job_id = %request_id, "Generation started");
                generator.generate(request, &on_status).await
            }
        });

        match pipeline.await {
            Ok(Ok(artifact)) => {
                if jobs.complete(&job_id, artifact) {
                    tracing::info!(job_id = %job_id, "Generation completed");
                } else {
                    // The job reached a terminal state (cancel) first.
                    tracing::info!(job_id = %job_id, "Discarding result for terminal job");
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(job_id = %job_id, error = %e, "Generation failed");
                jobs.fail(&job_id, e.to_string());
            }
            Err(join_err) => {
                tracing::error!(job_id = %job_id, error = %join_err, "Generation task panicked");
                jobs.fail(&job_id, format!("Unexpected error: {join_err}"));
            }
        }
    })
}
