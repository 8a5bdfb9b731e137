//! End-to-end generation pipeline against a ComfyUI server.
//!
//! upload -> materialize -> submit -> poll -> download, with a status
//! hook fired at each stage transition. Polling enforces an absolute
//! wall-clock deadline from submission, independent of the per-request
//! timeout on each HTTP call.

use std::time::Duration;

use async_trait::async_trait;
use pencilflux_core::job::JobStatus;
use serde_json::Value;

use crate::api::ComfyUIApi;
use crate::error::ComfyUIError;
use crate::generator::{GenerateRequest, Generator, StatusHook};
use crate::workflow::{random_seed, WorkflowTemplate};

/// Server-side filename used for every uploaded input (overwrite mode).
const INPUT_FILENAME: &str = "pencil_input.png";

/// Executes generations against one ComfyUI instance.
pub struct ComfyUIClient {
    api: ComfyUIApi,
    template: WorkflowTemplate,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl ComfyUIClient {
    pub fn new(
        api: ComfyUIApi,
        template: WorkflowTemplate,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            api,
            template,
            poll_interval,
            poll_timeout,
        }
    }

    /// Upload input bytes, returning the server-side reference name.
    async fn upload(&self, image_bytes: Vec<u8>) -> Result<String, ComfyUIError> {
        let body = self.api.upload_image(image_bytes, INPUT_FILENAME).await?;
        match body.get("name").and_then(Value::as_str) {
            Some(name) => Ok(name.to_string()),
            None => Err(ComfyUIError::Upload(format!(
                "response missing 'name': {body}"
            ))),
        }
    }

    /// Submit a materialized graph, returning the backend job token.
    async fn submit(&self, workflow: &Value) -> Result<String, ComfyUIError> {
        let body = self.api.submit_workflow(workflow).await?;
        if let Some(error) = body.get("error") {
            return Err(ComfyUIError::Rejected(
                serde_json::to_string_pretty(error).unwrap_or_else(|_| error.to_string()),
            ));
        }
        match body.get("prompt_id").and_then(Value::as_str) {
            Some(id) => Ok(id.to_string()),
            None => Err(ComfyUIError::Rejected(format!(
                "unexpected response from /prompt: {body}"
            ))),
        }
    }

    /// Poll the history endpoint until outputs appear, the backend
    /// reports an execution error, or the deadline elapses.
    async fn poll_for_completion(&self, prompt_id: &str) -> Result<Value, ComfyUIError> {
        let deadline = tokio::time::Instant::now() + self.poll_timeout;

        while tokio::time::Instant::now() < deadline {
            let history = self.api.get_history(prompt_id).await?;
            if let Some(entry) = history.get(prompt_id) {
                let status = entry.get("status").cloned().unwrap_or(Value::Null);
                if status.get("status_str").and_then(Value::as_str) == Some("error") {
                    let messages = status.get("messages").cloned().unwrap_or(Value::Null);
                    return Err(ComfyUIError::Execution(
                        serde_json::to_string_pretty(&messages)
                            .unwrap_or_else(|_| messages.to_string()),
                    ));
                }
                if let Some(outputs) = entry.get("outputs") {
                    if outputs.as_object().is_some_and(|o| !o.is_empty()) {
                        return Ok(outputs.clone());
                    }
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(ComfyUIError::Timeout {
            prompt_id: prompt_id.to_string(),
            timeout_secs: self.poll_timeout.as_secs(),
        })
    }

    /// Locate the output-save node's first image descriptor and fetch
    /// the raw artifact.
    async fn download_output(&self, outputs: &Value) -> Result<Vec<u8>, ComfyUIError> {
        let save_node = &self.template.nodes().output_save;
        let image = outputs
            .get(save_node)
            .and_then(|n| n.get("images"))
            .and_then(Value::as_array)
            .and_then(|images| images.first());

        let Some(image) = image else {
            return Err(ComfyUIError::MissingOutput {
                node: save_node.clone(),
                outputs: outputs.to_string(),
            });
        };

        let filename = image
            .get("filename")
            .and_then(Value::as_str)
            .ok_or_else(|| ComfyUIError::MissingOutput {
                node: save_node.clone(),
                outputs: outputs.to_string(),
            })?;
        let subfolder = image.get("subfolder").and_then(Value::as_str).unwrap_or("");
        let file_type = image.get("type").and_then(Value::as_str).unwrap_or("output");

        self.api.view(filename, subfolder, file_type).await
    }
}

#[async_trait]
impl Generator for ComfyUIClient {
    async fn generate(
        &self,
        request: GenerateRequest,
        on_status: StatusHook<'_>,
    ) -> Result<Vec<u8>, ComfyUIError> {
        on_status(JobStatus::Uploading);
        let filename = self.upload(request.image).await?;

        on_status(JobStatus::Submitted);
        let seed = request.seed.unwrap_or_else(random_seed);
        let workflow = self
            .template
            .materialize(&filename, &request.prompt, request.steps, seed);
        let prompt_id = self.submit(&workflow).await?;
        tracing::debug!(%prompt_id, seed, steps = request.steps, "Workflow submitted");

        on_status(JobStatus::Processing);
        let outputs = self.poll_for_completion(&prompt_id).await?;

        on_status(JobStatus::Downloading);
        self.download_output(&outputs).await
    }

    async fn health_check(&self) -> bool {
        self.api.health_check().await
    }

    fn backend_url(&self) -> &str {
        self.api.api_url()
    }

    async fn system_stats(&self) -> Option<Value> {
        self.api.system_stats().await.ok()
    }
}
