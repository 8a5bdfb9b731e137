//! REST wrapper for the ComfyUI HTTP endpoints.
//!
//! Thin [`reqwest`] layer: upload, workflow submission, history
//! polling, artifact download, health and system stats. Interpretation
//! of response bodies (missing fields, backend rejections) happens in
//! [`crate::client::ComfyUIClient`].

use reqwest::multipart;
use serde_json::Value;

use crate::error::ComfyUIError;

/// HTTP client for a single ComfyUI instance.
pub struct ComfyUIApi {
    client: reqwest::Client,
    api_url: String,
}

impl ComfyUIApi {
    /// Create an API client for the given base URL, e.g. `http://host:8188`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (so a per-request timeout can be configured once by the caller).
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// `GET /` -- whether the backend is reachable and answering.
    ///
    /// Transport errors fold into `false`; this is a probe, not a call
    /// that can meaningfully fail.
    pub async fn health_check(&self) -> bool {
        match self.client.get(&self.api_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// `POST /upload/image` -- push input bytes, multipart with an
    /// overwrite flag. Returns the raw response body.
    pub async fn upload_image(
        &self,
        image_bytes: Vec<u8>,
        filename: &str,
    ) -> Result<Value, ComfyUIError> {
        let part = multipart::Part::bytes(image_bytes)
            .file_name(filename.to_string())
            .mime_str("image/png")?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("overwrite", "true");

        let response = self
            .client
            .post(format!("{}/upload/image", self.api_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// `POST /prompt` -- submit a workflow graph for execution.
    ///
    /// The body is returned as-is even on a non-2xx status: ComfyUI
    /// reports structured rejections in the body, and the caller wants
    /// them verbatim.
    pub async fn submit_workflow(&self, workflow: &Value) -> Result<Value, ComfyUIError> {
        let body = serde_json::json!({ "prompt": workflow });

        let response = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .json(&body)
            .send()
            .await?;

        Ok(response.json().await?)
    }

    /// `GET /history/{prompt_id}` -- per-token execution status and,
    /// once available, the outputs map keyed by node id.
    pub async fn get_history(&self, prompt_id: &str) -> Result<Value, ComfyUIError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.api_url, prompt_id))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// `GET /view` -- fetch a rendered artifact by filename/subfolder/type.
    pub async fn view(
        &self,
        filename: &str,
        subfolder: &str,
        file_type: &str,
    ) -> Result<Vec<u8>, ComfyUIError> {
        let response = self
            .client
            .get(format!("{}/view", self.api_url))
            .query(&[
                ("filename", filename),
                ("subfolder", subfolder),
                ("type", file_type),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }

    /// `GET /system_stats` -- GPU / VRAM info.
    pub async fn system_stats(&self) -> Result<Value, ComfyUIError> {
        let response = self
            .client
            .get(format!("{}/system_stats", self.api_url))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}
