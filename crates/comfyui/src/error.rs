//! Error taxonomy for the ComfyUI client.
//!
//! Every independently-failing step of the pipeline has its own variant
//! so the orchestrator can surface an accurate failure message instead
//! of a generic one.

#[derive(Debug, thiserror::Error)]
pub enum ComfyUIError {
    /// The HTTP request itself failed (network, DNS, TLS, bad body).
    #[error("ComfyUI request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The workflow template is missing a designated node or is not a
    /// node graph at all. Detected at load time.
    #[error("Workflow template invalid: {0}")]
    Template(String),

    /// The upload endpoint answered without the expected server-side
    /// reference name.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// The backend rejected the submitted workflow (structured error
    /// body or missing job token).
    #[error("ComfyUI rejected workflow: {0}")]
    Rejected(String),

    /// The backend reported an execution error for a running workflow.
    /// Carries the backend's own diagnostic messages.
    #[error("ComfyUI workflow failed: {0}")]
    Execution(String),

    /// The history entry contained no image descriptor in the
    /// designated output-save node.
    #[error("No output image in node {node}: {outputs}")]
    MissingOutput { node: String, outputs: String },

    /// The poll deadline elapsed before the workflow produced outputs.
    #[error("Workflow {prompt_id} did not complete within {timeout_secs}s")]
    Timeout { prompt_id: String, timeout_secs: u64 },
}
