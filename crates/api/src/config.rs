use std::time::Duration;

use pencilflux_comfyui::WorkflowNodes;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,

    /// ComfyUI base URL.
    pub comfyui_url: String,
    /// Per-request timeout for backend HTTP calls, in seconds.
    pub comfyui_timeout_secs: u64,
    /// Interval between history polls.
    pub poll_interval: Duration,
    /// Absolute deadline for one generation, counted from submission.
    pub poll_timeout: Duration,
    /// Path to the workflow template JSON.
    pub workflow_template: String,
    /// Designated node ids within the template.
    pub workflow_nodes: WorkflowNodes,
    /// Run against the in-process mock backend instead of ComfyUI.
    pub dev_mode: bool,

    /// SQLite URL for the usage ledger.
    pub database_url: String,
    /// Salt for identity hashing. Override in production.
    pub usage_salt: String,
    /// Free generations per identity per UTC day; `0` disables the cap.
    pub daily_free_limit: i64,

    /// Sliding window for the "generate" rate-limit bucket.
    pub rate_limit_window: Duration,
    /// Accepted requests per identity within the window.
    pub rate_limit_max: usize,

    /// Maximum accepted input image size in bytes.
    pub max_image_size: usize,
    /// Prompt used when neither the caller nor a preset supplies one.
    pub default_prompt: String,
    /// Directory scanned for preset sketch files.
    pub presets_dir: String,
    /// Maximum jobs retained in the in-memory store.
    pub max_jobs: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "127.0.0.1"),
            port: env_parse("PORT", 8000),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:5173")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),

            comfyui_url: env_or("COMFYUI_URL", "http://127.0.0.1:18188"),
            comfyui_timeout_secs: env_parse("COMFYUI_TIMEOUT_SECS", 30),
            poll_interval: Duration::from_millis(env_parse("COMFYUI_POLL_INTERVAL_MS", 1000)),
            poll_timeout: Duration::from_secs(env_parse("COMFYUI_POLL_TIMEOUT_SECS", 120)),
            workflow_template: env_or("WORKFLOW_TEMPLATE", "workflow_template.json"),
            workflow_nodes: workflow_nodes_from_env(),
            dev_mode: env_parse("DEV_MODE", false),

            database_url: env_or("DATABASE_URL", "sqlite:usage.db"),
            usage_salt: env_or("USAGE_SALT", "pencil-flux-dev-salt"),
            daily_free_limit: env_parse("DAILY_FREE_LIMIT", 20),

            rate_limit_window: Duration::from_secs(env_parse("RATE_LIMIT_WINDOW_SECS", 60)),
            rate_limit_max: env_parse("RATE_LIMIT_MAX", 5),

            max_image_size: env_parse("MAX_IMAGE_SIZE", 10 * 1024 * 1024),
            default_prompt: env_or(
                "DEFAULT_PROMPT",
                "a colorful illustration, vibrant colors, detailed shading",
            ),
            presets_dir: env_or("PRESETS_DIR", "presets"),
            max_jobs: env_parse("MAX_JOBS", 50),
        }
    }

    /// Request body ceiling for the router.
    ///
    /// Sketches arrive base64-encoded inside a JSON envelope, so an
    /// image at exactly `max_image_size` needs roughly 4/3 of that on
    /// the wire plus headroom for the remaining fields. The precise
    /// per-image cap is still enforced on the decoded bytes.
    pub fn max_body_size(&self) -> usize {
        self.max_image_size / 3 * 4 + 64 * 1024
    }
}

/// The designated workflow node ids, overridable so an alternate
/// backend graph can be substituted without code changes.
fn workflow_nodes_from_env() -> WorkflowNodes {
    let defaults = WorkflowNodes::default();
    WorkflowNodes {
        image_input: env_or("WORKFLOW_NODE_IMAGE", &defaults.image_input),
        positive_prompt: env_or("WORKFLOW_NODE_PROMPT", &defaults.positive_prompt),
        seed: env_or("WORKFLOW_NODE_SEED", &defaults.seed),
        steps: env_or("WORKFLOW_NODE_STEPS", &defaults.steps),
        output_save: env_or("WORKFLOW_NODE_SAVE", &defaults.output_save),
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable, panicking on malformed
/// values -- misconfiguration should fail fast at startup.
fn env_parse<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{name} is invalid: {e}")),
        Err(_) => default,
    }
}
