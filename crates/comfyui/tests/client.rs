//! Integration tests for the ComfyUI client pipeline against a stub
//! backend server bound to an ephemeral local port.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use pencilflux_comfyui::api::ComfyUIApi;
use pencilflux_comfyui::{
    ComfyUIClient, ComfyUIError, GenerateRequest, Generator, WorkflowNodes, WorkflowTemplate,
};
use pencilflux_core::job::JobStatus;

// ---------------------------------------------------------------------------
// Stub server plumbing
// ---------------------------------------------------------------------------

/// Bind the router on an ephemeral port and return its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn template() -> WorkflowTemplate {
    WorkflowTemplate::from_value(
        json!({
            "1": {"class_type": "LoadImage", "inputs": {"image": ""}},
            "6": {"class_type": "CLIPTextEncode", "inputs": {"text": ""}},
            "8": {"class_type": "RandomNoise", "inputs": {"noise_seed": 0}},
            "10": {"class_type": "Scheduler", "inputs": {"steps": 1}},
            "14": {"class_type": "SaveImage", "inputs": {"filename_prefix": "x"}},
        }),
        WorkflowNodes::default(),
    )
    .unwrap()
}

fn client(base_url: String) -> ComfyUIClient {
    ComfyUIClient::new(
        ComfyUIApi::new(base_url),
        template(),
        Duration::from_millis(10),
        Duration::from_millis(500),
    )
}

fn request() -> GenerateRequest {
    GenerateRequest {
        image: vec![0x89, 0x50, 0x4e, 0x47],
        prompt: "a pencil sketch of a llama".into(),
        steps: 4,
        denoise: 0.75,
        hd: false,
        seed: Some(42),
    }
}

/// Routes shared by every scenario: upload and submit succeed.
/// Generic over the router state so scenarios can attach their own.
fn base_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new()
        .route(
            "/upload/image",
            post(|| async { Json(json!({"name": "stub_input.png"})) }),
        )
        .route(
            "/prompt",
            post(|| async { Json(json!({"prompt_id": "p-1"})) }),
        )
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_happy_path_downloads_artifact() {
    // First history poll returns an empty map (still queued), the
    // second returns outputs.
    let polls = Arc::new(AtomicUsize::new(0));
    let router = base_router()
        .route(
            "/history/{id}",
            get(
                |State(polls): State<Arc<AtomicUsize>>| async move {
                    if polls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Json(json!({}))
                    } else {
                        Json(json!({
                            "p-1": {
                                "status": {"status_str": "success", "completed": true},
                                "outputs": {
                                    "14": {"images": [
                                        {"filename": "pencil_flux_00001_.png",
                                         "subfolder": "", "type": "output"}
                                    ]}
                                }
                            }
                        }))
                    }
                },
            ),
        )
        .route("/view", get(|| async { vec![1u8, 2, 3, 4] }))
        .with_state(polls);

    let client = client(serve(router).await);
    let seen = Mutex::new(Vec::new());
    let hook = |s: JobStatus| seen.lock().unwrap().push(s);

    let bytes = client.generate(request(), &hook).await.unwrap();
    assert_eq!(bytes, vec![1, 2, 3, 4]);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            JobStatus::Uploading,
            JobStatus::Submitted,
            JobStatus::Processing,
            JobStatus::Downloading,
        ],
    );
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_response_without_name_fails() {
    let router = Router::new().route("/upload/image", post(|| async { Json(json!({})) }));
    let client = client(serve(router).await);

    let err = client.generate(request(), &|_| {}).await.unwrap_err();
    assert_matches!(err, ComfyUIError::Upload(_));
}

#[tokio::test]
async fn submit_rejection_surfaces_backend_error() {
    let router = Router::new()
        .route(
            "/upload/image",
            post(|| async { Json(json!({"name": "stub_input.png"})) }),
        )
        .route(
            "/prompt",
            post(|| async {
                Json(json!({"error": {"type": "invalid_prompt", "message": "bad node"}}))
            }),
        );
    let client = client(serve(router).await);

    let err = client.generate(request(), &|_| {}).await.unwrap_err();
    assert_matches!(err, ComfyUIError::Rejected(msg) if msg.contains("invalid_prompt"));
}

#[tokio::test]
async fn execution_error_surfaces_backend_messages() {
    let router = base_router().route(
        "/history/{id}",
        get(|| async {
            Json(json!({
                "p-1": {
                    "status": {
                        "status_str": "error",
                        "messages": [["execution_error", {"node_id": "3", "exception_message": "OOM"}]]
                    },
                    "outputs": {}
                }
            }))
        }),
    );
    let client = client(serve(router).await);

    let err = client.generate(request(), &|_| {}).await.unwrap_err();
    assert_matches!(err, ComfyUIError::Execution(msg) if msg.contains("OOM"));
}

#[tokio::test]
async fn missing_output_image_fails() {
    let router = base_router().route(
        "/history/{id}",
        get(|| async {
            Json(json!({
                "p-1": {
                    "status": {"status_str": "success"},
                    "outputs": {"14": {"images": []}}
                }
            }))
        }),
    );
    let client = client(serve(router).await);

    let err = client.generate(request(), &|_| {}).await.unwrap_err();
    assert_matches!(err, ComfyUIError::MissingOutput { node, .. } if node == "14");
}

#[tokio::test]
async fn poll_deadline_elapsing_times_out() {
    // History never knows the prompt.
    let router = base_router().route("/history/{id}", get(|| async { Json(json!({})) }));
    let client = client(serve(router).await);

    let err = client.generate(request(), &|_| {}).await.unwrap_err();
    assert_matches!(err, ComfyUIError::Timeout { prompt_id, .. } if prompt_id == "p-1");
}

#[tokio::test]
async fn unreachable_backend_is_a_request_error() {
    // Nothing listens on this port.
    let client = client("http://127.0.0.1:9".to_string());

    let err = client.generate(request(), &|_| {}).await.unwrap_err();
    assert_matches!(err, ComfyUIError::Request(_));
}

// ---------------------------------------------------------------------------
// Submitted workflow content
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submitted_graph_carries_patched_parameters() {
    let captured: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let router = Router::new()
        .route(
            "/upload/image",
            post(|| async { Json(json!({"name": "stub_input.png"})) }),
        )
        .route(
            "/prompt",
            post(
                |State(captured): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                    *captured.lock().unwrap() = Some(body);
                    Json(json!({"prompt_id": "p-1"}))
                },
            ),
        )
        .route(
            "/history/{id}",
            get(|| async {
                Json(json!({
                    "p-1": {
                        "status": {"status_str": "success"},
                        "outputs": {"14": {"images": [
                            {"filename": "out.png", "subfolder": "", "type": "output"}
                        ]}}
                    }
                }))
            }),
        )
        .route("/view", get(|| async { vec![9u8] }))
        .with_state(Arc::clone(&captured));

    let client = client(serve(router).await);
    client.generate(request(), &|_| {}).await.unwrap();

    let body = captured.lock().unwrap().take().unwrap();
    let graph = &body["prompt"];
    assert_eq!(graph["1"]["inputs"]["image"], "stub_input.png");
    assert_eq!(graph["6"]["inputs"]["text"], "a pencil sketch of a llama");
    assert_eq!(graph["8"]["inputs"]["noise_seed"], 42);
    assert_eq!(graph["10"]["inputs"]["steps"], 4);
}
