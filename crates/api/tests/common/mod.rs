use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;

use pencilflux_api::config::ServerConfig;
use pencilflux_api::jobs::JobStore;
use pencilflux_api::presets::PresetCatalog;
use pencilflux_api::routes;
use pencilflux_api::state::AppState;
use pencilflux_comfyui::{MockGenerator, WorkflowNodes};
use pencilflux_core::rate_limit::RateLimiter;
use pencilflux_db::usage::UsageTracker;

/// Build a test `ServerConfig` with safe defaults: generous rate limit,
/// no daily cap, dev mode.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        comfyui_url: "mock://dev-mode".to_string(),
        comfyui_timeout_secs: 5,
        poll_interval: Duration::from_millis(10),
        poll_timeout: Duration::from_secs(5),
        workflow_template: "workflow_template.json".to_string(),
        workflow_nodes: WorkflowNodes::default(),
        dev_mode: true,
        database_url: "sqlite::memory:".to_string(),
        usage_salt: "test-salt".to_string(),
        daily_free_limit: 0,
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 1000,
        max_image_size: 10 * 1024 * 1024,
        default_prompt: "a colorful illustration".to_string(),
        presets_dir: "/nonexistent".to_string(),
        max_jobs: 50,
    }
}

/// Build the application router with the full middleware stack and the
/// mock backend, mirroring the construction in `main.rs`.
pub fn build_test_app(pool: SqlitePool, config: ServerConfig, stage_delay: Duration) -> Router {
    let state = AppState {
        jobs: Arc::new(JobStore::new(config.max_jobs)),
        rate_limiter: Arc::new(RateLimiter::new()),
        usage: UsageTracker::new(pool),
        generator: Arc::new(MockGenerator::new(stage_delay)),
        presets: Arc::new(PresetCatalog::load(std::path::Path::new(&config.presets_dir))),
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");
    let max_body_size = state.config.max_body_size();

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

pub async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get_with_ip(app: &Router, uri: &str, ip: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("x-real-ip", ip)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_json_with_ip(app: &Router, uri: &str, body: Value, ip: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .header("x-real-ip", ip)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// POST carrying a socket peer (as `axum::serve` with connect-info
/// would) and no proxy headers.
pub async fn post_json_with_peer(app: &Router, uri: &str, body: Value, peer: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Poll the status endpoint until the job reaches a terminal state.
pub async fn wait_for_terminal(app: &Router, job_id: &str) -> Value {
    for _ in 0..250 {
        let response = get(app, &format!("/api/status/{job_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let status = json["status"].as_str().unwrap().to_string();
        if ["completed", "failed", "cancelled"].contains(&status.as_str()) {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} did not reach a terminal state in time");
}
