use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pencilflux_api::config::ServerConfig;
use pencilflux_api::jobs::JobStore;
use pencilflux_api::presets::PresetCatalog;
use pencilflux_api::routes;
use pencilflux_api::state::AppState;
use pencilflux_comfyui::api::ComfyUIApi;
use pencilflux_comfyui::{ComfyUIClient, Generator, MockGenerator, WorkflowTemplate};
use pencilflux_core::rate_limit::RateLimiter;
use pencilflux_db::usage::UsageTracker;

/// Stage delay for the dev-mode mock backend, roughly matching how a
/// small real generation feels.
const DEV_MODE_STAGE_DELAY: Duration = Duration::from_millis(400);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pencilflux_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, dev_mode = config.dev_mode, "Loaded server configuration");

    // --- Database (usage ledger) ---
    let pool = pencilflux_db::create_pool(&config.database_url)
        .await
        .expect("Failed to open usage database");
    pencilflux_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    pencilflux_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Usage database ready");

    // --- Presets ---
    let presets = Arc::new(PresetCatalog::load(Path::new(&config.presets_dir)));

    // --- Generation backend ---
    let generator: Arc<dyn Generator> = if config.dev_mode {
        tracing::info!("[DEV MODE] Mock backend active, no GPU required");
        Arc::new(MockGenerator::new(DEV_MODE_STAGE_DELAY))
    } else {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.comfyui_timeout_secs))
            .build()
            .expect("Failed to build HTTP client");
        let template = WorkflowTemplate::load(
            Path::new(&config.workflow_template),
            config.workflow_nodes.clone(),
        )
        .expect("Failed to load workflow template");
        Arc::new(ComfyUIClient::new(
            ComfyUIApi::with_client(http, config.comfyui_url.clone()),
            template,
            config.poll_interval,
            config.poll_timeout,
        ))
    };

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- App state ---
    let state = AppState {
        jobs: Arc::new(JobStore::new(config.max_jobs)),
        rate_limiter: Arc::new(RateLimiter::new()),
        usage: UsageTracker::new(pool),
        generator,
        presets,
        config: Arc::new(config.clone()),
    };

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        .nest("/api", routes::api_routes())
        // -- Middleware stack (applied bottom-up) --
        .layer(DefaultBodyLimit::max(config.max_body_size()))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup on an invalid configured origin -- we want
/// misconfiguration to fail fast.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
