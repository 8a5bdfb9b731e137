//! Route tree for the `/api` prefix.
//!
//! ```text
//! GET  /health              backend reachability
//! GET  /config              public config snapshot
//! GET  /sketches            preset listing
//! GET  /sketches/{id}       preset PNG
//! POST /generate            submit a generation
//! GET  /status/{job_id}     job status snapshot
//! POST /cancel/{job_id}     cooperative cancel
//! GET  /result/{job_id}     artifact (409 until completed)
//! GET  /usage               caller + global usage counters
//! GET  /usage/stats         global usage counters
//! GET  /gpu                 backend GPU stats + active job count
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{generate, gpu, health, jobs, sketches, usage};
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/config", get(health::config))
        .route("/sketches", get(sketches::list))
        .route("/sketches/{sketch_id}", get(sketches::get_one))
        .route("/generate", post(generate::generate))
        .route("/status/{job_id}", get(jobs::status))
        .route("/cancel/{job_id}", post(jobs::cancel))
        .route("/result/{job_id}", get(jobs::result))
        .route("/usage", get(usage::usage))
        .route("/usage/stats", get(usage::stats))
        .route("/gpu", get(gpu::stats))
}
