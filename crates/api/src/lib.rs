//! HTTP surface and orchestration for the generation service.
//!
//! Exposed as a library so integration tests can build the same router
//! (with the same middleware stack) that the binary serves.

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod jobs;
pub mod presets;
pub mod routes;
pub mod state;
