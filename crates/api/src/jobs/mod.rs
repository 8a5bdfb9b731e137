//! In-memory job registry and the background generation orchestrator.

mod runner;
mod store;

pub use runner::spawn_generation;
pub use store::{JobSnapshot, JobStore};
