//! ComfyUI REST client library.
//!
//! Executes one image generation end-to-end against a ComfyUI server:
//! input upload, workflow materialization from a template, submission,
//! completion polling, and artifact download. The [`generator::Generator`]
//! trait is the seam consumed by the orchestrator; [`mock::MockGenerator`]
//! implements it without a GPU for dev mode and tests.

pub mod api;
pub mod client;
pub mod error;
pub mod generator;
pub mod mock;
pub mod workflow;

pub use client::ComfyUIClient;
pub use error::ComfyUIError;
pub use generator::{GenerateRequest, Generator, StatusHook};
pub use mock::MockGenerator;
pub use workflow::{WorkflowNodes, WorkflowTemplate};
