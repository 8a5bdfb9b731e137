//! Domain logic for the generation service.
//!
//! Pure types and algorithms with no I/O: the job lifecycle state
//! machine, sliding-window rate limiting, and identity hashing.
//! Everything here is exercised by the `api` crate; nothing depends on
//! tokio, the database, or the HTTP stack.

pub mod error;
pub mod identity;
pub mod job;
pub mod rate_limit;
