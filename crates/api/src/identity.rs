//! Caller identity resolution.
//!
//! The client address is resolved once per request from proxy headers,
//! falling back to the socket peer, and immediately hashed; raw
//! addresses never reach the rate limiter or the usage ledger.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use pencilflux_core::identity::hash_identity;

/// Socket peer address of the connection, when known.
///
/// Populated only when the server is driven through
/// `into_make_service_with_connect_info`; absent (for example, when the
/// router is called as a plain service) it resolves to `None` rather
/// than rejecting the request.
#[derive(Debug, Clone, Copy)]
pub struct PeerAddr(pub Option<SocketAddr>);

impl<S: Send + Sync> FromRequestParts<S> for PeerAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

/// Extract the client address.
///
/// `x-real-ip` wins, then the first entry of `x-forwarded-for` (set by
/// a reverse proxy in front of the service), then the socket peer for
/// direct connections. `"unknown"` is the last resort when none of
/// those are available.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return ip.trim().to_string();
    }
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = xff.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

/// Resolve and hash the caller identity in one step.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>, salt: &str) -> String {
    hash_identity(&client_address(headers, peer), salt)
}
