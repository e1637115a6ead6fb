use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};

/// Determine the client IP for rate-limit keying.
///
/// Prefers the first hop of X-Forwarded-For (the server is expected to sit
/// behind a reverse proxy in production), falling back to the socket peer
/// address.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Some(first.to_string());
                }
            }
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
