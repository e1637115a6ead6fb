//! Per-IP rate limiting.
//!
//! Three keyed limiters with different budgets: a strict one for
//! credential-accepting endpoints (register/login), a moderate one for
//! refresh rotation, and a generous global one covering the whole API.
//! Limits are injected through the server configuration so tests can swap
//! in strict or effectively-unlimited quotas.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use serde_json::json;

use crate::auth::client_ip;

/// A rate limiter keyed by client IP.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// The three limiter tiers, shared across all connections.
#[derive(Clone)]
pub struct RateLimits {
    /// Register/login: 10 requests per 10 minutes per IP
    pub auth: Arc<IpLimiter>,
    /// Refresh rotation: 10 requests per minute per IP
    pub refresh: Arc<IpLimiter>,
    /// Whole API: 100 requests per minute per IP
    pub global: Arc<IpLimiter>,
}

fn keyed(quota: Quota) -> Arc<IpLimiter> {
    Arc::new(RateLimiter::keyed(quota))
}

fn per_minute(n: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN))
}

impl RateLimits {
    /// Production quotas.
    pub fn new() -> Self {
        // 10 per 10 minutes: one replenished cell per minute, burst of 10.
        let auth_quota = Quota::with_period(Duration::from_secs(60))
            .unwrap_or_else(|| per_minute(1))
            .allow_burst(NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN));

        Self {
            auth: keyed(auth_quota),
            refresh: keyed(per_minute(10)),
            global: keyed(per_minute(100)),
        }
    }

    /// Quotas high enough to never trip; for tests exercising other
    /// behavior.
    pub fn generous() -> Self {
        Self {
            auth: keyed(per_minute(100_000)),
            refresh: keyed(per_minute(100_000)),
            global: keyed(per_minute(100_000)),
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new()
    }
}

fn check(limiter: &IpLimiter, request: &Request, message: &str) -> Result<(), Response> {
    // No attributable client, no service.
    let Some(ip) = client_ip(request.headers(), request.extensions()) else {
        return Err((StatusCode::FORBIDDEN, "Client IP could not be determined").into_response());
    };

    if limiter.check_key(&ip).is_err() {
        tracing::warn!(ip = %ip, "Rate limit exceeded");
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "message": message })),
        )
            .into_response());
    }

    Ok(())
}

/// Middleware for register/login.
pub async fn limit_auth(
    State(limits): State<RateLimits>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &limits.auth,
        &request,
        "Too many authentication attempts, please try again later",
    ) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for refresh rotation.
pub async fn limit_refresh(
    State(limits): State<RateLimits>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &limits.refresh,
        &request,
        "Too many token refresh attempts, please try again later",
    ) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for the whole API surface.
pub async fn limit_global(
    State(limits): State<RateLimits>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &limits.global,
        &request,
        "Too many requests, please try again later",
    ) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}
