pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod hashing;
pub mod jwt;
pub mod rate_limit;
pub mod refresh;
pub mod server_config;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get};
use serde_json::json;
use tokio::net::TcpListener;

use api::{ApiState, create_api_router};
use auth::CookiePolicy;
use db::Database;
use hashing::CredentialHasher;
use jwt::JwtConfig;
use rate_limit::RateLimits;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing access tokens
    pub jwt_secret: Vec<u8>,
    /// Bcrypt cost factor for credential hashing
    pub bcrypt_cost: u32,
    /// Access token lifetime in seconds
    pub access_token_secs: u64,
    /// Whether to set Secure flag on cookies (true in production with HTTPS)
    pub secure_cookies: bool,
    /// Whether the frontend is served from a different site
    pub cross_site_cookies: bool,
    /// Rate limiter tiers (swap in `RateLimits::generous()` for tests)
    pub rate_limits: RateLimits,
}

async fn health() -> &'static str {
    "OK"
}

/// Upper bound on any single request, so a stalled database or a wedged
/// blocking task cannot hold a connection open indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

async fn timeout_with(limit: Duration, request: Request, next: Next) -> Response {
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!("Request timed out");
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(json!({ "message": "Request timeout" })),
            )
                .into_response()
        }
    }
}

async fn enforce_timeout(request: Request, next: Next) -> Response {
    timeout_with(REQUEST_TIMEOUT, request, next).await
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    server_config::init(CookiePolicy {
        secure: config.secure_cookies,
        cross_site: config.cross_site_cookies,
    });

    let state = ApiState {
        db: config.db.clone(),
        jwt: Arc::new(JwtConfig::with_lifetime(
            &config.jwt_secret,
            config.access_token_secs,
        )),
        hasher: CredentialHasher::new(config.bcrypt_cost),
    };

    Router::new()
        .route("/health", get(health))
        .merge(create_api_router(state, config.rate_limits.clone()))
        .layer(middleware::from_fn(enforce_timeout))
}


/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
