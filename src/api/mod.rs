//! HTTP surface: routing, handler state, and error rendering.

mod admin;
mod auth;
mod error;
mod validation;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};

use crate::auth::{HasAuthState, attach_rotated_tokens};
use crate::db::Database;
use crate::hashing::CredentialHasher;
use crate::jwt::JwtConfig;
use crate::rate_limit::{self, RateLimits};

pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub hasher: CredentialHasher,
}

impl HasAuthState for ApiState {
    fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    fn db(&self) -> &Database {
        &self.db
    }

    fn hasher(&self) -> CredentialHasher {
        self.hasher
    }
}

/// Build the API router. Rate limiting wraps everything; the token-attach
/// middleware wraps every handler so transparent rotations reach the client
/// no matter which route triggered them.
pub fn create_api_router(state: ApiState, limits: RateLimits) -> Router {
    let credential_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(middleware::from_fn_with_state(
            limits.clone(),
            rate_limit::limit_auth,
        ));

    let refresh_routes = Router::new()
        .route("/refresh", post(auth::refresh))
        .layer(middleware::from_fn_with_state(
            limits.clone(),
            rate_limit::limit_refresh,
        ));

    let auth_routes = credential_routes
        .merge(refresh_routes)
        .route("/logout", post(auth::logout));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{uuid}/role", put(admin::set_user_role));

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn(attach_rotated_tokens))
        .layer(middleware::from_fn_with_state(
            limits,
            rate_limit::limit_global,
        ))
        .with_state(state)
}
