use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::server_config;
use crate::session::RotationError;

/// Handler-level errors, rendered as `{"message": ...}` JSON.
///
/// Internal failures carry no client-visible detail; the cause is logged at
/// the conversion site.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    /// A presented refresh secret was missing or refused; distinct from
    /// plain `Unauthorized` because this one also clears the refresh cookie
    /// (a failed login must not wipe a live session's cookie).
    RefreshRejected(String),
    Forbidden(String),
    NotFound(String),
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::RefreshRejected(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::RefreshRejected(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m) => m,
            ApiError::Internal => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let clears_cookie = matches!(self, ApiError::RefreshRejected(_));
        let mut response =
            (self.status(), Json(json!({ "message": self.message() }))).into_response();

        if clears_cookie {
            let clear = server_config::cookie_policy().clear_refresh_cookie();
            if let Ok(value) = header::HeaderValue::from_str(&clear) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }

        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        ApiError::Internal
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(e: bcrypt::BcryptError) -> Self {
        tracing::error!(error = %e, "Hashing error");
        ApiError::Internal
    }
}

impl From<crate::jwt::AccessTokenError> for ApiError {
    fn from(e: crate::jwt::AccessTokenError) -> Self {
        tracing::error!(error = %e, "Token issuance error");
        ApiError::Internal
    }
}

impl From<RotationError> for ApiError {
    fn from(e: RotationError) -> Self {
        if e.is_unauthorized() {
            tracing::debug!(error = %e, "Refresh rotation refused");
            ApiError::RefreshRejected("Invalid refresh token".to_string())
        } else {
            tracing::error!(error = %e, "Refresh rotation failed");
            ApiError::Internal
        }
    }
}
