use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::server_config;

/// Guard rejection reasons.
///
/// The client only ever sees a status code and a generic message; the
/// variants exist for logging and for deciding whether to clear the
/// refresh cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No usable Authorization header
    NotAuthenticated,
    /// Token failed signature or shape checks
    InvalidToken,
    /// Access token expired and the refresh rotation was refused
    RotationFailed,
    /// Authenticated but not an admin
    InsufficientRole,
    /// Database or other server-side failure during authentication
    Internal,
}

/// A guard rejection rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiAuthError(pub AuthErrorKind);

impl ApiAuthError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AuthErrorKind::NotAuthenticated
            | AuthErrorKind::InvalidToken
            | AuthErrorKind::RotationFailed => StatusCode::UNAUTHORIZED,
            AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
            AuthErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.0 {
            AuthErrorKind::NotAuthenticated => "Authentication required",
            AuthErrorKind::InvalidToken => "Invalid or expired token",
            AuthErrorKind::RotationFailed => "Invalid or expired token",
            AuthErrorKind::InsufficientRole => "Admin access required",
            AuthErrorKind::Internal => "Internal server error",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        let mut response =
            (self.status(), Json(json!({ "message": self.message() }))).into_response();

        // Clear the cookie only when a presented refresh secret was refused;
        // a missing or mangled Authorization header says nothing about the
        // session, and wiping the cookie there would log the client out of a
        // live session.
        if self.0 == AuthErrorKind::RotationFailed {
            let clear = server_config::cookie_policy().clear_refresh_cookie();
            if let Ok(value) = header::HeaderValue::from_str(&clear) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }

        response
    }
}
