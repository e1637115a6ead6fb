//! Authentication endpoints: register, login, logout, refresh.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{
    ACCESS_TOKEN_HEADER, Auth, REFRESH_COOKIE_NAME, REFRESH_TOKEN_HEADER,
    discard_rotated_tokens, get_cookie, is_local_origin,
};
use crate::db::{User, UserRole};
use crate::refresh::{self, DEFAULT_EXPIRY_DAYS, LOGIN_EXPIRY_DAYS, REMEMBER_ME_EXPIRY_DAYS};
use crate::server_config;
use crate::session::{self, IssuedTokens};

use super::ApiState;
use super::error::ApiError;
use super::validation::{LoginRequest, RefreshRequest, RegisterRequest};

/// Non-enumerating answer for duplicate registration attempts.
const DUPLICATE_EMAIL_MESSAGE: &str = "If an account exists, you'll receive an email";

/// Build a token-issuing response: refresh cookie, header pair, and a JSON
/// body that carries the refresh secret only for localhost clients, which
/// cannot receive cross-origin cookies.
fn token_response(
    status: StatusCode,
    local_origin: bool,
    issued: &IssuedTokens,
    expiry_days: u64,
) -> Response {
    let mut body = json!({
        "accessToken": issued.access_token,
        "expiresIn": issued.access_expires_in,
        "user": {
            "uuid": issued.user.uuid,
            "fullName": issued.user.full_name,
            "email": issued.user.email,
            "role": issued.user.role,
        },
    });
    if local_origin {
        body["refreshToken"] = json!(issued.refresh_secret);
        body["expiryDays"] = json!(expiry_days);
    }

    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();

    let policy = server_config::cookie_policy();
    let max_age = issued
        .refresh_expires_at
        .saturating_sub(refresh::now_unix());
    if let Ok(value) =
        HeaderValue::from_str(&policy.refresh_cookie(&issued.refresh_secret, max_age))
    {
        headers.append(header::SET_COOKIE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&issued.access_token) {
        headers.insert(ACCESS_TOKEN_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&issued.refresh_secret) {
        headers.insert(REFRESH_TOKEN_HEADER, value);
    }

    response
}

pub async fn register(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    body.validate().map_err(ApiError::BadRequest)?;

    let email = body.email.to_lowercase();
    if state.db.users().email_taken(&email).await? {
        return Err(ApiError::BadRequest(DUPLICATE_EMAIL_MESSAGE.to_string()));
    }

    let password_hash = session::hash_blocking(state.hasher, body.password).await?;
    let uuid = Uuid::new_v4().to_string();
    let id = state
        .db
        .users()
        .create(&uuid, body.full_name.trim(), &email, &password_hash)
        .await?;

    let user = User {
        id,
        uuid,
        full_name: body.full_name.trim().to_string(),
        email,
        role: UserRole::User,
    };

    let issued =
        session::establish_session(&state.db, state.hasher, &state.jwt, user, DEFAULT_EXPIRY_DAYS)
            .await?;
    tracing::info!(uuid = %issued.user.uuid, "User registered");

    Ok(token_response(
        StatusCode::CREATED,
        is_local_origin(&headers),
        &issued,
        DEFAULT_EXPIRY_DAYS,
    ))
}

pub async fn login(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    body.validate().map_err(ApiError::BadRequest)?;

    // Unknown email and wrong password collapse into the same answer.
    let Some((user, password_hash)) = state
        .db
        .users()
        .get_by_email_with_password(&body.email)
        .await?
    else {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    };

    let password_ok =
        session::verify_blocking(state.hasher, body.password, password_hash).await?;
    if !password_ok {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let expiry_days = if body.remember_me {
        REMEMBER_ME_EXPIRY_DAYS
    } else {
        LOGIN_EXPIRY_DAYS
    };

    let issued =
        session::establish_session(&state.db, state.hasher, &state.jwt, user, expiry_days).await?;
    tracing::info!(uuid = %issued.user.uuid, remember_me = body.remember_me, "User logged in");

    Ok(token_response(
        StatusCode::OK,
        is_local_origin(&headers),
        &issued,
        expiry_days,
    ))
}

pub async fn logout(
    State(state): State<ApiState>,
    Auth(user): Auth,
) -> Result<Response, ApiError> {
    let user_id = match user.user_id {
        Some(id) => Some(id),
        None => state
            .db
            .users()
            .get_by_uuid(&user.claims.sub)
            .await?
            .map(|u| u.id),
    };
    if let Some(id) = user_id {
        state.db.users().clear_session(id).await?;
    }

    // If the guard rotated on the way in, that pair is now dead too.
    discard_rotated_tokens();
    tracing::info!(uuid = %user.claims.sub, "User logged out");

    let mut response =
        (StatusCode::OK, Json(json!({ "message": "Logout successful" }))).into_response();
    let clear = server_config::cookie_policy().clear_refresh_cookie();
    if let Ok(value) = HeaderValue::from_str(&clear) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

pub async fn refresh(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    // Cookie first; JSON body as fallback for clients without cookie
    // access. The body is optional, so it is parsed leniently.
    let secret = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .map(str::to_string)
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .and_then(|b| b.refresh_token)
        });

    let Some(secret) = secret else {
        return Err(ApiError::RefreshRejected(
            "Refresh token missing".to_string(),
        ));
    };

    let issued = session::rotate(&state.db, state.hasher, &state.jwt, &secret).await?;
    tracing::debug!(uuid = %issued.user.uuid, "Session rotated");

    Ok(token_response(
        StatusCode::OK,
        is_local_origin(&headers),
        &issued,
        DEFAULT_EXPIRY_DAYS,
    ))
}
