//! Request guards.
//!
//! `Auth` authenticates from the Authorization header and, when the access
//! token is expired but a refresh cookie is present, transparently rotates
//! the session and authenticates from the fresh token. The new pair is
//! stashed in a task-local and attached to the response by
//! [`attach_rotated_tokens`], so handlers never see the difference.

use std::cell::RefCell;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::db::UserRole;
use crate::jwt::AccessTokenError;
use crate::refresh;
use crate::server_config;
use crate::session::{self, IssuedTokens};

use super::cookie::{self, ACCESS_TOKEN_HEADER, REFRESH_COOKIE_NAME, REFRESH_TOKEN_HEADER};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthState;
use super::types::AuthenticatedUser;

tokio::task_local! {
    /// Tokens minted by a transparent rotation, to be attached to the
    /// response once the handler finishes.
    static ROTATED_TOKENS: RefCell<Option<IssuedTokens>>;
}

async fn authenticate_request<S: HasAuthState>(
    parts: &Parts,
    state: &S,
) -> Result<AuthenticatedUser, AuthErrorKind> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthErrorKind::NotAuthenticated)?;
    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or(AuthErrorKind::NotAuthenticated)?;

    match state.jwt().verify(token) {
        Ok(claims) => Ok(AuthenticatedUser {
            claims,
            user_id: None,
        }),
        Err(AccessTokenError::Expired) => {
            // Expired is the one recoverable failure: try the refresh
            // cookie before turning the caller away.
            let Some(secret) = cookie::get_cookie(&parts.headers, REFRESH_COOKIE_NAME) else {
                return Err(AuthErrorKind::InvalidToken);
            };

            let issued = session::rotate(state.db(), state.hasher(), state.jwt(), secret)
                .await
                .map_err(|e| {
                    if e.is_unauthorized() {
                        tracing::debug!(error = %e, "Transparent refresh refused");
                        AuthErrorKind::RotationFailed
                    } else {
                        tracing::error!(error = %e, "Transparent refresh failed");
                        AuthErrorKind::Internal
                    }
                })?;

            let claims = state
                .jwt()
                .verify(&issued.access_token)
                .map_err(|_| AuthErrorKind::Internal)?;
            let user_id = issued.user.id;

            // Outside the middleware's scope (unit tests calling handlers
            // directly) the pair is simply not attached.
            let _ = ROTATED_TOKENS.try_with(|cell| *cell.borrow_mut() = Some(issued));

            Ok(AuthenticatedUser {
                claims,
                user_id: Some(user_id),
            })
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected access token");
            Err(AuthErrorKind::InvalidToken)
        }
    }
}

/// Requires a valid (or transparently refreshable) access token.
#[derive(Debug)]
pub struct Auth(pub AuthenticatedUser);

impl<S: HasAuthState> FromRequestParts<S> for Auth {
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .await
            .map(Auth)
            .map_err(ApiAuthError)
    }
}

/// Attaches the identity when credentials are present and valid, and
/// proceeds anonymously otherwise. Never rejects.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S: HasAuthState> FromRequestParts<S> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(authenticate_request(parts, state).await.ok()))
    }
}

/// Requires an authenticated admin.
///
/// An admin claim in the token is trusted for the token's lifetime. A
/// non-admin claim falls back to the live database role, so a freshly
/// promoted admin does not have to wait out their current access token.
#[derive(Debug)]
pub struct AdminOnly(pub AuthenticatedUser);

impl<S: HasAuthState> FromRequestParts<S> for AdminOnly {
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let mut user = authenticate_request(parts, state)
            .await
            .map_err(ApiAuthError)?;

        if user.claims.role == UserRole::Admin {
            return Ok(AdminOnly(user));
        }

        let fresh = state
            .db()
            .users()
            .get_by_uuid(&user.claims.sub)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Role lookup failed");
                ApiAuthError(AuthErrorKind::Internal)
            })?;

        match fresh {
            Some(u) if u.role == UserRole::Admin => {
                user.claims.role = UserRole::Admin;
                user.user_id = Some(u.id);
                Ok(AdminOnly(user))
            }
            _ => Err(ApiAuthError(AuthErrorKind::InsufficientRole)),
        }
    }
}

/// Drop tokens stashed by a transparent rotation. Logout calls this so a
/// session killed by the handler is not resurrected by the response
/// middleware.
pub fn discard_rotated_tokens() {
    let _ = ROTATED_TOKENS.try_with(|cell| cell.borrow_mut().take());
}

/// Response middleware pairing with the guards: when a guard rotated the
/// session mid-request, set the new refresh cookie and expose the fresh
/// pair in response headers.
pub async fn attach_rotated_tokens(request: Request, next: Next) -> Response {
    ROTATED_TOKENS
        .scope(RefCell::new(None), async move {
            let mut response = next.run(request).await;

            let issued = ROTATED_TOKENS.with(|cell| cell.borrow_mut().take());
            if let Some(tokens) = issued {
                let policy = server_config::cookie_policy();
                let max_age = tokens
                    .refresh_expires_at
                    .saturating_sub(refresh::now_unix());

                let headers = response.headers_mut();
                if let Ok(value) =
                    HeaderValue::from_str(&policy.refresh_cookie(&tokens.refresh_secret, max_age))
                {
                    headers.append(header::SET_COOKIE, value);
                }
                if let Ok(value) = HeaderValue::from_str(&tokens.access_token) {
                    headers.insert(ACCESS_TOKEN_HEADER, value);
                }
                if let Ok(value) = HeaderValue::from_str(&tokens.refresh_secret) {
                    headers.insert(REFRESH_TOKEN_HEADER, value);
                }
            }

            response
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::hashing::CredentialHasher;
    use crate::jwt::JwtConfig;
    use crate::session::establish_session;

    struct TestState {
        db: Database,
        jwt: JwtConfig,
        hasher: CredentialHasher,
    }

    impl HasAuthState for TestState {
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

    async fn test_state() -> TestState {
        TestState {
            db: Database::open(":memory:").await.unwrap(),
            jwt: JwtConfig::new(b"test-secret-key-for-testing"),
            hasher: CredentialHasher::new(4),
        }
    }

    async fn seed_user(state: &TestState, role: UserRole) -> crate::db::User {
        let id = state
            .db
            .users()
            .create("uuid-1", "Alice", "alice@example.com", "pw-hash")
            .await
            .unwrap();
        if role == UserRole::Admin {
            state.db.users().set_role(id, role).await.unwrap();
        }
        state.db.users().get_by_id(id).await.unwrap().unwrap()
    }

    /// A well-signed token whose lifetime has already elapsed.
    fn expired_token(uuid: &str, email: &str, role: UserRole) -> String {
        use jsonwebtoken::{EncodingKey, Header};

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = crate::jwt::AccessClaims {
            sub: uuid.to_string(),
            email: email.to_string(),
            role,
            iat: now - 100,
            exp: now - 50,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-for-testing"),
        )
        .unwrap()
    }

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_auth_accepts_valid_bearer() {
        let state = test_state().await;
        let user = seed_user(&state, UserRole::User).await;
        let token = state
            .jwt
            .issue(&user.uuid, &user.email, user.role)
            .unwrap()
            .token;

        let mut parts =
            parts_with_headers(&[("authorization", &format!("Bearer {}", token))]);
        let Auth(authed) = Auth::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(authed.claims.sub, "uuid-1");
        assert_eq!(authed.user_id, None);
    }

    #[tokio::test]
    async fn test_auth_rejects_missing_and_malformed_header() {
        let state = test_state().await;

        let mut parts = parts_with_headers(&[]);
        let err = Auth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.0, AuthErrorKind::NotAuthenticated);

        let mut parts = parts_with_headers(&[("authorization", "Basic abc")]);
        let err = Auth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.0, AuthErrorKind::NotAuthenticated);

        let mut parts = parts_with_headers(&[("authorization", "Bearer garbage")]);
        let err = Auth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.0, AuthErrorKind::InvalidToken);
    }

    #[tokio::test]
    async fn test_expired_token_with_refresh_cookie_rotates() {
        let state = test_state().await;
        let user = seed_user(&state, UserRole::User).await;

        let issued = establish_session(&state.db, state.hasher, &state.jwt, user.clone(), 7)
            .await
            .unwrap();

        // An already-expired token forces the refresh path.
        let stale = expired_token(&user.uuid, &user.email, user.role);

        let mut parts = parts_with_headers(&[
            ("authorization", &format!("Bearer {}", stale)),
            (
                "cookie",
                &format!("refreshToken={}", issued.refresh_secret),
            ),
        ]);

        let Auth(authed) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(authed.claims.sub, "uuid-1");
        assert_eq!(authed.user_id, Some(user.id));

        // The rotation consumed the cookie's secret.
        let mut parts = parts_with_headers(&[
            ("authorization", &format!("Bearer {}", stale)),
            (
                "cookie",
                &format!("refreshToken={}", issued.refresh_secret),
            ),
        ]);
        let err = Auth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.0, AuthErrorKind::RotationFailed);
    }

    #[tokio::test]
    async fn test_expired_token_without_cookie_is_rejected() {
        let state = test_state().await;
        let user = seed_user(&state, UserRole::User).await;

        let stale = expired_token(&user.uuid, &user.email, user.role);

        let mut parts =
            parts_with_headers(&[("authorization", &format!("Bearer {}", stale))]);
        let err = Auth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.0, AuthErrorKind::InvalidToken);
    }

    #[tokio::test]
    async fn test_optional_auth_never_fails() {
        let state = test_state().await;

        let mut parts = parts_with_headers(&[]);
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.is_none());

        let mut parts = parts_with_headers(&[("authorization", "Bearer garbage")]);
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_admin_guard_checks_live_role() {
        let state = test_state().await;
        let user = seed_user(&state, UserRole::User).await;

        // Token still says "user".
        let token = state
            .jwt
            .issue(&user.uuid, &user.email, UserRole::User)
            .unwrap()
            .token;

        let mut parts =
            parts_with_headers(&[("authorization", &format!("Bearer {}", token))]);
        let err = AdminOnly::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.0, AuthErrorKind::InsufficientRole);

        // Promote, same token now passes via the live-role fallback.
        state
            .db
            .users()
            .set_role(user.id, UserRole::Admin)
            .await
            .unwrap();
        let mut parts =
            parts_with_headers(&[("authorization", &format!("Bearer {}", token))]);
        let AdminOnly(authed) = AdminOnly::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(authed.claims.role, UserRole::Admin);
    }
}
