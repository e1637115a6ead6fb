//! Refresh-secret transport: cookie parsing and construction.
//!
//! The primary channel is an HttpOnly cookie. Cross-site deployments need
//! `SameSite=None; Secure` or browsers drop the cookie; same-site and local
//! deployments use `SameSite=Lax` and only add `Secure` when serving over
//! TLS. Clearing must reuse the exact attribute set the cookie was set
//! with, or browsers silently keep it.

use axum::http::{HeaderMap, header};

/// Cookie name for the refresh secret.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Response header carrying a freshly issued access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Response header carrying a freshly issued refresh secret.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Cookie attribute policy, decided once at startup from the deployment
/// origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    /// Serving over TLS
    pub secure: bool,
    /// Client and API live on different sites
    pub cross_site: bool,
}

impl CookiePolicy {
    fn attributes(&self) -> &'static str {
        // SameSite=None without Secure is rejected by browsers, so the
        // cross-site case always carries Secure.
        match (self.cross_site, self.secure) {
            (true, _) => "; SameSite=None; Secure",
            (false, true) => "; SameSite=Lax; Secure",
            (false, false) => "; SameSite=Lax",
        }
    }

    /// Build the Set-Cookie value carrying a refresh secret.
    pub fn refresh_cookie(&self, secret: &str, max_age_secs: u64) -> String {
        format!(
            "{}={}; HttpOnly; Path=/; Max-Age={}{}",
            REFRESH_COOKIE_NAME,
            secret,
            max_age_secs,
            self.attributes()
        )
    }

    /// Build the Set-Cookie value clearing the refresh cookie, with the
    /// same attribute set used when setting it.
    pub fn clear_refresh_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; Path=/; Max-Age=0{}",
            REFRESH_COOKIE_NAME,
            self.attributes()
        )
    }
}

/// True when the request declares a local development origin. Such clients
/// cannot rely on cross-origin cookies, so token issuance additionally
/// returns the refresh secret in the response body for client-side caching.
pub fn is_local_origin(headers: &HeaderMap) -> bool {
    headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|origin| origin.contains("localhost") || origin.contains("127.0.0.1"))
        .unwrap_or(false)
}
