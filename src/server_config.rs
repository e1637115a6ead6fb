//! Process-wide server configuration.
//!
//! The cookie policy is needed in places that have no access to router
//! state, most notably error `IntoResponse` impls that must clear the
//! refresh cookie. It is set once at app construction and read-only after.

use std::sync::OnceLock;

use crate::auth::CookiePolicy;

static COOKIE_POLICY: OnceLock<CookiePolicy> = OnceLock::new();

/// Set the cookie policy. First call wins; later calls (e.g. repeated app
/// construction in tests) are ignored.
pub fn init(policy: CookiePolicy) {
    let _ = COOKIE_POLICY.set(policy);
}

/// The active cookie policy. Defaults to same-site/non-TLS attributes when
/// the server was never configured, which only happens in unit tests.
pub fn cookie_policy() -> CookiePolicy {
    COOKIE_POLICY
        .get()
        .copied()
        .unwrap_or(CookiePolicy {
            secure: false,
            cross_site: false,
        })
}
