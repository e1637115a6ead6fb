//! Authentication guards and refresh-secret transport.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use cookie::{
    ACCESS_TOKEN_HEADER, CookiePolicy, REFRESH_COOKIE_NAME, REFRESH_TOKEN_HEADER, get_cookie,
    is_local_origin,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{
    AdminOnly, Auth, OptionalAuth, attach_rotated_tokens, discard_rotated_tokens,
};
pub use ip::client_ip;
pub use state::HasAuthState;
pub use types::AuthenticatedUser;
