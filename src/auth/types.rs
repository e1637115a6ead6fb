use crate::jwt::AccessClaims;

/// The identity attached to a request by the auth guards.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Verified access token claims
    pub claims: AccessClaims,
    /// Database row id, known only when the guard touched the database
    /// (i.e. the request was authenticated via refresh rotation)
    pub user_id: Option<i64>,
}
