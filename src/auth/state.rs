use crate::db::Database;
use crate::hashing::CredentialHasher;
use crate::jwt::JwtConfig;

/// What the auth guards need from router state.
///
/// Implemented by the API state so the extractors stay generic over the
/// routers they are mounted on.
pub trait HasAuthState: Send + Sync {
    fn jwt(&self) -> &JwtConfig;
    fn db(&self) -> &Database;
    fn hasher(&self) -> CredentialHasher;
}
