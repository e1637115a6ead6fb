//! Session establishment and refresh-token rotation.
//!
//! Rotation is single-use by construction: the session slot is overwritten
//! with the replacement secret's hash the moment a presented secret is
//! accepted, so replaying a consumed secret fails hash verification at the
//! next attempt. The slot write is conditional on the consumed lookup key,
//! so of two concurrent rotations presenting the same secret exactly one
//! succeeds.

use tokio::task;

use crate::db::{Database, User};
use crate::hashing::CredentialHasher;
use crate::jwt::{AccessTokenError, JwtConfig};
use crate::refresh::{self, DEFAULT_EXPIRY_DAYS, RefreshToken};

/// A freshly issued access/refresh pair bound to a user.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub user: User,
    pub access_token: String,
    /// Access token lifetime in seconds
    pub access_expires_in: u64,
    /// Plaintext refresh secret for the client; only its hash is persisted
    pub refresh_secret: String,
    /// Refresh expiry (Unix timestamp)
    pub refresh_expires_at: u64,
}

/// Why a rotation was refused or failed.
///
/// Everything `is_unauthorized` reports true for collapses into a single
/// client-visible 401; the variants exist for server-side logging and for
/// the expiry bookkeeping, never for the response body.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("refresh secret missing or malformed")]
    Malformed,
    #[error("no session matches the lookup key")]
    UnknownLookupKey,
    #[error("refresh secret does not match the stored hash")]
    SecretMismatch,
    #[error("session expired")]
    Expired,
    #[error("session was replaced by a concurrent rotation")]
    LostRace,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("token error: {0}")]
    Token(#[from] AccessTokenError),
    #[error("blocking task failed: {0}")]
    Join(#[from] task::JoinError),
}

impl RotationError {
    /// True for every failure the client is told about as a plain 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            RotationError::Malformed
                | RotationError::UnknownLookupKey
                | RotationError::SecretMismatch
                | RotationError::Expired
                | RotationError::LostRace
        )
    }
}

/// Hash a secret on the blocking pool.
pub async fn hash_blocking(
    hasher: CredentialHasher,
    secret: String,
) -> Result<String, RotationError> {
    Ok(task::spawn_blocking(move || hasher.hash(&secret)).await??)
}

/// Verify a secret against a hash on the blocking pool.
pub async fn verify_blocking(
    hasher: CredentialHasher,
    secret: String,
    hash: String,
) -> Result<bool, RotationError> {
    Ok(task::spawn_blocking(move || hasher.verify(&secret, &hash)).await??)
}

/// Create a fresh access/refresh pair for a user and overwrite their
/// session slot (register and login). Any previously live refresh secret
/// for this user stops rotating from here on.
pub async fn establish_session(
    db: &Database,
    hasher: CredentialHasher,
    jwt: &JwtConfig,
    user: User,
    expiry_days: u64,
) -> Result<IssuedTokens, RotationError> {
    let token = RefreshToken::generate(expiry_days);
    let secret_hash = hash_blocking(hasher, token.secret.clone()).await?;

    db.users()
        .set_session(user.id, &token.lookup_key, &secret_hash, token.expires_at)
        .await?;

    let access = jwt.issue(&user.uuid, &user.email, user.role)?;

    Ok(IssuedTokens {
        user,
        access_token: access.token,
        access_expires_in: access.expires_in,
        refresh_secret: token.secret,
        refresh_expires_at: token.expires_at,
    })
}

/// Exchange a presented refresh secret for a new access/refresh pair.
///
/// Gates, in order: length check, indexed lookup by key prefix, hash
/// verification of the full secret, expiry check (clearing the slot when
/// stale), then a conditional slot replacement that also decides races.
pub async fn rotate(
    db: &Database,
    hasher: CredentialHasher,
    jwt: &JwtConfig,
    presented: &str,
) -> Result<IssuedTokens, RotationError> {
    let lookup_key = refresh::lookup_key_of(presented).ok_or(RotationError::Malformed)?;

    let record = db
        .users()
        .find_by_lookup_key(lookup_key)
        .await?
        .ok_or(RotationError::UnknownLookupKey)?;

    // Full-secret check; the lookup key alone proves nothing.
    let matches = verify_blocking(
        hasher,
        presented.to_string(),
        record.secret_hash.clone(),
    )
    .await?;
    if !matches {
        return Err(RotationError::SecretMismatch);
    }

    if refresh::now_unix() > record.expires_at {
        db.users().clear_session(record.user.id).await?;
        return Err(RotationError::Expired);
    }

    let replacement = RefreshToken::generate(DEFAULT_EXPIRY_DAYS);
    let secret_hash = hash_blocking(hasher, replacement.secret.clone()).await?;

    let won = db
        .users()
        .replace_session(
            record.user.id,
            &record.lookup_key,
            &replacement.lookup_key,
            &secret_hash,
            replacement.expires_at,
        )
        .await?;
    if !won {
        return Err(RotationError::LostRace);
    }

    let access = jwt.issue(&record.user.uuid, &record.user.email, record.user.role)?;

    Ok(IssuedTokens {
        user: record.user,
        access_token: access.token,
        access_expires_in: access.expires_in,
        refresh_secret: replacement.secret,
        refresh_expires_at: replacement.expires_at,
    })
}
