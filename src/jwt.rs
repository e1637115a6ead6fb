//! Access token issuance and verification.
//!
//! Access tokens are short-lived (15 minutes by default), stateless signed
//! JWTs carrying identity and role claims. Verification checks signature and
//! expiry only; it never consults the database. Revocation is approximate:
//! a token stays valid until its own expiry.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_SECS: u64 = 15 * 60;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (public user UUID)
    pub sub: String,
    /// Email address
    pub email: String,
    /// User role
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The signed JWT string
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// Configuration for access token operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime_secs: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and default
    /// 15-minute lifetime.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_lifetime(secret, DEFAULT_ACCESS_TOKEN_SECS)
    }

    /// Create a new JWT configuration with an explicit token lifetime.
    pub fn with_lifetime(secret: &[u8], lifetime_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime_secs,
        }
    }

    /// Issue a signed access token for a user.
    pub fn issue(
        &self,
        uuid: &str,
        email: &str,
        role: UserRole,
    ) -> Result<AccessToken, AccessTokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AccessTokenError::TimeError)?
            .as_secs();

        let claims = AccessClaims {
            sub: uuid.to_string(),
            email: email.to_string(),
            role,
            iat: now,
            exp: now + self.lifetime_secs,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(AccessTokenError::Encoding)?;

        Ok(AccessToken {
            token,
            expires_in: self.lifetime_secs,
        })
    }

    /// Verify an access token's signature and expiry.
    ///
    /// Expiry is reported separately from all other failures so callers can
    /// fall back to refresh rotation only for expired tokens.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AccessTokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(AccessTokenError::Expired),
                _ => Err(AccessTokenError::Invalid(e)),
            },
        }
    }
}

/// Errors that can occur during access token operations.
#[derive(Debug)]
pub enum AccessTokenError {
    /// The token's signature is valid but its lifetime has elapsed
    Expired,
    /// Bad signature, malformed token, or wrong claim shape
    Invalid(jsonwebtoken::errors::Error),
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for AccessTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessTokenError::Expired => write!(f, "Access token expired"),
            AccessTokenError::Invalid(e) => write!(f, "Invalid access token: {}", e),
            AccessTokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            AccessTokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for AccessTokenError {}
