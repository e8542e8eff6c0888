//! Access-token verification.
//!
//! Access tokens issued by the identity service are HS256 JWTs signed with the
//! project's JWT secret. The API verifies them locally instead of calling the
//! service on every request.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowlabs_core::UserId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::DEFAULT_AUDIENCE;

/// Claims extracted from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// The user ID from the `sub` claim.
    pub user_id: UserId,
    /// The account email, if present.
    pub email: Option<String>,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Trait for verifying access tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a token and extract its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, expired or not signed with the
    /// expected key.
    async fn verify(&self, token: &str) -> Result<VerifiedToken>;
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    exp: u64,
}

/// HS256 verifier using the project JWT secret.
pub struct Hs256Verifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256Verifier {
    /// Create a verifier expecting the default `authenticated` audience.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self::with_audience(secret, DEFAULT_AUDIENCE)
    }

    /// Create a verifier expecting a specific audience.
    #[must_use]
    pub fn with_audience(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl fmt::Debug for Hs256Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hs256Verifier")
            .field("audience", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenVerifier for Hs256Verifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let data = decode::<RawClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidToken("bad signature".into()),
                ErrorKind::InvalidAudience => AuthError::InvalidToken("wrong audience".into()),
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = data.claims;
        let user_id = UserId::from_str(&claims.sub)
            .map_err(|_| AuthError::InvalidToken("sub is not a user id".into()))?;

        let exp_secs = i64::try_from(claims.exp).unwrap_or(i64::MAX);
        let expires_at = DateTime::from_timestamp(exp_secs, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".to_string()))?;

        Ok(VerifiedToken {
            user_id,
            email: claims.email,
            expires_at,
        })
    }
}

/// A mock token verifier for testing.
///
/// Accepts tokens of the form `test-token:<user uuid>`.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockTokenVerifier;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let raw = token
            .strip_prefix("test-token:")
            .ok_or_else(|| AuthError::InvalidToken("expected test-token:<user>".to_string()))?;
        let user_id = UserId::from_str(raw)
            .map_err(|_| AuthError::InvalidToken("sub is not a user id".into()))?;

        Ok(VerifiedToken {
            user_id,
            email: None,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}
