//! Authentication extractor.
//!
//! This module provides the `AuthUser` extractor that verifies the bearer
//! token and extracts the caller's identity from requests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use flowlabs_auth::{IdentityProvider, TokenVerifier, VerifiedToken};
use flowlabs_core::UserId;

use crate::error::ApiError;
use crate::state::GatewayState;

/// An authenticated user extracted from an access token.
///
/// This extractor validates the `Authorization: Bearer <token>` header.
/// Every record the handlers touch is scoped to `user_id`.
#[derive(Clone)]
pub struct AuthUser {
    /// The user the token was issued to.
    pub user_id: UserId,
    /// Account email, when the token carries one.
    pub email: Option<String>,
    /// The raw access token, forwarded on sign-out.
    pub access_token: String,
}

impl AuthUser {
    /// Create an `AuthUser` from a verified token.
    #[must_use]
    pub fn from_verified(token: &VerifiedToken, access_token: &str) -> Self {
        Self {
            user_id: token.user_id,
            email: token.email.clone(),
            access_token: access_token.to_string(),
        }
    }
}

impl std::fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthUser")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"***")
            .finish()
    }
}

/// Pull the token out of an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<V, I> FromRequestParts<Arc<GatewayState<V, I>>> for AuthUser
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<V, I>>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::Unauthorized)?;

        let verified = state.verifier.verify(token).await.map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            ApiError::Unauthorized
        })?;

        Ok(Self::from_verified(&verified, token))
    }
}
