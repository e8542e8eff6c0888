//! Identity endpoints.
//!
//! Sign-up, sign-in and password recovery are public and forward to the
//! identity service. The tokens they return are what the other endpoints
//! expect in the `Authorization` header.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowlabs_auth::{
    validate_credentials, AuthError, IdentityProvider, SignUpOutcome, TokenVerifier, UserProfile,
};

use super::ApiJson;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Email and password.
#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Request to send a password reset email.
#[derive(Debug, Deserialize)]
pub struct RecoverBody {
    /// Account email.
    pub email: String,
}

/// A new session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// The signed-in user.
    pub user: UserProfile,
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl From<flowlabs_auth::AuthUser> for SessionResponse {
    fn from(user: flowlabs_auth::AuthUser) -> Self {
        Self {
            user: user.profile(),
            access_token: user.access_token,
            refresh_token: user.refresh_token,
            expires_at: user.expires_at,
        }
    }
}

/// Sign-up accepted, pending email confirmation.
#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    /// Always `confirmation_required`.
    pub status: &'static str,
    /// Where the confirmation link was sent.
    pub email: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account.
///
/// Answers `201 Created` with a session, or `202 Accepted` when the email
/// must be confirmed first.
///
/// # Errors
///
/// Returns an error for missing input, a weak password or an existing account.
pub async fn sign_up<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    ApiJson(body): ApiJson<CredentialsBody>,
) -> Result<Response, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    validate_credentials(&body.email, &body.password)?;
    let email = body.email.trim();

    let response = match state.identity.sign_up(email, &body.password).await? {
        SignUpOutcome::SignedIn(user) => {
            tracing::info!(user_id = %user.id, "Account created");
            (StatusCode::CREATED, Json(SessionResponse::from(user))).into_response()
        }
        SignUpOutcome::ConfirmationRequired { email } => {
            tracing::info!("Account created, awaiting email confirmation");
            (
                StatusCode::ACCEPTED,
                Json(ConfirmationResponse {
                    status: "confirmation_required",
                    email,
                }),
            )
                .into_response()
        }
    };

    Ok(response)
}

/// Sign in with email and password.
///
/// # Errors
///
/// Returns an error for missing input, wrong credentials or an unconfirmed
/// email.
pub async fn sign_in<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    ApiJson(body): ApiJson<CredentialsBody>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    validate_credentials(&body.email, &body.password)?;
    let user = state
        .identity
        .sign_in(body.email.trim(), &body.password)
        .await?;

    tracing::info!(user_id = %user.id, "Signed in");
    Ok(Json(SessionResponse::from(user)))
}

/// Send a password reset email.
///
/// # Errors
///
/// Returns an error for a blank email or if the identity service fails.
pub async fn recover<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    ApiJson(body): ApiJson<RecoverBody>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let email = body.email.trim();
    if email.is_empty() {
        return Err(AuthError::InvalidInput("email is required".to_string()).into());
    }
    state.identity.reset_password(email).await?;

    Ok(StatusCode::ACCEPTED)
}

/// Revoke the caller's session.
///
/// A failure on the identity service side is logged; the caller is signed
/// out either way.
pub async fn sign_out<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> impl IntoResponse
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    if let Err(e) = state.identity.sign_out(&user.access_token).await {
        tracing::warn!(user_id = %user.user_id, error = %e, "Remote sign-out failed");
    }
    StatusCode::NO_CONTENT
}

/// The caller's profile as the identity service sees it.
///
/// # Errors
///
/// Returns `Unauthorized` if the identity service no longer knows the token.
pub async fn current_user<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let profile = state
        .identity
        .current_user(&user.access_token)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(profile))
}
