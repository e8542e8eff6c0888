//! Client for the hosted identity service REST API.
//!
//! This module speaks the `GoTrue` dialect served under `/auth/v1`: email and
//! password sign-up, password grant sign-in, logout, recovery email and
//! current-user lookup.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use flowlabs_core::UserId;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::provider::IdentityProvider;
use crate::user::{AuthUser, SignUpOutcome, UserProfile};
use crate::{validate_credentials, AuthConfig, MIN_PASSWORD_LEN};

const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;
const MAX_EXPIRES_IN_SECS: i64 = 366 * 24 * 3600;

/// Request payload for email/password sign-up and sign-in.
#[derive(Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

/// Raw user object.
#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Raw session response from the token and sign-up endpoints.
///
/// Sign-up without auto-confirmation answers with the bare user object, so
/// every session field is optional and the user may sit at the top level.
#[derive(Debug, Deserialize)]
struct RawSessionResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Error response; older and newer service versions use different fields.
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorResponse {
    fn text(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
    }

    fn into_error(self, status: StatusCode) -> AuthError {
        let text = self.text().unwrap_or_default().to_string();
        let lowered = text.to_ascii_lowercase();

        match self.error_code.as_deref().or(self.error.as_deref()) {
            Some("invalid_credentials" | "invalid_grant") => {
                if lowered.contains("not confirmed") {
                    AuthError::EmailNotConfirmed
                } else {
                    AuthError::InvalidCredentials
                }
            }
            Some("email_not_confirmed") => AuthError::EmailNotConfirmed,
            Some("user_already_exists" | "email_exists") => AuthError::UserExists,
            Some("weak_password") => AuthError::WeakPassword(text),
            Some("over_request_rate_limit" | "over_email_send_rate_limit") => {
                AuthError::RateLimited
            }
            _ if status == StatusCode::TOO_MANY_REQUESTS => AuthError::RateLimited,
            _ if lowered.contains("already registered") => AuthError::UserExists,
            _ if lowered.contains("email not confirmed") => AuthError::EmailNotConfirmed,
            _ if lowered.contains("invalid login credentials") => AuthError::InvalidCredentials,
            _ => AuthError::Remote {
                status: status.as_u16(),
                message: if text.is_empty() {
                    format!("HTTP {status}")
                } else {
                    text
                },
            },
        }
    }
}

/// Client for the hosted identity service.
pub struct GoTrueClient {
    config: AuthConfig,
    client: reqwest::Client,
}

impl GoTrueClient {
    /// Create a new identity client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("apikey", &self.config.anon_key)
    }

    /// Turn a non-2xx response into an `AuthError`.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: ErrorResponse = response.json().await.unwrap_or_default();
        let err = body.into_error(status);
        tracing::debug!(status = %status, error = %err, "identity service rejected request");
        Err(err)
    }

    fn parse_user_id(raw: &str) -> Result<UserId> {
        raw.parse()
            .map_err(|_| AuthError::Internal("invalid user id in response".to_string()))
    }

    fn session_from(raw: RawSessionResponse, fallback_email: &str) -> Result<Option<AuthUser>> {
        let Some(access_token) = raw.access_token else {
            return Ok(None);
        };
        let user = raw
            .user
            .ok_or_else(|| AuthError::Internal("session without user".to_string()))?;

        let expires_in_secs = i64::try_from(raw.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))
            .unwrap_or(i64::MAX)
            .min(MAX_EXPIRES_IN_SECS);
        let expires_at = Utc::now() + chrono::Duration::seconds(expires_in_secs);

        Ok(Some(AuthUser {
            id: Self::parse_user_id(&user.id)?,
            email: user.email.unwrap_or_else(|| fallback_email.to_string()),
            access_token,
            refresh_token: raw.refresh_token.unwrap_or_default(),
            expires_at,
        }))
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        validate_credentials(email, password)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let response = self
            .post(&self.config.signup_url())
            .json(&CredentialsRequest { email, password })
            .send()
            .await?;
        let raw: RawSessionResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AuthError::Internal(format!("invalid response: {e}")))?;

        let confirmed_email = raw
            .email
            .clone()
            .or_else(|| raw.user.as_ref().and_then(|u| u.email.clone()))
            .unwrap_or_else(|| email.to_string());
        let pending_id = raw.id.clone();

        match Self::session_from(raw, email)? {
            Some(user) => {
                tracing::info!(user_id = %user.id, "account created and signed in");
                Ok(SignUpOutcome::SignedIn(user))
            }
            None => {
                tracing::info!(user_id = ?pending_id, "account created, confirmation pending");
                Ok(SignUpOutcome::ConfirmationRequired {
                    email: confirmed_email,
                })
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        validate_credentials(email, password)?;

        let response = self
            .post(&self.config.token_url())
            .query(&[("grant_type", "password")])
            .json(&CredentialsRequest { email, password })
            .send()
            .await?;
        let raw: RawSessionResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AuthError::Internal(format!("invalid response: {e}")))?;

        let user = Self::session_from(raw, email)?
            .ok_or_else(|| AuthError::Internal("token response without session".to_string()))?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .post(&self.config.logout_url())
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(AuthError::InvalidInput("email is required".to_string()));
        }
        let response = self
            .post(&self.config.recover_url())
            .json(&RecoverRequest { email })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> Result<Option<UserProfile>> {
        let response = self
            .client
            .get(self.config.user_url())
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        let raw: RawUser = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AuthError::Internal(format!("invalid response: {e}")))?;

        Ok(Some(UserProfile {
            id: Self::parse_user_id(&raw.id)?,
            email: raw.email,
        }))
    }
}
