//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Required input was missing or malformed; no remote call was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The password does not meet the strength requirements.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Email or password is wrong.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The account exists but its email address is not confirmed yet.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// An account with this email already exists.
    #[error("user already registered")]
    UserExists,

    /// Too many authentication attempts, rate limited.
    #[error("rate limited")]
    RateLimited,

    /// The access token has expired.
    #[error("token expired")]
    TokenExpired,

    /// The access token is malformed or its signature does not verify.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The identity service rejected the request.
    #[error("identity service returned {status}: {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Message reported by the identity service.
        message: String,
    },

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if the same request may succeed later.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::RateLimited | Self::TokenExpired => true,
            Self::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) | Self::WeakPassword(_) => 400,
            Self::InvalidCredentials | Self::TokenExpired | Self::InvalidToken(_) => 401,
            Self::EmailNotConfirmed => 403,
            Self::UserExists => 409,
            Self::RateLimited => 429,
            Self::Remote { .. } => 502,
            Self::Internal(_) => 500,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Internal(format!("request failed: {err}"))
    }
}
