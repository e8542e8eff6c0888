//! API error types and responses.
//!
//! This module defines the standard error format for all API responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use flowlabs_auth::AuthError;
use flowlabs_engine::{EngineError, ErrorKind};

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid authentication token.
    #[error("unauthorized")]
    Unauthorized,

    /// The account may not perform this request.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Too many requests, rate limited.
    #[error("rate limited")]
    RateLimited,

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A credential or URL the request needs is not configured.
    #[error("not configured: {0}")]
    PreconditionFailed(String),

    /// A backend service failed.
    #[error("upstream error: {0}")]
    BadGateway(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::RateLimited => "rate_limited",
            Self::BadRequest(_) => "bad_request",
            Self::PreconditionFailed(_) => "not_configured",
            Self::BadGateway(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.notification();
        match err.kind() {
            ErrorKind::Validation => Self::BadRequest(message),
            ErrorKind::Configuration => Self::PreconditionFailed(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::RemoteService => {
                tracing::error!(error = %err, retriable = err.is_retriable(), "Backend call failed");
                Self::BadGateway(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) | AuthError::WeakPassword(msg) => Self::BadRequest(msg),
            AuthError::InvalidCredentials | AuthError::TokenExpired | AuthError::InvalidToken(_) => {
                Self::Unauthorized
            }
            AuthError::EmailNotConfirmed => {
                Self::Forbidden("confirm your email address before signing in".to_string())
            }
            AuthError::UserExists => Self::Conflict("user already registered".to_string()),
            AuthError::RateLimited => Self::RateLimited,
            AuthError::Remote { .. } => {
                tracing::error!(error = %err, "Identity service error");
                Self::BadGateway("identity service error".to_string())
            }
            AuthError::Internal(_) => {
                tracing::error!(error = %err, "Auth internal error");
                Self::Internal("authentication service error".to_string())
            }
        }
    }
}
