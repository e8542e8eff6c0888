//! Connector error types.

use thiserror::Error;

/// A result type using `ConnectorError`.
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Errors that can occur when calling an external service.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A required credential or URL is not configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The service could not be reached.
    #[error("request failed: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// The service answered successfully but without usable content.
    #[error("empty response")]
    EmptyResponse,

    /// The response body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ConnectorError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Remote { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Read a non-success response into `ConnectorError::Remote`.
///
/// `extract` pulls a message out of the service-specific error body.
pub(crate) async fn remote_error(
    response: reqwest::Response,
    extract: impl FnOnce(&serde_json::Value) -> Option<String>,
) -> ConnectorError {
    let status = response.status();
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .as_ref()
        .and_then(extract)
        .unwrap_or_else(|| format!("HTTP {status}"));
    ConnectorError::Remote {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_configured_message() {
        let err = ConnectorError::NotConfigured("text generation API key");
        assert_eq!(err.to_string(), "text generation API key is not configured");
    }

    #[test]
    fn retriable_classification() {
        assert!(ConnectorError::Http("timeout".into()).is_retriable());
        assert!(!ConnectorError::EmptyResponse.is_retriable());
        assert!(!ConnectorError::Remote {
            status: 400,
            message: "bad".into()
        }
        .is_retriable());
    }
}
