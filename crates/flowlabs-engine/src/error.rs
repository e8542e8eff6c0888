//! Error types for the engine.
//!
//! Every failure falls into one of a small set of kinds ([`ErrorKind`]):
//! local input and configuration problems are detected before any remote call,
//! remote failures carry the original cause.

use flowlabs_connectors::ConnectorError;
use flowlabs_core::LeadId;
use flowlabs_store::{Client, StoreError};
use thiserror::Error;

/// A result type using `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Broad category of an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required input missing or malformed.
    Validation,
    /// A required credential or URL is not configured.
    Configuration,
    /// The referenced record does not exist.
    NotFound,
    /// The same action is already in flight.
    Conflict,
    /// A remote service (record store, text generation, payment, webhook) failed.
    RemoteService,
}

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Required input missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A required credential or URL is not configured.
    #[error("{0} is not configured")]
    Configuration(String),

    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Record type, e.g. `lead`.
        entity: &'static str,
        /// Record ID as given by the caller.
        id: String,
    },

    /// The record store failed.
    #[error("record store error: {0}")]
    Store(StoreError),

    /// An external connector failed.
    #[error("external service error: {0}")]
    Connector(ConnectorError),

    /// A client was created but the source lead could not be closed.
    #[error("client {} created but lead {lead_id} could not be closed: {source}", .client.id)]
    PartialConversion {
        /// The lead that stays at its previous status.
        lead_id: LeadId,
        /// The client that was created.
        client: Box<Client>,
        /// Why the lead update failed.
        #[source]
        source: StoreError,
    },

    /// The same action on the same record is already in flight.
    #[error("duplicate submission: {0} already in progress")]
    DuplicateSubmission(String),
}

impl EngineError {
    /// A lead that does not exist for the caller.
    #[must_use]
    pub fn lead_not_found(lead_id: &LeadId) -> Self {
        Self::NotFound {
            entity: "lead",
            id: lead_id.to_string(),
        }
    }

    /// The error's category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateSubmission(_) => ErrorKind::Conflict,
            Self::Store(_) | Self::Connector(_) | Self::PartialConversion { .. } => {
                ErrorKind::RemoteService
            }
        }
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Configuration => 412,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::RemoteService => 502,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retriable(),
            Self::Connector(e) => e.is_retriable(),
            Self::DuplicateSubmission(_) => true,
            _ => false,
        }
    }

    /// A short message suitable for a user-facing notification.
    #[must_use]
    pub fn notification(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Configuration(what) => format!("{what} is not configured. Add it in Settings."),
            Self::NotFound { entity, .. } => {
                let mut chars = entity.chars();
                chars.next().map_or_else(String::new, |first| {
                    format!("{}{} not found.", first.to_uppercase(), chars.as_str())
                })
            }
            Self::Store(_) => "Could not reach the database. Please try again.".to_string(),
            Self::Connector(ConnectorError::Remote { message, .. }) => message.clone(),
            Self::Connector(_) => "External service unavailable. Please try again.".to_string(),
            Self::PartialConversion { .. } => {
                "Client created, but the lead status could not be updated.".to_string()
            }
            Self::DuplicateSubmission(_) => "This action is already in progress.".to_string(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound {
                entity: "record",
                id: String::new(),
            },
            other => Self::Store(other),
        }
    }
}

impl From<ConnectorError> for EngineError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::NotConfigured(what) => Self::Configuration(what.to_string()),
            other => Self::Connector(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let lead_id = LeadId::generate();
        assert_eq!(EngineError::Validation("x".into()).http_status_code(), 400);
        assert_eq!(EngineError::Configuration("x".into()).http_status_code(), 412);
        assert_eq!(EngineError::lead_not_found(&lead_id).http_status_code(), 404);
        assert_eq!(
            EngineError::DuplicateSubmission("convert".into()).http_status_code(),
            409
        );
        assert_eq!(
            EngineError::Store(StoreError::Transport("down".into())).http_status_code(),
            502
        );
    }

    #[test]
    fn not_configured_becomes_configuration() {
        let err = EngineError::from(ConnectorError::NotConfigured("text generation API key"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            err.notification(),
            "text generation API key is not configured. Add it in Settings."
        );
    }

    #[test]
    fn store_not_found_becomes_not_found() {
        let err = EngineError::from(StoreError::NotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn notifications_are_short() {
        let lead_id = LeadId::generate();
        assert_eq!(
            EngineError::lead_not_found(&lead_id).notification(),
            "Lead not found."
        );
        let remote = EngineError::from(ConnectorError::Remote {
            status: 400,
            message: "API key not valid.".into(),
        });
        assert_eq!(remote.notification(), "API key not valid.");
        assert_eq!(remote.kind(), ErrorKind::RemoteService);
    }
}
