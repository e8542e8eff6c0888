//! At-most-once guard for mutating actions.
//!
//! Rapid repeated submissions of the same action on the same record (double
//! clicks, client retries racing the first request) are rejected while the
//! first one is still in flight.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use flowlabs_core::UserId;
use parking_lot::Mutex;

use crate::error::{EngineError, Result};

/// A guarded action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Status change.
    SetStatus,
    /// Personalization generation or save.
    Personalize,
    /// Lead to client conversion.
    Convert,
    /// Record deletion.
    Delete,
    /// Campaign launch.
    Campaign,
    /// Spreadsheet import.
    Import,
    /// Payment completion.
    Payment,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SetStatus => "status change",
            Self::Personalize => "personalization",
            Self::Convert => "conversion",
            Self::Delete => "deletion",
            Self::Campaign => "campaign launch",
            Self::Import => "import",
            Self::Payment => "payment completion",
        })
    }
}

type Key = (UserId, Action, String);

/// Tracks in-flight actions.
#[derive(Debug, Default, Clone)]
pub struct SubmissionGuard {
    in_flight: Arc<Mutex<HashSet<Key>>>,
}

impl SubmissionGuard {
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an action on a record.
    ///
    /// The claim is released when the returned ticket is dropped.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DuplicateSubmission` if the same action on the
    /// same record is already in flight for this user.
    pub fn acquire(&self, user: &UserId, action: Action, record: impl fmt::Display) -> Result<Ticket> {
        let key = (*user, action, record.to_string());
        if !self.in_flight.lock().insert(key.clone()) {
            tracing::warn!(user_id = %user, %action, record = %key.2, "duplicate submission rejected");
            return Err(EngineError::DuplicateSubmission(action.to_string()));
        }
        Ok(Ticket {
            in_flight: Arc::clone(&self.in_flight),
            key: Some(key),
        })
    }

    /// Number of actions currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}

/// Proof of a claimed action; releases the claim on drop.
#[derive(Debug)]
pub struct Ticket {
    in_flight: Arc<Mutex<HashSet<Key>>>,
    key: Option<Key>,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.in_flight.lock().remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_is_rejected_until_release() {
        let guard = SubmissionGuard::new();
        let user = UserId::generate();

        let ticket = guard.acquire(&user, Action::Convert, "lead-1").unwrap();
        let err = guard.acquire(&user, Action::Convert, "lead-1").unwrap_err();
        assert!(matches!(err, EngineError::DuplicateSubmission(_)));

        drop(ticket);
        assert_eq!(guard.in_flight(), 0);
        assert!(guard.acquire(&user, Action::Convert, "lead-1").is_ok());
    }

    #[test]
    fn different_keys_do_not_collide() {
        let guard = SubmissionGuard::new();
        let user = UserId::generate();
        let other = UserId::generate();

        let _a = guard.acquire(&user, Action::Convert, "lead-1").unwrap();
        let _b = guard.acquire(&user, Action::Delete, "lead-1").unwrap();
        let _c = guard.acquire(&user, Action::Convert, "lead-2").unwrap();
        let _d = guard.acquire(&other, Action::Convert, "lead-1").unwrap();
        assert_eq!(guard.in_flight(), 4);
    }
}
