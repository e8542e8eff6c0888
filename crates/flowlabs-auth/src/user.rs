//! Signed-in user and profile types.

use std::fmt;

use chrono::{DateTime, Utc};
use flowlabs_core::UserId;
use serde::{Deserialize, Serialize};

/// A signed-in user together with the session tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// User ID assigned by the identity service.
    pub id: UserId,
    /// Account email.
    pub email: String,
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    /// The public part of the user.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: Some(self.email.clone()),
        }
    }
}

impl fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// User details as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    pub id: UserId,
    /// Account email, if any.
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of a sign-up attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account was created and a session was issued immediately.
    SignedIn(AuthUser),
    /// The account was created but the email must be confirmed first.
    ConfirmationRequired {
        /// The email a confirmation link was sent to.
        email: String,
    },
}
