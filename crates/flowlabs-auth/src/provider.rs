//! The identity service seam.

use async_trait::async_trait;

use crate::error::Result;
use crate::user::{AuthUser, SignUpOutcome, UserProfile};

/// Trait for identity service operations.
///
/// This trait abstracts the identity service, allowing for mock implementations
/// in tests.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account exists, the password is too weak or the
    /// service fails.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome>;

    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` or `EmailNotConfirmed` on rejection.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    /// Revoke the session behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails.
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Send a password reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails.
    async fn reset_password(&self, email: &str) -> Result<()>;

    /// Look up the user behind an access token.
    ///
    /// Returns `None` if the token is no longer accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails.
    async fn current_user(&self, access_token: &str) -> Result<Option<UserProfile>>;
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockIdentityProvider;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use flowlabs_core::UserId;
    use parking_lot::Mutex;

    use super::IdentityProvider;
    use crate::error::{AuthError, Result};
    use crate::user::{AuthUser, SignUpOutcome, UserProfile};
    use crate::MIN_PASSWORD_LEN;

    struct Account {
        id: UserId,
        password: String,
    }

    /// An in-memory identity provider for testing.
    ///
    /// Access tokens are `test-token:<user uuid>`, matching `MockTokenVerifier`.
    #[derive(Default)]
    pub struct MockIdentityProvider {
        accounts: Mutex<HashMap<String, Account>>,
        require_confirmation: bool,
        fail_sign_out: bool,
        resets: Mutex<Vec<String>>,
    }

    impl MockIdentityProvider {
        /// Create an empty provider.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make sign-up return `ConfirmationRequired` instead of a session.
        #[must_use]
        pub fn requiring_confirmation(mut self) -> Self {
            self.require_confirmation = true;
            self
        }

        /// Make `sign_out` fail with a remote error.
        #[must_use]
        pub fn failing_sign_out(mut self) -> Self {
            self.fail_sign_out = true;
            self
        }

        /// Register an account directly.
        #[must_use]
        pub fn with_account(self, email: &str, password: &str) -> Self {
            self.accounts.lock().insert(
                email.to_string(),
                Account {
                    id: UserId::generate(),
                    password: password.to_string(),
                },
            );
            self
        }

        /// Emails that requested a password reset.
        #[must_use]
        pub fn reset_requests(&self) -> Vec<String> {
            self.resets.lock().clone()
        }

        fn session(id: UserId, email: &str) -> AuthUser {
            AuthUser {
                id,
                email: email.to_string(),
                access_token: format!("test-token:{id}"),
                refresh_token: format!("refresh:{id}"),
                expires_at: Utc::now() + Duration::hours(1),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for MockIdentityProvider {
        async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
            if password.len() < MIN_PASSWORD_LEN {
                return Err(AuthError::WeakPassword(format!(
                    "password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(email) {
                return Err(AuthError::UserExists);
            }
            let id = UserId::generate();
            accounts.insert(
                email.to_string(),
                Account {
                    id,
                    password: password.to_string(),
                },
            );
            if self.require_confirmation {
                Ok(SignUpOutcome::ConfirmationRequired {
                    email: email.to_string(),
                })
            } else {
                Ok(SignUpOutcome::SignedIn(Self::session(id, email)))
            }
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
            let accounts = self.accounts.lock();
            match accounts.get(email) {
                Some(account) if account.password == password => {
                    Ok(Self::session(account.id, email))
                }
                _ => Err(AuthError::InvalidCredentials),
            }
        }

        async fn sign_out(&self, _access_token: &str) -> Result<()> {
            if self.fail_sign_out {
                return Err(AuthError::Remote {
                    status: 503,
                    message: "identity service unavailable".to_string(),
                });
            }
            Ok(())
        }

        async fn reset_password(&self, email: &str) -> Result<()> {
            self.resets.lock().push(email.to_string());
            Ok(())
        }

        async fn current_user(&self, access_token: &str) -> Result<Option<UserProfile>> {
            let Some(raw) = access_token.strip_prefix("test-token:") else {
                return Ok(None);
            };
            let Ok(id) = raw.parse::<UserId>() else {
                return Ok(None);
            };
            let accounts = self.accounts.lock();
            Ok(accounts
                .iter()
                .find(|(_, account)| account.id == id)
                .map(|(email, account)| UserProfile {
                    id: account.id,
                    email: Some(email.clone()),
                }))
        }
    }
}
