//! The current-user session.
//!
//! `SessionManager` is the only writer of the current-user value. Every other
//! component observes it through a `watch::Receiver`, which always holds the
//! latest value and is notified on every auth transition.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::Result;
use crate::provider::IdentityProvider;
use crate::user::{AuthUser, SignUpOutcome, UserProfile};
use crate::validate_credentials;

/// Owns the current-user value and publishes its changes.
pub struct SessionManager<P> {
    provider: Arc<P>,
    current: watch::Sender<Option<AuthUser>>,
}

impl<P: IdentityProvider> SessionManager<P> {
    /// Create a manager with no signed-in user.
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        let (current, _) = watch::channel(None);
        Self { provider, current }
    }

    /// Subscribe to current-user changes.
    ///
    /// The receiver starts with the present value marked as seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }

    /// Snapshot of the current user.
    #[must_use]
    pub fn current(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    fn publish(&self, user: Option<AuthUser>) {
        self.current.send_replace(user);
    }

    /// Register a new account, signing in when the service issues a session.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the identity service fails.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        validate_credentials(email, password)?;
        let outcome = self.provider.sign_up(email.trim(), password).await?;
        if let SignUpOutcome::SignedIn(user) = &outcome {
            self.publish(Some(user.clone()));
        }
        Ok(outcome)
    }

    /// Sign in and publish the new user.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the identity service fails; the current
    /// user is left unchanged in that case.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        validate_credentials(email, password)?;
        let user = self.provider.sign_in(email.trim(), password).await?;
        self.publish(Some(user.clone()));
        Ok(user)
    }

    /// Sign out.
    ///
    /// The local session is cleared even if revoking it remotely fails.
    ///
    /// # Errors
    ///
    /// Returns the remote error after the local session has been cleared.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(user) = self.current() else {
            return Ok(());
        };

        let result = self.provider.sign_out(&user.access_token).await;
        self.publish(None);

        if let Err(e) = &result {
            tracing::warn!(user_id = %user.id, error = %e, "remote sign-out failed, local session cleared");
        } else {
            tracing::info!(user_id = %user.id, "signed out");
        }
        result
    }

    /// Request a password reset email. Does not touch the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity service fails.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.provider.reset_password(email.trim()).await
    }

    /// Re-validate the current session with the identity service.
    ///
    /// A session the service no longer accepts is cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity service fails.
    pub async fn refresh_current_user(&self) -> Result<Option<UserProfile>> {
        let Some(user) = self.current() else {
            return Ok(None);
        };

        let profile = self.provider.current_user(&user.access_token).await?;
        if profile.is_none() {
            tracing::info!(user_id = %user.id, "session no longer valid, clearing");
            self.publish(None);
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::provider::MockIdentityProvider;

    fn manager(provider: MockIdentityProvider) -> SessionManager<MockIdentityProvider> {
        SessionManager::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn sign_in_publishes_user() {
        let sessions = manager(MockIdentityProvider::new().with_account("a@b.io", "secret1"));
        let mut rx = sessions.subscribe();
        assert!(rx.borrow().is_none());

        let user = sessions.sign_in("a@b.io", "secret1").await.unwrap();

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen, Some(user));
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_state_unchanged() {
        let sessions = manager(MockIdentityProvider::new().with_account("a@b.io", "secret1"));
        let rx = sessions.subscribe();

        let err = sessions.sign_in("a@b.io", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!rx.has_changed().unwrap());
        assert!(sessions.current().is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_even_when_remote_fails() {
        let provider = MockIdentityProvider::new()
            .failing_sign_out()
            .with_account("a@b.io", "secret1");
        let sessions = manager(provider);
        sessions.sign_in("a@b.io", "secret1").await.unwrap();

        let result = sessions.sign_out().await;
        assert!(matches!(result, Err(AuthError::Remote { .. })));
        assert!(sessions.current().is_none());
    }

    #[tokio::test]
    async fn sign_out_without_session_is_noop() {
        let sessions = manager(MockIdentityProvider::new());
        sessions.sign_out().await.unwrap();
    }

    #[tokio::test]
    async fn sign_up_with_confirmation_publishes_nothing() {
        let sessions = manager(MockIdentityProvider::new().requiring_confirmation());
        let rx = sessions.subscribe();

        let outcome = sessions.sign_up("new@b.io", "secret1").await.unwrap();
        assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired { .. }));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn sign_up_with_session_publishes_user() {
        let sessions = manager(MockIdentityProvider::new());
        let outcome = sessions.sign_up("new@b.io", "secret1").await.unwrap();
        let SignUpOutcome::SignedIn(user) = outcome else {
            panic!("expected a session");
        };
        assert_eq!(sessions.current(), Some(user));
    }

    #[tokio::test]
    async fn reset_password_does_not_publish() {
        let provider = Arc::new(MockIdentityProvider::new());
        let sessions = SessionManager::new(Arc::clone(&provider));
        let rx = sessions.subscribe();

        sessions.reset_password(" a@b.io ").await.unwrap();
        assert_eq!(provider.reset_requests(), vec!["a@b.io".to_string()]);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn refresh_keeps_valid_session() {
        let sessions = manager(MockIdentityProvider::new().with_account("a@b.io", "secret1"));
        let user = sessions.sign_in("a@b.io", "secret1").await.unwrap();

        let profile = sessions.refresh_current_user().await.unwrap().unwrap();
        assert_eq!(profile.id, user.id);
        assert!(sessions.current().is_some());
    }

    #[tokio::test]
    async fn blank_input_rejected_locally() {
        let sessions = manager(MockIdentityProvider::new());
        let err = sessions.sign_in(" ", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }
}
