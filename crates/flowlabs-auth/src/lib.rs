//! Session management and access-token verification for FlowLabs.
//!
//! Authentication itself is delegated to the hosted identity service. This crate
//! provides:
//!
//! - [`IdentityProvider`]: the seam to the identity service, implemented by
//!   [`GoTrueClient`]
//! - [`SessionManager`]: the single writer of the "current user" value, which
//!   observers follow through a `watch` channel
//! - [`TokenVerifier`]: offline verification of access tokens presented to the
//!   API, implemented by [`Hs256Verifier`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use flowlabs_auth::{AuthConfig, GoTrueClient, SessionManager};
//!
//! # async fn example() -> flowlabs_auth::Result<()> {
//! let config = AuthConfig::new("https://xyz.supabase.co", "anon-key");
//! let sessions = SessionManager::new(Arc::new(GoTrueClient::new(config)?));
//!
//! let mut current = sessions.subscribe();
//! sessions.sign_in("owner@agency.io", "hunter22").await?;
//! current.changed().await.ok();
//! assert!(current.borrow().is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod provider;
pub mod session;
pub mod token;
pub mod user;

pub use client::GoTrueClient;
pub use error::{AuthError, Result};
pub use provider::IdentityProvider;
pub use session::SessionManager;
pub use token::{Hs256Verifier, TokenVerifier, VerifiedToken};
pub use user::{AuthUser, SignUpOutcome, UserProfile};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockIdentityProvider;
#[cfg(any(test, feature = "test-utils"))]
pub use token::MockTokenVerifier;

use std::fmt;

use serde::Deserialize;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Audience claim carried by access tokens issued to signed-in users.
pub const DEFAULT_AUDIENCE: &str = "authenticated";

/// Configuration for the hosted identity service.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Project URL (e.g., `https://xyz.supabase.co`).
    pub base_url: String,
    /// Public anonymous key sent as `apikey`.
    pub anon_key: String,
    /// Expected JWT audience (`aud` claim).
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_audience() -> String {
    DEFAULT_AUDIENCE.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl AuthConfig {
    /// Create a configuration with default audience and timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            audience: default_audience(),
            timeout_secs: default_timeout_secs(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url.trim_end_matches('/'))
    }

    /// Get the sign-up endpoint URL.
    #[must_use]
    pub fn signup_url(&self) -> String {
        self.auth_url("signup")
    }

    /// Get the password grant endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        self.auth_url("token")
    }

    /// Get the logout endpoint URL.
    #[must_use]
    pub fn logout_url(&self) -> String {
        self.auth_url("logout")
    }

    /// Get the password recovery endpoint URL.
    #[must_use]
    pub fn recover_url(&self) -> String {
        self.auth_url("recover")
    }

    /// Get the current-user endpoint URL.
    #[must_use]
    pub fn user_url(&self) -> String {
        self.auth_url("user")
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new("http://localhost:54321", "")
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("base_url", &self.base_url)
            .field("anon_key", &"***")
            .field("audience", &self.audience)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Check email and password before contacting the identity service.
///
/// # Errors
///
/// Returns `InvalidInput` for a blank email or password.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(AuthError::InvalidInput("email is required".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidInput("password is required".to_string()));
    }
    Ok(())
}
