//! Gateway configuration types.
//!
//! [`GatewayConfig`] covers the HTTP server itself. [`ServiceConfig`] collects
//! everything the binary needs to wire up the backends and is read from the
//! process environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use flowlabs_connectors::{GeminiConfig, RazorpayConfig};
use flowlabs_engine::EngineConfig;

/// Configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        // Leaves room for a slow text generation call.
        60
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// Where records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// The hosted backend over its REST API.
    Rest {
        /// Project URL.
        url: String,
        /// Service key.
        service_key: String,
    },
    /// A local `RocksDB` database.
    Local {
        /// Database directory.
        data_dir: PathBuf,
    },
}

/// Errors in the process environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} must be set")]
    Missing(&'static str),
    /// A variable has an unusable value.
    #[error("{name} is invalid: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP server settings.
    pub gateway: GatewayConfig,
    /// Record backend.
    pub backend: Backend,
    /// Identity service URL; `None` means the record backend URL.
    pub auth_url: Option<String>,
    /// Public key for the identity service.
    pub anon_key: String,
    /// Secret used to verify access tokens.
    pub jwt_secret: Option<String>,
    /// Text generation client settings.
    pub gemini: GeminiConfig,
    /// Payment gateway credentials.
    pub razorpay: RazorpayConfig,
    /// Engine settings, including server-wide credential fallbacks.
    pub engine: EngineConfig,
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut gateway = GatewayConfig::default();
        if let Some(addr) = var("LISTEN_ADDR") {
            gateway.listen_addr = addr;
        }
        if let Some(origins) = var("CORS_ORIGINS") {
            gateway.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        let supabase_url = var("SUPABASE_URL");
        let backend = match var("FLOWLABS_BACKEND").as_deref() {
            None | Some("rest") => Backend::Rest {
                url: supabase_url.clone().ok_or(ConfigError::Missing("SUPABASE_URL"))?,
                service_key: var("SUPABASE_SERVICE_KEY")
                    .ok_or(ConfigError::Missing("SUPABASE_SERVICE_KEY"))?,
            },
            Some("local") => Backend::Local {
                data_dir: var("DATA_DIR").map_or_else(|| PathBuf::from("/data/flowlabs"), PathBuf::from),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "FLOWLABS_BACKEND",
                    reason: format!("expected 'rest' or 'local', got '{other}'"),
                })
            }
        };

        let mut gemini = GeminiConfig::default();
        if let Some(model) = var("GEMINI_MODEL") {
            gemini.model = model;
        }

        let razorpay = RazorpayConfig::new(
            var("RAZORPAY_KEY_ID").unwrap_or_default(),
            var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
        );

        let engine = EngineConfig {
            default_text_api_key: var("GEMINI_API_KEY"),
            default_webhook_url: var("MAKE_WEBHOOK_URL"),
            ..EngineConfig::default()
        };

        Ok(Self {
            gateway,
            backend,
            auth_url: supabase_url,
            anon_key: var("SUPABASE_ANON_KEY").unwrap_or_default(),
            jwt_secret: var("SUPABASE_JWT_SECRET"),
            gemini,
            razorpay,
            engine,
        })
    }
}
