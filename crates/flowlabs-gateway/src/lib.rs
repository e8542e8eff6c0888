//! HTTP gateway for the `FlowLabs` CRM.
//!
//! This crate provides the JSON API the dashboard talks to. It handles:
//!
//! - Bearer token authentication against the identity service
//! - REST endpoints for leads, clients, logs, settings and billing
//! - Dashboard, reporting and activity views
//! - Assistant chat, metrics analysis and spreadsheet import
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Dashboard (browser)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ HTTP / JSON
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      flowlabs-gateway                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │   Auth      │ │   Router    │ │   Identity proxy    │   │
//! │  │  Extractor  │ │  + Handlers │ │   (sign-up/in/out)  │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │  Engine  │   │  Record  │   │ Identity │
//!        │ services │   │  store   │   │ service  │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use flowlabs_auth::{AuthConfig, GoTrueClient, Hs256Verifier};
//! use flowlabs_connectors::{
//!     AirtableConfig, AirtableSource, GeminiClient, GeminiConfig, RazorpayConfig,
//!     RazorpayGateway,
//! };
//! use flowlabs_engine::EngineConfig;
//! use flowlabs_gateway::{create_router, GatewayConfig, GatewayState, Services};
//! use flowlabs_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/flowlabs")?);
//! let services = Services::new(
//!     store,
//!     Arc::new(GeminiClient::new(GeminiConfig::default())?),
//!     Arc::new(RazorpayGateway::new(RazorpayConfig::new("rzp_key", "rzp_secret"))?),
//!     AirtableSource::new(AirtableConfig::default())?,
//!     &EngineConfig::default(),
//! );
//!
//! let identity = GoTrueClient::new(AuthConfig::new("https://xyz.supabase.co", "anon-key"))?;
//! let state = GatewayState::new(
//!     Arc::new(services),
//!     Arc::new(Hs256Verifier::new("jwt-secret")),
//!     Arc::new(identity),
//!     GatewayConfig::default(),
//! );
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{Backend, ConfigError, GatewayConfig, ServiceConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{GatewayState, Services};

// Re-export key types for convenience
pub use auth::AuthUser;
