//! `FlowLabs` Gateway - HTTP API server
//!
//! This is the main entry point for the gateway service.
//!
//! # Configuration
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `LISTEN_ADDR` | Listen address, default `0.0.0.0:8080` |
//! | `FLOWLABS_BACKEND` | `rest` (default) or `local` |
//! | `SUPABASE_URL` / `SUPABASE_SERVICE_KEY` | Hosted backend, required for `rest` |
//! | `DATA_DIR` | `RocksDB` directory for `local` |
//! | `SUPABASE_ANON_KEY` / `SUPABASE_JWT_SECRET` | Identity service |
//! | `GEMINI_API_KEY` / `GEMINI_MODEL` | Fallback text generation key, model |
//! | `MAKE_WEBHOOK_URL` | Fallback campaign webhook |
//! | `RAZORPAY_KEY_ID` / `RAZORPAY_KEY_SECRET` | Payment gateway |
//! | `CORS_ORIGINS` | Comma-separated allowed origins |
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to use an in-memory identity provider and
//! a mock token verifier. Use tokens in format: `test-token:<user-uuid>`.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "dev-mode")]
use flowlabs_auth::{MockIdentityProvider, MockTokenVerifier};
#[cfg(not(feature = "dev-mode"))]
use flowlabs_auth::{AuthConfig, GoTrueClient, Hs256Verifier};
use flowlabs_connectors::{
    AirtableConfig, AirtableSource, GeminiClient, RazorpayGateway, TextGenerator,
};
#[cfg(not(feature = "dev-mode"))]
use flowlabs_gateway::ConfigError;
use flowlabs_gateway::{create_router, Backend, GatewayState, ServiceConfig, Services};
use flowlabs_store::{RecordStore, RestStore, RestStoreConfig, RocksStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,flowlabs=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FlowLabs Gateway");

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        listen_addr = %config.gateway.listen_addr,
        backend = ?config.backend,
        engine = ?config.engine,
        "Gateway configuration loaded"
    );

    // Record store
    let store: Arc<dyn RecordStore> = match &config.backend {
        Backend::Rest { url, service_key } => {
            tracing::info!(url = %url, "Using hosted record store");
            Arc::new(RestStore::new(&RestStoreConfig::new(url.clone(), service_key.clone()))?)
        }
        Backend::Local { data_dir } => {
            tracing::info!(path = %data_dir.display(), "Opening RocksDB store");
            Arc::new(RocksStore::open(data_dir)?)
        }
    };

    // Connectors
    let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(config.gemini.clone())?);
    let payments = Arc::new(RazorpayGateway::new(config.razorpay.clone())?);
    let source = AirtableSource::new(AirtableConfig::default())?;
    if config.engine.default_text_api_key.is_none() {
        tracing::warn!("No GEMINI_API_KEY set - users must add their own key in Settings");
    }

    let services = Arc::new(Services::new(
        store,
        generator,
        payments,
        source,
        &config.engine,
    ));

    // Identity
    #[cfg(feature = "dev-mode")]
    let (verifier, identity) = {
        tracing::warn!("DEV MODE ENABLED - using mock identity provider");
        tracing::warn!("Use tokens in format: test-token:<user-uuid>");
        (
            Arc::new(MockTokenVerifier),
            Arc::new(MockIdentityProvider::new()),
        )
    };

    #[cfg(not(feature = "dev-mode"))]
    let (verifier, identity) = {
        let auth_url = config
            .auth_url
            .clone()
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let secret = config
            .jwt_secret
            .clone()
            .ok_or(ConfigError::Missing("SUPABASE_JWT_SECRET"))?;
        let identity = GoTrueClient::new(AuthConfig::new(auth_url, config.anon_key.clone()))?;
        (Arc::new(Hs256Verifier::new(&secret)), Arc::new(identity))
    };
    tracing::info!("Identity service initialized");

    let listen_addr = config.gateway.listen_addr.clone();
    let state = GatewayState::new(services, verifier, identity, config.gateway);
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
