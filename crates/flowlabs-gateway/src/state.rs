//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use flowlabs_auth::{IdentityProvider, TokenVerifier};
use flowlabs_connectors::{AirtableSource, PaymentGateway, TextGenerator};
use flowlabs_engine::{
    Assistant, BillingService, DashboardService, EngineConfig, ImportService, LeadLifecycle,
    SettingsService, SubmissionGuard,
};
use flowlabs_store::RecordStore;

use crate::config::GatewayConfig;

/// The engine services behind the API, over type-erased backends.
pub struct Services {
    /// Lead, client and log operations.
    pub leads: LeadLifecycle<dyn RecordStore, dyn TextGenerator>,
    /// Dashboard, reporting and analysis.
    pub dashboard: DashboardService<dyn RecordStore, dyn TextGenerator>,
    /// Assistant chat.
    pub assistant: Assistant<dyn RecordStore, dyn TextGenerator>,
    /// User settings.
    pub settings: SettingsService<dyn RecordStore>,
    /// Checkout and subscription bookkeeping.
    pub billing: BillingService<dyn RecordStore, dyn PaymentGateway>,
    /// Spreadsheet import.
    pub imports: ImportService<dyn RecordStore>,
}

impl Services {
    /// Build every service over the same backends.
    ///
    /// All services share one submission guard, so a repeated click is
    /// rejected no matter which endpoint it reaches.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn TextGenerator>,
        payments: Arc<dyn PaymentGateway>,
        source: AirtableSource,
        config: &EngineConfig,
    ) -> Self {
        let guard = SubmissionGuard::new();
        Self {
            leads: LeadLifecycle::new(Arc::clone(&store), Arc::clone(&generator), config.clone())
                .with_guard(guard.clone()),
            dashboard: DashboardService::new(
                Arc::clone(&store),
                Arc::clone(&generator),
                config.clone(),
            ),
            assistant: Assistant::new(Arc::clone(&store), generator, config.clone()),
            settings: SettingsService::new(Arc::clone(&store), config.clone()),
            billing: BillingService::new(Arc::clone(&store), payments).with_guard(guard.clone()),
            imports: ImportService::new(store, source).with_guard(guard),
        }
    }
}

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers.
pub struct GatewayState<V, I>
where
    V: TokenVerifier,
    I: IdentityProvider,
{
    /// Engine services.
    pub services: Arc<Services>,
    /// Access token verifier for authentication.
    pub verifier: Arc<V>,
    /// Identity service for sign-up, sign-in and sign-out.
    pub identity: Arc<I>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<V, I> GatewayState<V, I>
where
    V: TokenVerifier,
    I: IdentityProvider,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        services: Arc<Services>,
        verifier: Arc<V>,
        identity: Arc<I>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            services,
            verifier,
            identity,
            config,
        }
    }
}

impl<V, I> Clone for GatewayState<V, I>
where
    V: TokenVerifier,
    I: IdentityProvider,
{
    fn clone(&self) -> Self {
        Self {
            services: Arc::clone(&self.services),
            verifier: Arc::clone(&self.verifier),
            identity: Arc::clone(&self.identity),
            config: self.config.clone(),
        }
    }
}
