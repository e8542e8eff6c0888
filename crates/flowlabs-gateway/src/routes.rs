//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use flowlabs_auth::{IdentityProvider, TokenVerifier};

use crate::handlers::{
    assistant, auth, billing, campaigns, clients, dashboard, health, imports, leads, logs,
    settings,
};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/auth/signup` - Create an account
/// - `POST /v1/auth/signin` - Sign in
/// - `POST /v1/auth/recover` - Send a password reset email
/// - `GET /v1/billing/plans` - Plan catalogue
///
/// ## Authenticated
/// - `POST /v1/auth/signout` - Sign out
/// - `GET /v1/auth/user` - Current user
/// - `GET /v1/leads` - List leads
/// - `POST /v1/leads` - Create lead
/// - `GET /v1/leads/board` - Prospecting board
/// - `DELETE /v1/leads/:lead_id` - Delete lead
/// - `PUT /v1/leads/:lead_id/status` - Change status
/// - `POST /v1/leads/:lead_id/personalization` - Generate icebreaker
/// - `PUT /v1/leads/:lead_id/personalization` - Save edited icebreaker
/// - `POST /v1/leads/:lead_id/convert` - Convert to client
/// - `GET /v1/clients` - List clients
/// - `DELETE /v1/clients/:client_id` - Delete client
/// - `GET /v1/logs` - List automation logs
/// - `POST /v1/logs` - Record automation log
/// - `GET /v1/dashboard` - Dashboard stats
/// - `POST /v1/dashboard/analysis` - Metrics analysis
/// - `GET /v1/reporting` - Performance report
/// - `GET /v1/activity` - Activity feed
/// - `GET /v1/settings` - Get settings
/// - `PUT /v1/settings` - Update settings
/// - `POST /v1/campaigns` - Launch campaign
/// - `GET /v1/billing/subscription` - Current tier
/// - `POST /v1/billing/checkout` - Start checkout
/// - `POST /v1/billing/complete` - Record payment
/// - `POST /v1/assistant/chat` - Assistant reply
/// - `POST /v1/imports` - Import spreadsheet tables
pub fn create_router<V, I>(state: GatewayState<V, I>) -> Router
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Identity
        .route("/v1/auth/signup", post(auth::sign_up::<V, I>))
        .route("/v1/auth/signin", post(auth::sign_in::<V, I>))
        .route("/v1/auth/recover", post(auth::recover::<V, I>))
        .route("/v1/auth/signout", post(auth::sign_out::<V, I>))
        .route("/v1/auth/user", get(auth::current_user::<V, I>))
        // Leads
        .route(
            "/v1/leads",
            get(leads::list_leads::<V, I>).post(leads::create_lead::<V, I>),
        )
        .route("/v1/leads/board", get(leads::board::<V, I>))
        .route("/v1/leads/:lead_id", delete(leads::delete_lead::<V, I>))
        .route("/v1/leads/:lead_id/status", put(leads::set_status::<V, I>))
        .route(
            "/v1/leads/:lead_id/personalization",
            post(leads::generate_personalization::<V, I>)
                .put(leads::save_personalization::<V, I>),
        )
        .route("/v1/leads/:lead_id/convert", post(leads::convert::<V, I>))
        // Clients and logs
        .route("/v1/clients", get(clients::list_clients::<V, I>))
        .route(
            "/v1/clients/:client_id",
            delete(clients::delete_client::<V, I>),
        )
        .route(
            "/v1/logs",
            get(logs::list_logs::<V, I>).post(logs::record_log::<V, I>),
        )
        // Dashboard
        .route("/v1/dashboard", get(dashboard::dashboard::<V, I>))
        .route(
            "/v1/dashboard/analysis",
            post(dashboard::analysis::<V, I>),
        )
        .route("/v1/reporting", get(dashboard::reporting::<V, I>))
        .route("/v1/activity", get(dashboard::activity::<V, I>))
        // Settings
        .route(
            "/v1/settings",
            get(settings::get_settings::<V, I>).put(settings::update_settings::<V, I>),
        )
        // Campaigns, billing, assistant, imports
        .route("/v1/campaigns", post(campaigns::launch::<V, I>))
        .route("/v1/billing/plans", get(billing::plans::<V, I>))
        .route(
            "/v1/billing/subscription",
            get(billing::subscription::<V, I>),
        )
        .route("/v1/billing/checkout", post(billing::checkout::<V, I>))
        .route("/v1/billing/complete", post(billing::complete::<V, I>))
        .route("/v1/assistant/chat", post(assistant::chat::<V, I>))
        .route("/v1/imports", post(imports::import_all::<V, I>))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(RequestBodyLimitLayer::new(max_body_bytes))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
