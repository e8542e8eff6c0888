//! Billing endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use flowlabs_auth::{IdentityProvider, TokenVerifier};
use flowlabs_connectors::Plan;
use flowlabs_engine::{PaymentConfirmation, SubscriptionTier};

use super::settings::SettingsResponse;
use super::ApiJson;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Response for the plan catalogue.
#[derive(Debug, Serialize)]
pub struct PlansResponse {
    /// Plans in display order.
    pub plans: &'static [Plan],
}

/// Response for the current subscription.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    /// The user's current tier.
    pub tier: SubscriptionTier,
}

/// Request to start a checkout.
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    /// The tier to buy.
    pub tier: SubscriptionTier,
    /// Receipt email; defaults to the account email.
    #[serde(default)]
    pub email: Option<String>,
}

/// The plan catalogue.
pub async fn plans<V, I>(State(state): State<Arc<GatewayState<V, I>>>) -> impl IntoResponse
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    Json(PlansResponse {
        plans: state.services.billing.plans(),
    })
}

/// The authenticated user's tier. Never fails: an unknown tier is `free`.
pub async fn subscription<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> impl IntoResponse
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let tier = state.services.billing.current_tier(&user.user_id).await;
    Json(SubscriptionResponse { tier })
}

/// Create a checkout order for a paid tier.
///
/// # Errors
///
/// Returns an error for the free tier, a missing email, an unconfigured
/// gateway or a rejected order.
pub async fn checkout<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let email = body.email.or(user.email).unwrap_or_default();
    let session = state
        .services
        .billing
        .start_checkout(&user.user_id, &email, body.tier)
        .await?;

    Ok(Json(session))
}

/// Record a payment the gateway reported as successful.
///
/// # Errors
///
/// Returns an error for an unknown plan, a blank payment ID or a failed
/// settings write.
pub async fn complete<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    ApiJson(body): ApiJson<PaymentConfirmation>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let settings = state
        .services
        .billing
        .complete_payment(&user.user_id, &body)
        .await?;

    Ok(Json(SettingsResponse::from(settings)))
}
