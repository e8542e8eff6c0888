//! Settings endpoints.
//!
//! Stored credentials never leave the server in full: responses carry only
//! their last four characters.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowlabs_auth::{IdentityProvider, TokenVerifier};
use flowlabs_engine::{SettingsUpdate, SubscriptionTier, UserSettings};

use super::ApiJson;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Settings as returned to the browser.
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    /// Masked text generation key.
    pub gemini_api_key: Option<String>,
    /// Masked data source key.
    pub airtable_api_key: Option<String>,
    /// Data source base ID.
    pub airtable_base_id: Option<String>,
    /// Campaign webhook URL.
    pub make_webhook_url: Option<String>,
    /// Leads table name.
    pub table_name_leads: String,
    /// Clients table name.
    pub table_name_clients: String,
    /// Logs table name.
    pub table_name_logs: String,
    /// Current plan.
    pub subscription_tier: SubscriptionTier,
    /// Last change.
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserSettings> for SettingsResponse {
    fn from(settings: UserSettings) -> Self {
        Self {
            gemini_api_key: settings.gemini_api_key.as_deref().map(mask),
            airtable_api_key: settings.airtable_api_key.as_deref().map(mask),
            airtable_base_id: settings.airtable_base_id,
            make_webhook_url: settings.make_webhook_url,
            table_name_leads: settings.table_name_leads,
            table_name_clients: settings.table_name_clients,
            table_name_logs: settings.table_name_logs,
            subscription_tier: settings.subscription_tier,
            updated_at: settings.updated_at,
        }
    }
}

/// Fields a user may change. Billing fields are written only by checkout.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsBody {
    /// Text generation key.
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    /// Data source key.
    #[serde(default)]
    pub airtable_api_key: Option<String>,
    /// Data source base ID.
    #[serde(default)]
    pub airtable_base_id: Option<String>,
    /// Campaign webhook URL.
    #[serde(default)]
    pub make_webhook_url: Option<String>,
    /// Leads table name.
    #[serde(default)]
    pub table_name_leads: Option<String>,
    /// Clients table name.
    #[serde(default)]
    pub table_name_clients: Option<String>,
    /// Logs table name.
    #[serde(default)]
    pub table_name_logs: Option<String>,
}

impl From<UpdateSettingsBody> for SettingsUpdate {
    fn from(body: UpdateSettingsBody) -> Self {
        Self {
            gemini_api_key: body.gemini_api_key,
            airtable_api_key: body.airtable_api_key,
            airtable_base_id: body.airtable_base_id,
            make_webhook_url: body.make_webhook_url,
            table_name_leads: body.table_name_leads,
            table_name_clients: body.table_name_clients,
            table_name_logs: body.table_name_logs,
            ..Self::default()
        }
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

// =============================================================================
// Handlers
// =============================================================================

/// The authenticated user's settings.
///
/// # Errors
///
/// Returns an error if the record store fails.
pub async fn get_settings<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let settings = state.services.settings.get(&user.user_id).await?;
    Ok(Json(SettingsResponse::from(settings)))
}

/// Merge changes into the user's settings.
///
/// # Errors
///
/// Returns an error if a field is invalid or the record store fails.
pub async fn update_settings<V, I>(
    State(state): State<Arc<GatewayState<V, I>>>,
    user: AuthUser,
    ApiJson(body): ApiJson<UpdateSettingsBody>,
) -> Result<impl IntoResponse, ApiError>
where
    V: TokenVerifier + 'static,
    I: IdentityProvider + 'static,
{
    let settings = state
        .services
        .settings
        .update(&user.user_id, &SettingsUpdate::from(body))
        .await?;

    Ok(Json(SettingsResponse::from(settings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlabs_engine::UserId;

    #[test]
    fn masks_keep_last_four() {
        assert_eq!(mask("AIzaSyD-1234abcd"), "****abcd");
        assert_eq!(mask("abc"), "****");
    }

    #[test]
    fn response_hides_keys() {
        let mut settings = UserSettings::new(UserId::generate());
        settings.gemini_api_key = Some("AIzaSyD-secret-9876".into());
        settings.airtable_base_id = Some("appBase".into());

        let response = SettingsResponse::from(settings);
        assert_eq!(response.gemini_api_key.as_deref(), Some("****9876"));
        assert!(response.airtable_api_key.is_none());
        assert_eq!(response.airtable_base_id.as_deref(), Some("appBase"));
    }

    #[test]
    fn body_cannot_set_billing_fields() {
        let body: UpdateSettingsBody = serde_json::from_str(
            r#"{"gemini_api_key":"k","subscription_tier":"agency","payment_customer_id":"pay_1"}"#,
        )
        .unwrap();
        let update = SettingsUpdate::from(body);
        assert_eq!(update.gemini_api_key.as_deref(), Some("k"));
        assert!(update.subscription_tier.is_none());
        assert!(update.payment_customer_id.is_none());
    }
}
