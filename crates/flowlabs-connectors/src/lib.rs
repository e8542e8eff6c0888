//! Clients for the external services FlowLabs talks to.
//!
//! Each service sits behind a trait so the engine can be tested with mocks:
//!
//! - [`TextGenerator`]: icebreaker lines, metric analysis and assistant chat
//!   ([`GeminiClient`])
//! - [`CampaignWebhook`]: campaign start triggers ([`HttpCampaignWebhook`],
//!   or [`DemoCampaignWebhook`] when no URL is configured)
//! - [`PaymentGateway`]: checkout orders for subscription plans
//!   ([`RazorpayGateway`])
//!
//! [`AirtableSource`] reads a user's spreadsheet tables for import.
//!
//! Credentials that belong to a user (text API key, webhook URL, data source
//! key) are passed per call, never held by the clients.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod airtable;
pub mod error;
pub mod gemini;
pub mod payment;
pub mod text;
pub mod webhook;

pub use airtable::{AirtableConfig, AirtableSource};
pub use error::{ConnectorError, Result};
pub use gemini::{GeminiClient, GeminiConfig};
pub use payment::{
    plan, tier_from_plan_name, to_minor_units, CheckoutRequest, CheckoutSession, PaymentGateway,
    Plan, RazorpayConfig, RazorpayGateway, CURRENCY, PLANS,
};
pub use text::{
    icebreaker_prompt, metrics_analysis_prompt, ChatMessage, ChatRole, GenerationRequest,
    TextGenerator, ASSISTANT_PERSONA,
};
pub use webhook::{
    webhook_for, CampaignTrigger, CampaignWebhook, DemoCampaignWebhook, HttpCampaignWebhook,
    WebhookConfig,
};

#[cfg(any(test, feature = "test-utils"))]
pub use payment::MockPaymentGateway;
#[cfg(any(test, feature = "test-utils"))]
pub use text::MockTextGenerator;

const AVATAR_SERVICE: &str = "https://ui-avatars.com/api/";

/// Generated initials avatar for a contact name.
#[must_use]
pub fn avatar_url(name: &str) -> String {
    reqwest::Url::parse_with_params(
        AVATAR_SERVICE,
        &[("name", name), ("background", "6366f1"), ("color", "fff")],
    )
    .map_or_else(|_| AVATAR_SERVICE.to_string(), String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_url_encodes_name() {
        assert_eq!(
            avatar_url("Alice Chen"),
            "https://ui-avatars.com/api/?name=Alice+Chen&background=6366f1&color=fff"
        );
        assert!(avatar_url("Zoë & Co").contains("name=Zo%C3%AB+%26+Co"));
    }
}
