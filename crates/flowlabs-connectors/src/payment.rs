//! Subscription plans and the payment gateway.
//!
//! The gateway only creates orders; checkout itself runs in the payer's
//! browser. Completion is reported back separately and persisted as the
//! user's subscription tier.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use flowlabs_core::UserId;
use flowlabs_store::SubscriptionTier;
use serde::{Deserialize, Serialize};

use crate::error::{remote_error, ConnectorError, Result};

/// Currency all plans are priced in.
pub const CURRENCY: &str = "USD";

/// Merchant name shown on the checkout form.
pub const MERCHANT_NAME: &str = "FlowLabs";

/// A purchasable subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// The tier this plan grants.
    pub tier: SubscriptionTier,
    /// Display name.
    pub name: &'static str,
    /// Monthly price in major currency units.
    pub price: u32,
    /// Billing interval.
    pub interval: &'static str,
    /// Feature bullet points.
    pub features: &'static [&'static str],
    /// Whether this plan is highlighted.
    pub recommended: bool,
}

/// The plan catalogue, cheapest first.
pub static PLANS: [Plan; 4] = [
    Plan {
        tier: SubscriptionTier::Free,
        name: "Free",
        price: 0,
        interval: "month",
        features: &[
            "10 leads per month",
            "Basic AI prospecting",
            "1 client",
            "Community support",
            "Basic analytics",
        ],
        recommended: false,
    },
    Plan {
        tier: SubscriptionTier::Starter,
        name: "Starter",
        price: 29,
        interval: "month",
        features: &[
            "100 leads per month",
            "AI prospecting with Gemini",
            "5 clients",
            "Email support",
            "Advanced analytics",
            "Airtable integration",
            "Make.com webhooks",
        ],
        recommended: true,
    },
    Plan {
        tier: SubscriptionTier::Professional,
        name: "Professional",
        price: 79,
        interval: "month",
        features: &[
            "1,000 leads per month",
            "Priority AI processing",
            "Unlimited clients",
            "Priority support",
            "Custom integrations",
            "Advanced automation",
            "API access",
            "Team collaboration",
        ],
        recommended: false,
    },
    Plan {
        tier: SubscriptionTier::Enterprise,
        name: "Enterprise",
        price: 199,
        interval: "month",
        features: &[
            "Unlimited leads",
            "Dedicated AI resources",
            "Unlimited everything",
            "24/7 phone support",
            "White-label option",
            "Custom development",
            "SLA guarantee",
            "Dedicated account manager",
        ],
        recommended: false,
    },
];

/// Look up the plan for a tier.
#[must_use]
pub fn plan(tier: SubscriptionTier) -> &'static Plan {
    match tier {
        SubscriptionTier::Free => &PLANS[0],
        SubscriptionTier::Starter => &PLANS[1],
        SubscriptionTier::Professional => &PLANS[2],
        SubscriptionTier::Enterprise => &PLANS[3],
    }
}

/// Map a plan display name to its tier; unknown names map to `Free`.
#[must_use]
pub fn tier_from_plan_name(name: &str) -> SubscriptionTier {
    PLANS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .map_or(SubscriptionTier::Free, |p| p.tier)
}

/// Convert a major-unit amount to minor units (cents).
#[must_use]
pub fn to_minor_units(amount: u32) -> u64 {
    u64::from(amount) * 100
}

/// Input for creating a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// The tier being purchased.
    pub tier: SubscriptionTier,
    /// Payer email, prefilled on the form.
    pub email: String,
    /// Payer user ID, echoed back in the order notes.
    pub user_id: UserId,
}

/// Everything the browser needs to open the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Gateway order ID.
    pub order_id: String,
    /// Public key ID for the checkout form.
    pub key_id: String,
    /// Amount in minor units.
    pub amount: u64,
    /// ISO currency code.
    pub currency: String,
    /// Merchant name.
    pub name: String,
    /// Line shown to the payer.
    pub description: String,
    /// Prefilled payer email.
    pub prefill_email: String,
    /// Plan name.
    pub plan: String,
}

/// Trait for payment gateways.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a checkout order.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway is not configured or rejects the order.
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;
}

/// Razorpay credentials.
#[derive(Clone, Default, Deserialize)]
pub struct RazorpayConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Public key ID.
    #[serde(default)]
    pub key_id: String,
    /// Secret key.
    #[serde(default)]
    pub key_secret: String,
}

fn default_base_url() -> String {
    "https://api.razorpay.com".to_string()
}

impl RazorpayConfig {
    /// Create credentials for the production API.
    #[must_use]
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.key_id.trim().is_empty() && !self.key_secret.trim().is_empty()
    }
}

impl fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .field("key_secret", &"***")
            .finish()
    }
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    amount: u64,
    currency: &'a str,
    receipt: String,
    notes: OrderNotes<'a>,
}

#[derive(Serialize)]
struct OrderNotes<'a> {
    plan: &'a str,
    user_id: String,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    amount: u64,
    currency: String,
}

/// Razorpay Orders API client.
#[derive(Debug, Clone)]
pub struct RazorpayGateway {
    client: reqwest::Client,
    config: RazorpayConfig,
}

impl RazorpayGateway {
    /// Create a gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: RazorpayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        if !self.config.is_configured() {
            return Err(ConnectorError::NotConfigured("payment gateway key"));
        }

        let plan = plan(request.tier);
        let body = OrderRequest {
            amount: to_minor_units(plan.price),
            currency: CURRENCY,
            receipt: format!("receipt_{}", chrono::Utc::now().timestamp_millis()),
            notes: OrderNotes {
                plan: plan.name,
                user_id: request.user_id.to_string(),
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/orders",
                self.config.base_url.trim_end_matches('/')
            ))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = remote_error(response, |body| {
                body["error"]["description"].as_str().map(str::to_string)
            })
            .await;
            tracing::error!(plan = plan.name, error = %err, "order creation failed");
            return Err(err);
        }

        let order: OrderResponse = response.json().await?;
        tracing::info!(order_id = %order.id, plan = plan.name, user_id = %request.user_id, "created checkout order");

        Ok(CheckoutSession {
            order_id: order.id,
            key_id: self.config.key_id.clone(),
            amount: order.amount,
            currency: order.currency,
            name: MERCHANT_NAME.to_string(),
            description: format!("{} Plan Subscription", plan.name),
            prefill_email: request.email.clone(),
            plan: plan.name.to_string(),
        })
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockPaymentGateway;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{plan, to_minor_units, CheckoutRequest, CheckoutSession, PaymentGateway};
    use super::{CURRENCY, MERCHANT_NAME};
    use crate::error::Result;

    /// A payment gateway that records requests and issues sequential order IDs.
    #[derive(Debug, Default)]
    pub struct MockPaymentGateway {
        requests: Mutex<Vec<CheckoutRequest>>,
    }

    impl MockPaymentGateway {
        /// Create an empty mock.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every checkout requested so far.
        #[must_use]
        pub fn requests(&self) -> Vec<CheckoutRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for MockPaymentGateway {
        async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            let plan = plan(request.tier);
            Ok(CheckoutSession {
                order_id: format!("order_test_{}", requests.len()),
                key_id: "rzp_test".to_string(),
                amount: to_minor_units(plan.price),
                currency: CURRENCY.to_string(),
                name: MERCHANT_NAME.to_string(),
                description: format!("{} Plan Subscription", plan.name),
                prefill_email: request.email.clone(),
                plan: plan.name.to_string(),
            })
        }
    }
}
