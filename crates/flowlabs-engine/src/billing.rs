//! Subscription checkout and tier bookkeeping.
//!
//! Checkout itself happens between the browser and the payment gateway. The
//! engine creates the order up front and, once the gateway reports success,
//! records the purchased tier in the user's settings.

use std::sync::Arc;

use flowlabs_connectors::{
    plan, tier_from_plan_name, CheckoutRequest, CheckoutSession, PaymentGateway, Plan, PLANS,
};
use flowlabs_core::UserId;
use flowlabs_store::{RecordStore, SettingsUpdate, SubscriptionTier, UserSettings};
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::guard::{Action, SubmissionGuard};

/// What the gateway reported after a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentConfirmation {
    /// Plan display name, e.g. `Professional`.
    pub plan: String,
    /// Gateway payment ID.
    pub payment_id: String,
    /// Gateway order ID.
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Billing operations.
pub struct BillingService<S, P>
where
    S: RecordStore + ?Sized,
    P: PaymentGateway + ?Sized,
{
    store: Arc<S>,
    gateway: Arc<P>,
    guard: SubmissionGuard,
}

impl<S, P> BillingService<S, P>
where
    S: RecordStore + ?Sized,
    P: PaymentGateway + ?Sized,
{
    /// Create a new billing service.
    #[must_use]
    pub fn new(store: Arc<S>, gateway: Arc<P>) -> Self {
        Self {
            store,
            gateway,
            guard: SubmissionGuard::new(),
        }
    }

    /// Share a submission guard with other services.
    #[must_use]
    pub fn with_guard(mut self, guard: SubmissionGuard) -> Self {
        self.guard = guard;
        self
    }

    /// The plan catalogue.
    #[must_use]
    pub fn plans(&self) -> &'static [Plan] {
        &PLANS
    }

    /// Create a checkout order for a paid tier.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` for the free tier or a blank email,
    /// `EngineError::Configuration` if the gateway has no keys, or
    /// `EngineError::Connector` if the gateway rejects the order.
    pub async fn start_checkout(
        &self,
        user: &UserId,
        email: &str,
        tier: SubscriptionTier,
    ) -> Result<CheckoutSession> {
        if tier == SubscriptionTier::Free {
            return Err(EngineError::Validation(
                "The Free plan does not require payment".to_string(),
            ));
        }
        let email = email.trim();
        if email.is_empty() {
            return Err(EngineError::Validation("Email is required".to_string()));
        }

        let session = self
            .gateway
            .create_checkout(&CheckoutRequest {
                tier,
                email: email.to_string(),
                user_id: *user,
            })
            .await?;

        tracing::info!(
            user_id = %user,
            order_id = %session.order_id,
            plan = %plan(tier).name,
            "Created checkout order"
        );
        Ok(session)
    }

    /// Record a completed payment.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` for an unknown plan or a blank payment
    /// ID, or an error if the settings write fails.
    pub async fn complete_payment(
        &self,
        user: &UserId,
        confirmation: &PaymentConfirmation,
    ) -> Result<UserSettings> {
        let tier = tier_from_plan_name(&confirmation.plan);
        if tier == SubscriptionTier::Free {
            return Err(EngineError::Validation(format!(
                "'{}' is not a paid plan",
                confirmation.plan
            )));
        }
        let payment_id = confirmation.payment_id.trim();
        if payment_id.is_empty() {
            return Err(EngineError::Validation("Payment ID is required".to_string()));
        }

        let _ticket = self.guard.acquire(user, Action::Payment, payment_id)?;
        let update = SettingsUpdate {
            subscription_tier: Some(tier),
            payment_customer_id: Some(payment_id.to_string()),
            payment_subscription_id: confirmation.order_id.clone(),
            ..SettingsUpdate::default()
        };

        let settings = self.store.upsert_settings(user, &update).await.map_err(|e| {
            tracing::error!(
                user_id = %user,
                payment_id = %payment_id,
                error = %e,
                "Payment succeeded but the subscription could not be saved"
            );
            EngineError::Store(e)
        })?;

        tracing::info!(user_id = %user, tier = ?tier, "Subscription upgraded");
        Ok(settings)
    }

    /// The user's current tier; `Free` if unknown.
    pub async fn current_tier(&self, user: &UserId) -> SubscriptionTier {
        match self.store.get_settings(user).await {
            Ok(settings) => settings.map_or(SubscriptionTier::Free, |s| s.subscription_tier),
            Err(e) => {
                tracing::warn!(user_id = %user, error = %e, "Could not load subscription tier");
                SubscriptionTier::Free
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlabs_connectors::{MockPaymentGateway, RazorpayConfig, RazorpayGateway};
    use flowlabs_store::RocksStore;
    use tempfile::TempDir;

    fn billing() -> (BillingService<RocksStore, MockPaymentGateway>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (
            BillingService::new(store, Arc::new(MockPaymentGateway::new())),
            dir,
        )
    }

    #[tokio::test]
    async fn checkout_for_paid_tier() {
        let (billing, _dir) = billing();
        let user = UserId::generate();

        let session = billing
            .start_checkout(&user, "ops@agency.io", SubscriptionTier::Professional)
            .await
            .unwrap();
        assert_eq!(session.amount, 7900);
        assert_eq!(session.description, "Professional Plan Subscription");
        assert_eq!(billing.gateway.requests()[0].user_id, user);
    }

    #[tokio::test]
    async fn free_tier_is_not_purchasable() {
        let (billing, _dir) = billing();
        let err = billing
            .start_checkout(&UserId::generate(), "ops@agency.io", SubscriptionTier::Free)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(billing.gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_gateway() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let gateway = RazorpayGateway::new(RazorpayConfig::default()).unwrap();
        let billing = BillingService::new(store, Arc::new(gateway));

        let err = billing
            .start_checkout(&UserId::generate(), "ops@agency.io", SubscriptionTier::Starter)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn completion_persists_tier() {
        let (billing, _dir) = billing();
        let user = UserId::generate();
        assert_eq!(billing.current_tier(&user).await, SubscriptionTier::Free);

        let settings = billing
            .complete_payment(
                &user,
                &PaymentConfirmation {
                    plan: "Starter".into(),
                    payment_id: "pay_123".into(),
                    order_id: Some("order_test_1".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(settings.subscription_tier, SubscriptionTier::Starter);
        assert_eq!(settings.payment_customer_id.as_deref(), Some("pay_123"));
        assert_eq!(settings.payment_subscription_id.as_deref(), Some("order_test_1"));
        assert_eq!(billing.current_tier(&user).await, SubscriptionTier::Starter);
    }

    #[tokio::test]
    async fn completion_rejects_unknown_plan() {
        let (billing, _dir) = billing();
        let err = billing
            .complete_payment(
                &UserId::generate(),
                &PaymentConfirmation {
                    plan: "Platinum".into(),
                    payment_id: "pay_123".into(),
                    order_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
