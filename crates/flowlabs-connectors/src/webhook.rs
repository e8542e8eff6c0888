//! Campaign trigger webhook.
//!
//! Starting a campaign posts the selected lead IDs to an automation platform
//! webhook. Without a configured URL the call is simulated (demo mode).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use flowlabs_core::LeadId;
use serde::{Deserialize, Serialize};

use crate::error::{remote_error, ConnectorError, Result};

/// Action name sent with every campaign trigger.
pub const START_CAMPAIGN: &str = "start_campaign";

/// Body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignTrigger {
    /// Always `start_campaign`.
    pub action: &'static str,
    /// Leads entering the campaign.
    pub lead_ids: Vec<LeadId>,
    /// When the campaign was triggered (RFC 3339).
    pub timestamp: String,
}

impl CampaignTrigger {
    /// Create a trigger for the given leads.
    #[must_use]
    pub fn new(lead_ids: Vec<LeadId>, at: DateTime<Utc>) -> Self {
        Self {
            action: START_CAMPAIGN,
            lead_ids,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Trait for campaign trigger delivery.
#[async_trait]
pub trait CampaignWebhook: Send + Sync {
    /// Deliver a campaign trigger.
    ///
    /// # Errors
    ///
    /// Returns an error if the webhook does not accept the trigger.
    async fn trigger(&self, trigger: &CampaignTrigger) -> Result<()>;

    /// Whether this webhook only simulates delivery.
    fn is_demo(&self) -> bool {
        false
    }
}

/// Webhook settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Simulated delivery time in demo mode, in milliseconds.
    #[serde(default = "default_demo_delay_ms")]
    pub demo_delay_ms: u64,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_demo_delay_ms() -> u64 {
    2000
}

const fn default_timeout_secs() -> u64 {
    15
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            demo_delay_ms: default_demo_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Posts triggers to a real webhook URL.
#[derive(Debug, Clone)]
pub struct HttpCampaignWebhook {
    client: reqwest::Client,
    url: String,
}

impl HttpCampaignWebhook {
    /// Create a webhook caller with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(url: impl Into<String>, config: &WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        Ok(Self::with_client(client, url))
    }

    /// Create a webhook caller with a shared reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CampaignWebhook for HttpCampaignWebhook {
    async fn trigger(&self, trigger: &CampaignTrigger) -> Result<()> {
        let response = self.client.post(&self.url).json(trigger).send().await?;

        if response.status().is_success() {
            tracing::info!(leads = trigger.lead_ids.len(), "campaign webhook accepted trigger");
            Ok(())
        } else {
            let err = remote_error(response, |body| {
                body.as_str()
                    .map(str::to_string)
                    .or_else(|| body["message"].as_str().map(str::to_string))
            })
            .await;
            tracing::error!(error = %err, "campaign webhook failed");
            Err(err)
        }
    }
}

/// Simulates a webhook: waits, then succeeds.
#[derive(Debug, Clone)]
pub struct DemoCampaignWebhook {
    delay: Duration,
}

impl DemoCampaignWebhook {
    /// Create a demo webhook with the given simulated delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl CampaignWebhook for DemoCampaignWebhook {
    async fn trigger(&self, trigger: &CampaignTrigger) -> Result<()> {
        tracing::info!(
            leads = trigger.lead_ids.len(),
            "no webhook configured, simulating campaign trigger"
        );
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    fn is_demo(&self) -> bool {
        true
    }
}

/// Pick the webhook for a possibly-configured URL.
///
/// A blank or missing URL selects demo mode.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn webhook_for(url: Option<&str>, config: &WebhookConfig) -> Result<Arc<dyn CampaignWebhook>> {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Ok(Arc::new(HttpCampaignWebhook::new(url, config)?)),
        None => Ok(Arc::new(DemoCampaignWebhook::new(Duration::from_millis(
            config.demo_delay_ms,
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn trigger_wire_format() {
        let id = LeadId::generate();
        let at = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let body = serde_json::to_value(CampaignTrigger::new(vec![id], at)).unwrap();
        assert_eq!(
            body,
            json!({
                "action": "start_campaign",
                "leadIds": [id.to_string()],
                "timestamp": "2024-03-01T10:00:00.000Z"
            })
        );
    }

    #[tokio::test]
    async fn http_webhook_posts_trigger() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(json!({"action": "start_campaign"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("Accepted"))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = webhook_for(
            Some(&format!("{}/hook", server.uri())),
            &WebhookConfig::default(),
        )
        .unwrap();
        assert!(!webhook.is_demo());
        webhook
            .trigger(&CampaignTrigger::new(vec![LeadId::generate()], Utc::now()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn http_webhook_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(410).set_body_string("There is no scenario listening"))
            .mount(&server)
            .await;

        let webhook = HttpCampaignWebhook::new(server.uri(), &WebhookConfig::default()).unwrap();
        let err = webhook
            .trigger(&CampaignTrigger::new(vec![], Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Remote { status: 410, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn demo_webhook_waits_then_succeeds() {
        let webhook = webhook_for(Some("   "), &WebhookConfig::default()).unwrap();
        assert!(webhook.is_demo());

        let started = tokio::time::Instant::now();
        webhook
            .trigger(&CampaignTrigger::new(vec![LeadId::generate()], Utc::now()))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }
}
