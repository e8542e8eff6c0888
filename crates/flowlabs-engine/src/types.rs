//! Request types and configuration for engine operations.

use std::fmt;

use flowlabs_connectors::WebhookConfig;
use flowlabs_store::{LeadStatus, LogStatus};
use serde::{Deserialize, Serialize};

use crate::lifecycle::TransitionPolicy;

/// Input for creating a lead by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLeadInput {
    /// Contact name (required, checked by the engine).
    #[serde(default)]
    pub name: String,
    /// Contact email (required, checked by the engine).
    #[serde(default)]
    pub email: String,
    /// Company name.
    #[serde(default)]
    pub company: Option<String>,
    /// Job title.
    #[serde(default)]
    pub title: Option<String>,
    /// Deal value as entered, parsed leniently.
    #[serde(default)]
    pub value: Option<String>,
    /// Requested initial status, honored only when the engine allows it.
    #[serde(default)]
    pub status: Option<LeadStatus>,
}

impl CreateLeadInput {
    /// Create an input with just the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Set the company.
    #[must_use]
    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the deal value text.
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Input for appending an automation log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordLogInput {
    /// Workflow name.
    pub workflow: String,
    /// Name of the client the workflow ran for.
    #[serde(default)]
    pub client: String,
    /// Execution outcome.
    pub status: LogStatus,
    /// Display timestamp; defaults to the time of recording.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Free-text details.
    #[serde(default)]
    pub details: String,
}

/// Configuration for the engine services.
#[derive(Clone, Deserialize)]
pub struct EngineConfig {
    /// Which status changes are accepted.
    #[serde(default)]
    pub transition_policy: TransitionPolicy,
    /// Honor `CreateLeadInput::status` instead of forcing `New`.
    #[serde(default)]
    pub allow_initial_status: bool,
    /// Text generation key used when a user has none in their settings.
    #[serde(default)]
    pub default_text_api_key: Option<String>,
    /// Webhook URL used when a user has none in their settings.
    #[serde(default)]
    pub default_webhook_url: Option<String>,
    /// Campaign webhook settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Number of entries in the activity feed.
    #[serde(default = "EngineConfig::default_activity_limit")]
    pub activity_limit: usize,
}

impl EngineConfig {
    const fn default_activity_limit() -> usize {
        5
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::default(),
            allow_initial_status: false,
            default_text_api_key: None,
            default_webhook_url: None,
            webhook: WebhookConfig::default(),
            activity_limit: Self::default_activity_limit(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("transition_policy", &self.transition_policy)
            .field("allow_initial_status", &self.allow_initial_status)
            .field(
                "default_text_api_key",
                &self.default_text_api_key.as_ref().map(|_| "***"),
            )
            .field("default_webhook_url", &self.default_webhook_url)
            .field("webhook", &self.webhook)
            .field("activity_limit", &self.activity_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
        assert!(!config.allow_initial_status);
        assert_eq!(config.activity_limit, 5);
        assert_eq!(config.webhook.demo_delay_ms, 2000);
    }

    #[test]
    fn engine_config_debug_hides_key() {
        let config = EngineConfig {
            default_text_api_key: Some("AIza-secret".into()),
            ..EngineConfig::default()
        };
        assert!(!format!("{config:?}").contains("AIza-secret"));
    }

    #[test]
    fn create_lead_input_from_json() {
        let input: CreateLeadInput = serde_json::from_str(
            r#"{"name":"Alice","email":"alice@techflow.io","value":"1500","status":"Replied"}"#,
        )
        .unwrap();
        assert_eq!(input.value.as_deref(), Some("1500"));
        assert_eq!(input.status, Some(LeadStatus::Replied));
        assert!(input.company.is_none());
    }

    #[test]
    fn create_lead_input_missing_fields_are_blank() {
        let input: CreateLeadInput = serde_json::from_str(r#"{"name":"Alice"}"#).unwrap();
        assert_eq!(input.name, "Alice");
        assert!(input.email.is_empty());
    }
}
