//! Domain types stored in the record store.
//!
//! These types represent the persisted state of leads, clients, automation logs
//! and per-user settings. Field names follow the hosted backend's column names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use flowlabs_core::{ClientId, LeadId, LogId, UserId};
use serde::{Deserialize, Serialize};

use crate::lenient;

/// Lower bound of the lead score range.
pub const MIN_SCORE: u8 = 0;

/// Upper bound of the lead score range.
pub const MAX_SCORE: u8 = 100;

// =============================================================================
// Leads
// =============================================================================

/// A sales prospect tracked through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Unique identifier.
    pub id: LeadId,
    /// Owner user ID.
    pub user_id: UserId,
    /// Contact name.
    pub name: String,
    /// Company name.
    #[serde(default)]
    pub company: Option<String>,
    /// Job title.
    #[serde(default)]
    pub title: Option<String>,
    /// Contact email.
    pub email: String,
    /// Pipeline status.
    pub status: LeadStatus,
    /// Fit score, always within `0..=100`.
    #[serde(default, deserialize_with = "lenient::score")]
    pub score: u8,
    /// Generated icebreaker line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalization_line: Option<String>,
    /// Deal value, never negative.
    #[serde(default, deserialize_with = "lenient::deal_value")]
    pub value: f64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Display string for the lead's company, if any.
    #[must_use]
    pub fn company_or_empty(&self) -> &str {
        self.company.as_deref().unwrap_or("")
    }

    /// Display string for the lead's title, if any.
    #[must_use]
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

/// Pipeline status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    /// Freshly captured.
    New,
    /// Enriched with additional data.
    Enriched,
    /// Outreach sent.
    Contacted,
    /// The prospect replied.
    Replied,
    /// A call is booked.
    Booked,
    /// Converted into a client.
    Closed,
}

impl LeadStatus {
    /// All statuses in pipeline order.
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Enriched,
        Self::Contacted,
        Self::Replied,
        Self::Booked,
        Self::Closed,
    ];

    /// The wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Enriched => "Enriched",
            Self::Contacted => "Contacted",
            Self::Replied => "Replied",
            Self::Booked => "Booked",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A status string that is not a member of the status enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// Partial update applied to a lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeadPatch {
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    /// New personalization line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization_line: Option<String>,
}

impl LeadPatch {
    /// A patch that only changes the status.
    #[must_use]
    pub const fn status(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            personalization_line: None,
        }
    }

    /// A patch that only changes the personalization line.
    #[must_use]
    pub fn personalization(line: impl Into<String>) -> Self {
        Self {
            status: None,
            personalization_line: Some(line.into()),
        }
    }

    /// Apply the patch to a lead in place.
    pub fn apply(&self, lead: &mut Lead) {
        if let Some(status) = self.status {
            lead.status = status;
        }
        if let Some(line) = &self.personalization_line {
            lead.personalization_line = Some(line.clone());
        }
    }
}

/// Parse a deal value from user-entered decimal text.
///
/// Absent, unparseable, negative and non-finite input all yield `0.0`.
#[must_use]
pub fn parse_deal_value(text: &str) -> f64 {
    text.trim().parse::<f64>().map_or(0.0, sanitize_deal_value)
}

/// Clamp a raw deal value into the valid domain.
#[must_use]
pub fn sanitize_deal_value(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        0.0
    }
}

// =============================================================================
// Clients
// =============================================================================

/// An onboarded customer, created by converting a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier.
    pub id: ClientId,
    /// Owner user ID.
    pub user_id: UserId,
    /// Contact name.
    pub name: String,
    /// Company name.
    #[serde(default)]
    pub company: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Job title.
    #[serde(default)]
    pub title: Option<String>,
    /// Fulfillment status.
    pub status: ClientStatus,
    /// Number of automations currently running for this client.
    #[serde(default)]
    pub automations_running: u32,
    /// Human-readable last activity label.
    #[serde(default)]
    pub last_active: String,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Fulfillment status of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientStatus {
    /// Being onboarded.
    Onboarding,
    /// Actively serviced.
    Active,
    /// In maintenance mode.
    Maintenance,
    /// No longer a customer.
    Churned,
}

// =============================================================================
// Automation logs
// =============================================================================

/// An immutable record of one automation execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationLog {
    /// Unique identifier.
    pub id: LogId,
    /// Owner user ID.
    pub user_id: UserId,
    /// Workflow name.
    pub workflow: String,
    /// Name of the client the workflow ran for.
    #[serde(default)]
    pub client: String,
    /// Execution outcome.
    pub status: LogStatus,
    /// Display timestamp as reported by the automation platform.
    #[serde(default)]
    pub timestamp: String,
    /// Free-text details.
    #[serde(default)]
    pub details: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Outcome of an automation execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogStatus {
    /// Completed successfully.
    Success,
    /// Failed.
    Error,
    /// Still running.
    Running,
}

// =============================================================================
// Settings
// =============================================================================

/// Subscription plan of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// Free plan.
    #[default]
    Free,
    /// Starter plan.
    Starter,
    /// Professional plan.
    Professional,
    /// Enterprise plan.
    Enterprise,
}

/// Per-user configuration row.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Owner user ID (primary key).
    pub user_id: UserId,
    /// Text generation API key.
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    /// Spreadsheet data source API key.
    #[serde(default)]
    pub airtable_api_key: Option<String>,
    /// Spreadsheet data source base ID.
    #[serde(default)]
    pub airtable_base_id: Option<String>,
    /// Campaign webhook URL.
    #[serde(default)]
    pub make_webhook_url: Option<String>,
    /// Spreadsheet table holding leads.
    #[serde(default = "UserSettings::default_leads_table")]
    pub table_name_leads: String,
    /// Spreadsheet table holding clients.
    #[serde(default = "UserSettings::default_clients_table")]
    pub table_name_clients: String,
    /// Spreadsheet table holding logs.
    #[serde(default = "UserSettings::default_logs_table")]
    pub table_name_logs: String,
    /// Current subscription plan.
    #[serde(default)]
    pub subscription_tier: SubscriptionTier,
    /// Payment gateway customer/payment reference.
    #[serde(default)]
    pub payment_customer_id: Option<String>,
    /// Payment gateway subscription/order reference.
    #[serde(default)]
    pub payment_subscription_id: Option<String>,
    /// Last modification timestamp.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserSettings {
    fn default_leads_table() -> String {
        "Leads".to_string()
    }

    fn default_clients_table() -> String {
        "Clients".to_string()
    }

    fn default_logs_table() -> String {
        "Logs".to_string()
    }

    /// Settings with every field at its default for the given user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            gemini_api_key: None,
            airtable_api_key: None,
            airtable_base_id: None,
            make_webhook_url: None,
            table_name_leads: Self::default_leads_table(),
            table_name_clients: Self::default_clients_table(),
            table_name_logs: Self::default_logs_table(),
            subscription_tier: SubscriptionTier::Free,
            payment_customer_id: None,
            payment_subscription_id: None,
            updated_at: None,
        }
    }

    /// The text generation key, if set and non-blank.
    #[must_use]
    pub fn text_api_key(&self) -> Option<&str> {
        non_blank(self.gemini_api_key.as_deref())
    }

    /// The campaign webhook URL, if set and non-blank.
    #[must_use]
    pub fn webhook_url(&self) -> Option<&str> {
        non_blank(self.make_webhook_url.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn mask(value: Option<&String>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "***",
        _ => "<unset>",
    }
}

impl fmt::Debug for UserSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSettings")
            .field("user_id", &self.user_id)
            .field("gemini_api_key", &mask(self.gemini_api_key.as_ref()))
            .field("airtable_api_key", &mask(self.airtable_api_key.as_ref()))
            .field("airtable_base_id", &self.airtable_base_id)
            .field("make_webhook_url", &self.make_webhook_url)
            .field("table_name_leads", &self.table_name_leads)
            .field("table_name_clients", &self.table_name_clients)
            .field("table_name_logs", &self.table_name_logs)
            .field("subscription_tier", &self.subscription_tier)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// A partial settings write; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    /// Text generation API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    /// Spreadsheet data source API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airtable_api_key: Option<String>,
    /// Spreadsheet data source base ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airtable_base_id: Option<String>,
    /// Campaign webhook URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make_webhook_url: Option<String>,
    /// Spreadsheet table holding leads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name_leads: Option<String>,
    /// Spreadsheet table holding clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name_clients: Option<String>,
    /// Spreadsheet table holding logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name_logs: Option<String>,
    /// Subscription plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_tier: Option<SubscriptionTier>,
    /// Payment gateway customer/payment reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_customer_id: Option<String>,
    /// Payment gateway subscription/order reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_subscription_id: Option<String>,
}

impl SettingsUpdate {
    /// Merge this update over existing settings.
    #[must_use]
    pub fn apply(&self, mut settings: UserSettings) -> UserSettings {
        fn set<T: Clone>(slot: &mut T, value: Option<&T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        fn set_opt(slot: &mut Option<String>, value: Option<&String>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        set_opt(&mut settings.gemini_api_key, self.gemini_api_key.as_ref());
        set_opt(&mut settings.airtable_api_key, self.airtable_api_key.as_ref());
        set_opt(&mut settings.airtable_base_id, self.airtable_base_id.as_ref());
        set_opt(&mut settings.make_webhook_url, self.make_webhook_url.as_ref());
        set(&mut settings.table_name_leads, self.table_name_leads.as_ref());
        set(&mut settings.table_name_clients, self.table_name_clients.as_ref());
        set(&mut settings.table_name_logs, self.table_name_logs.as_ref());
        set(
            &mut settings.subscription_tier,
            self.subscription_tier.as_ref(),
        );
        set_opt(
            &mut settings.payment_customer_id,
            self.payment_customer_id.as_ref(),
        );
        set_opt(
            &mut settings.payment_subscription_id,
            self.payment_subscription_id.as_ref(),
        );
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead_json(extra: &str) -> String {
        format!(
            r#"{{
                "id": "{}",
                "user_id": "{}",
                "name": "Alice Chen",
                "email": "alice@techflow.io",
                "status": "New",
                "created_at": "2024-01-01T00:00:00Z"{extra}
            }}"#,
            LeadId::generate(),
            UserId::generate()
        )
    }

    #[test]
    fn value_accepts_numbers_and_strings() {
        let lead: Lead = serde_json::from_str(&lead_json(r#", "value": 1500.5"#)).unwrap();
        assert!((lead.value - 1500.5).abs() < f64::EPSILON);

        let lead: Lead = serde_json::from_str(&lead_json(r#", "value": "2000""#)).unwrap();
        assert!((lead.value - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn value_degrades_to_zero() {
        for raw in [r#", "value": null"#, r#", "value": "abc""#, r#", "value": -5"#, ""] {
            let lead: Lead = serde_json::from_str(&lead_json(raw)).unwrap();
            assert!(lead.value.abs() < f64::EPSILON, "input {raw:?}");
        }
    }

    #[test]
    fn score_is_clamped() {
        let lead: Lead = serde_json::from_str(&lead_json(r#", "score": 250"#)).unwrap();
        assert_eq!(lead.score, MAX_SCORE);

        let lead: Lead = serde_json::from_str(&lead_json(r#", "score": -3"#)).unwrap();
        assert_eq!(lead.score, MIN_SCORE);

        let lead: Lead = serde_json::from_str(&lead_json(r#", "score": 85"#)).unwrap();
        assert_eq!(lead.score, 85);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("closed".parse::<LeadStatus>().unwrap(), LeadStatus::Closed);
        assert_eq!(" Booked ".parse::<LeadStatus>().unwrap(), LeadStatus::Booked);
        assert!("Won".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn status_wire_format() {
        assert_eq!(
            serde_json::to_string(&LeadStatus::Contacted).unwrap(),
            "\"Contacted\""
        );
        assert_eq!(
            serde_json::to_string(&SubscriptionTier::Professional).unwrap(),
            "\"professional\""
        );
    }

    #[test]
    fn parse_deal_value_defaults() {
        assert!((parse_deal_value("1000") - 1000.0).abs() < f64::EPSILON);
        assert!((parse_deal_value(" 12.5 ") - 12.5).abs() < f64::EPSILON);
        assert!(parse_deal_value("").abs() < f64::EPSILON);
        assert!(parse_deal_value("ten").abs() < f64::EPSILON);
        assert!(parse_deal_value("-3").abs() < f64::EPSILON);
        assert!(parse_deal_value("inf").abs() < f64::EPSILON);
    }

    #[test]
    fn patch_only_serializes_set_fields() {
        let json = serde_json::to_string(&LeadPatch::status(LeadStatus::Closed)).unwrap();
        assert_eq!(json, r#"{"status":"Closed"}"#);
    }

    #[test]
    fn settings_update_merges() {
        let user_id = UserId::generate();
        let mut existing = UserSettings::new(user_id);
        existing.gemini_api_key = Some("old".into());
        existing.make_webhook_url = Some("https://hook".into());

        let update = SettingsUpdate {
            gemini_api_key: Some("new".into()),
            subscription_tier: Some(SubscriptionTier::Starter),
            ..Default::default()
        };
        let merged = update.apply(existing);

        assert_eq!(merged.gemini_api_key.as_deref(), Some("new"));
        assert_eq!(merged.make_webhook_url.as_deref(), Some("https://hook"));
        assert_eq!(merged.subscription_tier, SubscriptionTier::Starter);
        assert_eq!(merged.table_name_leads, "Leads");
    }

    #[test]
    fn settings_debug_masks_keys() {
        let mut settings = UserSettings::new(UserId::generate());
        settings.gemini_api_key = Some("secret-key".into());
        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn blank_credentials_are_absent() {
        let mut settings = UserSettings::new(UserId::generate());
        settings.gemini_api_key = Some("   ".into());
        assert!(settings.text_api_key().is_none());
        settings.make_webhook_url = Some("https://hook.example".into());
        assert_eq!(settings.webhook_url(), Some("https://hook.example"));
    }

    #[test]
    fn settings_defaults_from_sparse_row() {
        let json = format!(r#"{{"user_id": "{}"}}"#, UserId::generate());
        let settings: UserSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings.table_name_clients, "Clients");
        assert_eq!(settings.subscription_tier, SubscriptionTier::Free);
    }
}
