//! Spreadsheet data source (Airtable).
//!
//! Reads the leads, clients and logs tables configured in a user's settings
//! and maps their rows into store records owned by that user. Column names
//! are fixed: `Name`, `Company`, `Title`, `Email`, `Status`, `Score`, `Value`,
//! `PersonalizationLine` for leads; `Name`, `Company`, `Email`, `Title`,
//! `Status`, `AutomationsRunning`, `LastActive`, `Avatar` for clients;
//! `Workflow`, `Client`, `Status`, `Timestamp`, `Details` for logs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use flowlabs_core::{ClientId, LeadId, LogId, UserId};
use flowlabs_store::{
    parse_deal_value, sanitize_deal_value, AutomationLog, Client, ClientStatus, Lead, LeadStatus,
    LogStatus, UserSettings, MAX_SCORE,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{remote_error, ConnectorError, Result};

/// Last-active label used when a client row has none.
const DEFAULT_LAST_ACTIVE: &str = "Recently";

/// Connection settings for the data source.
#[derive(Debug, Clone, Deserialize)]
pub struct AirtableConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.airtable.com".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    records: Vec<Row>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Row {
    #[serde(default)]
    created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Row {
    fn text(&self, column: &str) -> Option<String> {
        match self.fields.get(column)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn text_or(&self, column: &str, fallback: &str) -> String {
        self.text(column).unwrap_or_else(|| fallback.to_string())
    }

    fn number(&self, column: &str) -> Option<f64> {
        match self.fields.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => Some(parse_deal_value(s)),
            _ => None,
        }
    }

    /// Parse an enum column through its serde representation.
    fn variant<T: DeserializeOwned>(&self, column: &str) -> Option<T> {
        let raw = self.text(column)?;
        serde_json::from_value(Value::String(raw)).ok()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_time.unwrap_or_else(Utc::now)
    }

    fn attachment_url(&self, column: &str) -> Option<String> {
        self.fields
            .get(column)?
            .get(0)?
            .get("url")?
            .as_str()
            .map(str::to_string)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn into_lead(self, owner: UserId) -> Lead {
        let score = self
            .number("Score")
            .map_or(0, |s| s.round().clamp(0.0, f64::from(MAX_SCORE)) as u8);
        let status = self
            .text("Status")
            .and_then(|s| s.parse::<LeadStatus>().ok())
            .unwrap_or(LeadStatus::New);

        Lead {
            id: LeadId::generate(),
            user_id: owner,
            name: self.text_or("Name", "Unknown"),
            company: Some(self.text_or("Company", "Unknown")),
            title: self.text("Title"),
            email: self.text_or("Email", ""),
            status,
            score,
            personalization_line: self.text("PersonalizationLine"),
            value: self.number("Value").map_or(0.0, sanitize_deal_value),
            created_at: self.created_at(),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn into_client(self, owner: UserId) -> Client {
        let name = self.text_or("Name", "Unknown");
        let avatar = self
            .attachment_url("Avatar")
            .unwrap_or_else(|| crate::avatar_url(&name));
        let automations_running = self
            .number("AutomationsRunning")
            .map_or(0, |n| n.max(0.0).round() as u32);

        Client {
            id: ClientId::generate(),
            user_id: owner,
            company: self.text("Company"),
            email: self.text_or("Email", ""),
            title: self.text("Title"),
            status: self.variant("Status").unwrap_or(ClientStatus::Onboarding),
            automations_running,
            last_active: self.text_or("LastActive", DEFAULT_LAST_ACTIVE),
            avatar,
            created_at: self.created_at(),
            name,
        }
    }

    fn into_log(self, owner: UserId) -> AutomationLog {
        AutomationLog {
            id: LogId::generate(),
            user_id: owner,
            workflow: self.text_or("Workflow", ""),
            client: self.text_or("Client", ""),
            status: self.variant("Status").unwrap_or(LogStatus::Running),
            timestamp: self.text_or("Timestamp", ""),
            details: self.text_or("Details", ""),
            created_at: self.created_at(),
        }
    }
}

/// Client for the spreadsheet data source.
#[derive(Debug, Clone)]
pub struct AirtableSource {
    client: reqwest::Client,
    config: AirtableConfig,
}

impl AirtableSource {
    /// Create a new source client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: AirtableConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Fetch every lead row, owned by the settings' user.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not configured or a page request fails.
    pub async fn fetch_leads(&self, settings: &UserSettings) -> Result<Vec<Lead>> {
        let rows = self.fetch_table(settings, &settings.table_name_leads).await?;
        Ok(rows.into_iter().map(|r| r.into_lead(settings.user_id)).collect())
    }

    /// Fetch every client row, owned by the settings' user.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not configured or a page request fails.
    pub async fn fetch_clients(&self, settings: &UserSettings) -> Result<Vec<Client>> {
        let rows = self
            .fetch_table(settings, &settings.table_name_clients)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| r.into_client(settings.user_id))
            .collect())
    }

    /// Fetch every log row, owned by the settings' user.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not configured or a page request fails.
    pub async fn fetch_logs(&self, settings: &UserSettings) -> Result<Vec<AutomationLog>> {
        let rows = self.fetch_table(settings, &settings.table_name_logs).await?;
        Ok(rows.into_iter().map(|r| r.into_log(settings.user_id)).collect())
    }

    async fn fetch_table(&self, settings: &UserSettings, table: &str) -> Result<Vec<Row>> {
        let api_key = non_blank(settings.airtable_api_key.as_deref())
            .ok_or(ConnectorError::NotConfigured("data source API key"))?;
        let base_id = non_blank(settings.airtable_base_id.as_deref())
            .ok_or(ConnectorError::NotConfigured("data source base ID"))?;

        let mut url = reqwest::Url::parse(&self.config.base_url)
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ConnectorError::Http("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["v0", base_id, table]);

        let mut rows = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let mut request = self.client.get(url.clone()).bearer_auth(api_key);
            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset)]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let err = remote_error(response, |body| {
                    body["error"]["message"]
                        .as_str()
                        .or_else(|| body["error"].as_str())
                        .map(str::to_string)
                })
                .await;
                tracing::warn!(table, error = %err, "data source request failed");
                return Err(err);
            }

            let page: ListPage = response.json().await?;
            rows.extend(page.records);
            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::debug!(table, rows = rows.len(), "fetched data source table");
        Ok(rows)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
