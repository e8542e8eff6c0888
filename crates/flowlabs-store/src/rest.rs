//! Hosted backend storage implementation.
//!
//! This module provides `RestStore`, which speaks the `PostgREST` dialect exposed
//! under `/rest/v1`. Rows are filtered by `user_id` on every request so the
//! owner scoping holds even when the service key bypasses row-level security.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use flowlabs_core::{ClientId, LeadId, UserId};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::schema::{table, LOG_LIST_LIMIT};
use crate::types::{
    AutomationLog, Client, ClientStatus, Lead, LeadPatch, SettingsUpdate, UserSettings,
};
use crate::RecordStore;

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";

/// Configuration for the hosted backend.
#[derive(Clone, Deserialize)]
pub struct RestStoreConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Key sent as both `apikey` and bearer token.
    pub api_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    30
}

impl RestStoreConfig {
    /// Create a configuration with the default timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for RestStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStoreConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Error body returned by `PostgREST`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Serialize)]
struct StatusUpdate {
    status: ClientStatus,
}

#[derive(Serialize)]
struct SettingsRow<'a> {
    user_id: &'a UserId,
    #[serde(flatten)]
    update: &'a SettingsUpdate,
    updated_at: chrono::DateTime<Utc>,
}

/// Record store backed by the hosted `PostgREST` API.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    rest_url: String,
}

impl RestStore {
    /// Create a new store client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(config: &RestStoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| StoreError::Database(format!("invalid api key: {e}")))?;
        api_key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| StoreError::Database(format!("invalid api key: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, &config.base_url))
    }

    /// Create a store with a pre-configured reqwest client.
    ///
    /// The client must already carry the `apikey` and `Authorization` headers.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
        }
    }

    fn url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn eq(value: impl fmt::Display) -> String {
        format!("eq.{value}")
    }

    /// Send a request and turn a non-2xx answer into `StoreError::Remote`.
    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => match body.details {
                Some(details) if !details.is_empty() => format!("{} ({details})", body.message),
                _ => body.message,
            },
            Err(_) => format!("backend returned status {status}"),
        };

        tracing::warn!(status = %status, error = %message, "backend request failed");
        Err(StoreError::Remote {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_rows<T: DeserializeOwned>(request: RequestBuilder) -> Result<Vec<T>> {
        Ok(Self::send(request).await?.json::<Vec<T>>().await?)
    }

    /// Expect exactly one row back from a write; zero rows means no match.
    async fn single_row<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        Self::fetch_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    fn select_owned(&self, table: &str, owner: &UserId) -> RequestBuilder {
        self.client
            .get(self.url(table))
            .query(&[("select", "*".to_string()), ("user_id", Self::eq(owner))])
    }

    async fn delete_owned(
        &self,
        table: &str,
        owner: &UserId,
        id: &(impl fmt::Display + Sync),
    ) -> Result<bool> {
        let request = self
            .client
            .delete(self.url(table))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("id", Self::eq(id)), ("user_id", Self::eq(owner))]);

        let deleted: Vec<serde_json::Value> = Self::fetch_rows(request).await?;
        Ok(!deleted.is_empty())
    }
}

#[async_trait]
impl RecordStore for RestStore {
    // =========================================================================
    // Lead Operations
    // =========================================================================

    async fn list_leads(&self, owner: &UserId) -> Result<Vec<Lead>> {
        let request = self
            .select_owned(table::LEADS, owner)
            .query(&[("order", "created_at.desc")]);
        Self::fetch_rows(request).await
    }

    async fn get_lead(&self, owner: &UserId, lead_id: &LeadId) -> Result<Option<Lead>> {
        let request = self
            .select_owned(table::LEADS, owner)
            .query(&[("id", Self::eq(lead_id)), ("limit", "1".to_string())]);
        Ok(Self::fetch_rows(request).await?.into_iter().next())
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<Lead> {
        let request = self
            .client
            .post(self.url(table::LEADS))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(lead);
        let stored = Self::single_row(request).await?;
        tracing::debug!(lead_id = %lead.id, "inserted lead");
        Ok(stored)
    }

    async fn update_lead(
        &self,
        owner: &UserId,
        lead_id: &LeadId,
        patch: &LeadPatch,
    ) -> Result<Lead> {
        let request = self
            .client
            .patch(self.url(table::LEADS))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("id", Self::eq(lead_id)), ("user_id", Self::eq(owner))])
            .json(patch);
        Self::single_row(request).await
    }

    async fn delete_lead(&self, owner: &UserId, lead_id: &LeadId) -> Result<bool> {
        self.delete_owned(table::LEADS, owner, lead_id).await
    }

    // =========================================================================
    // Client Operations
    // =========================================================================

    async fn list_clients(&self, owner: &UserId) -> Result<Vec<Client>> {
        let request = self
            .select_owned(table::CLIENTS, owner)
            .query(&[("order", "created_at.desc")]);
        Self::fetch_rows(request).await
    }

    async fn insert_client(&self, client: &Client) -> Result<Client> {
        let request = self
            .client
            .post(self.url(table::CLIENTS))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(client);
        let stored = Self::single_row(request).await?;
        tracing::debug!(client_id = %client.id, "inserted client");
        Ok(stored)
    }

    async fn update_client_status(
        &self,
        owner: &UserId,
        client_id: &ClientId,
        status: ClientStatus,
    ) -> Result<Client> {
        let request = self
            .client
            .patch(self.url(table::CLIENTS))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("id", Self::eq(client_id)), ("user_id", Self::eq(owner))])
            .json(&StatusUpdate { status });
        Self::single_row(request).await
    }

    async fn delete_client(&self, owner: &UserId, client_id: &ClientId) -> Result<bool> {
        self.delete_owned(table::CLIENTS, owner, client_id).await
    }

    // =========================================================================
    // Automation Log Operations
    // =========================================================================

    async fn list_logs(&self, owner: &UserId) -> Result<Vec<AutomationLog>> {
        let request = self.select_owned(table::LOGS, owner).query(&[
            ("order", "created_at.desc".to_string()),
            ("limit", LOG_LIST_LIMIT.to_string()),
        ]);
        Self::fetch_rows(request).await
    }

    async fn insert_log(&self, log: &AutomationLog) -> Result<AutomationLog> {
        let request = self
            .client
            .post(self.url(table::LOGS))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(log);
        Self::single_row(request).await
    }

    // =========================================================================
    // Settings Operations
    // =========================================================================

    async fn get_settings(&self, owner: &UserId) -> Result<Option<UserSettings>> {
        let request = self
            .select_owned(table::USER_SETTINGS, owner)
            .query(&[("limit", "1")]);
        Ok(Self::fetch_rows(request).await?.into_iter().next())
    }

    async fn upsert_settings(
        &self,
        owner: &UserId,
        update: &SettingsUpdate,
    ) -> Result<UserSettings> {
        let row = SettingsRow {
            user_id: owner,
            update,
            updated_at: Utc::now(),
        };
        let request = self
            .client
            .post(self.url(table::USER_SETTINGS))
            .header("Prefer", MERGE_DUPLICATES)
            .query(&[("on_conflict", "user_id")])
            .json(&row);
        let settings = Self::single_row(request).await?;
        tracing::debug!(user_id = %owner, "upserted user settings");
        Ok(settings)
    }
}
