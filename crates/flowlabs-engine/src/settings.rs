//! Per-user settings and credential resolution.

use std::sync::Arc;

use flowlabs_core::UserId;
use flowlabs_store::{RecordStore, SettingsUpdate, UserSettings};

use crate::error::{EngineError, Result};
use crate::types::EngineConfig;

/// Reads and writes user settings.
pub struct SettingsService<S: RecordStore + ?Sized> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: RecordStore + ?Sized> SettingsService<S> {
    /// Create a new settings service.
    #[must_use]
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// The user's settings, or defaults if they never saved any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub async fn get(&self, user: &UserId) -> Result<UserSettings> {
        Ok(self
            .store
            .get_settings(user)
            .await?
            .unwrap_or_else(|| UserSettings::new(*user)))
    }

    /// Merge an update into the user's settings, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` for a malformed webhook URL or a blank
    /// table name, or an error if the store write fails.
    pub async fn update(&self, user: &UserId, update: &SettingsUpdate) -> Result<UserSettings> {
        validate_update(update)?;
        let settings = self.store.upsert_settings(user, update).await?;
        tracing::info!(user_id = %user, "Saved settings");
        Ok(settings)
    }

    /// The text generation key for a user.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if neither the user nor the engine
    /// has a key.
    pub async fn text_api_key(&self, user: &UserId) -> Result<String> {
        let settings = self.store.get_settings(user).await?;
        resolve_text_key(settings.as_ref(), &self.config)
    }
}

/// Pick the text generation key: user settings first, then the engine default.
pub(crate) fn resolve_text_key(
    settings: Option<&UserSettings>,
    config: &EngineConfig,
) -> Result<String> {
    settings
        .and_then(UserSettings::text_api_key)
        .or_else(|| {
            config
                .default_text_api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
        })
        .map(str::to_string)
        .ok_or_else(|| EngineError::Configuration("Gemini API key".to_string()))
}

fn validate_update(update: &SettingsUpdate) -> Result<()> {
    if let Some(url) = update.make_webhook_url.as_deref().map(str::trim) {
        if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(EngineError::Validation(
                "Webhook URL must start with http:// or https://".to_string(),
            ));
        }
    }

    let tables = [
        &update.table_name_leads,
        &update.table_name_clients,
        &update.table_name_logs,
    ];
    if tables
        .into_iter()
        .flatten()
        .any(|name| name.trim().is_empty())
    {
        return Err(EngineError::Validation(
            "Table names cannot be empty".to_string(),
        ));
    }
    Ok(())
}
