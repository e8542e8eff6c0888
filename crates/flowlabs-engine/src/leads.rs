//! Lead lifecycle operations.
//!
//! [`LeadLifecycle`] owns every mutation of a lead: creation with a random
//! initial score, status changes under the configured
//! [`TransitionPolicy`](crate::lifecycle::TransitionPolicy), icebreaker
//! generation, conversion into a client, and campaign launch.
//!
//! # Conversion
//!
//! Converting a lead touches two collections without a shared transaction, so
//! it runs as two ordered steps:
//!
//! 1. insert the client; on failure the lead is left untouched
//! 2. close the lead; on failure the client stays and the caller gets
//!    [`EngineError::PartialConversion`]
//!
//! There is no compensating delete of the client.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use flowlabs_connectors::{
    avatar_url, icebreaker_prompt, webhook_for, CampaignTrigger, ConnectorError, TextGenerator,
};
use flowlabs_core::{ClientId, LeadId, LogId, UserId};
use flowlabs_store::{
    parse_deal_value, AutomationLog, Client, ClientStatus, Lead, LeadPatch, LeadStatus,
    RecordStore, StoreError,
};
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::guard::{Action, SubmissionGuard};
use crate::lifecycle::TransitionCause;
use crate::random::{RandomSource, ThreadRandom, INITIAL_SCORE_RANGE};
use crate::settings::resolve_text_key;
use crate::types::{CreateLeadInput, EngineConfig, RecordLogInput};

/// Shown instead of an icebreaker when generation fails.
pub const PERSONALIZATION_PLACEHOLDER: &str = "Error: Check API Key in Settings.";

/// Shown instead of an icebreaker when the model returns no text.
pub const EMPTY_PERSONALIZATION: &str = "Could not generate personalization.";

/// Last-active label of a freshly converted client.
pub const CONVERTED_LAST_ACTIVE: &str = "Just now";

/// Result of an icebreaker generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersonalizationOutcome {
    /// The line was generated and stored on the lead.
    Generated {
        /// The updated lead.
        lead: Lead,
    },
    /// Generation failed; the lead was not modified.
    Failed {
        /// Text to show in place of the line.
        placeholder: String,
        /// Why generation failed.
        reason: String,
    },
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    /// The new client.
    pub client: Client,
    /// The source lead, now closed.
    pub lead: Lead,
}

/// Result of a campaign launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignReport {
    /// Leads sent to the webhook.
    pub triggered: Vec<LeadId>,
    /// Leads moved to `Contacted`.
    pub updated: Vec<LeadId>,
    /// Leads whose status update failed after the trigger.
    pub failed: Vec<LeadId>,
    /// Whether the trigger was simulated.
    pub demo: bool,
}

/// Lead lifecycle service.
pub struct LeadLifecycle<S, G>
where
    S: RecordStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    store: Arc<S>,
    generator: Arc<G>,
    random: Box<dyn RandomSource>,
    guard: SubmissionGuard,
    config: EngineConfig,
}

impl<S, G> LeadLifecycle<S, G>
where
    S: RecordStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    /// Create a new lifecycle service using thread-local randomness.
    #[must_use]
    pub fn new(store: Arc<S>, generator: Arc<G>, config: EngineConfig) -> Self {
        Self {
            store,
            generator,
            random: Box::new(ThreadRandom),
            guard: SubmissionGuard::new(),
            config,
        }
    }

    /// Replace the source of initial scores.
    #[must_use]
    pub fn with_random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Share a submission guard with other services.
    #[must_use]
    pub fn with_guard(mut self, guard: SubmissionGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn owned_lead(&self, user: &UserId, lead_id: &LeadId) -> Result<Lead> {
        self.store
            .get_lead(user, lead_id)
            .await?
            .ok_or_else(|| EngineError::lead_not_found(lead_id))
    }

    async fn patch_lead(&self, user: &UserId, lead_id: &LeadId, patch: &LeadPatch) -> Result<Lead> {
        self.store
            .update_lead(user, lead_id, patch)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => EngineError::lead_not_found(lead_id),
                other => EngineError::Store(other),
            })
    }

    // =========================================================================
    // Leads
    // =========================================================================

    /// List the user's leads, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub async fn list_leads(&self, user: &UserId) -> Result<Vec<Lead>> {
        Ok(self.store.list_leads(user).await?)
    }

    /// Create a lead from manual entry.
    ///
    /// The lead starts as `New` with a score drawn from `60..100`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if the name is empty or the email is
    /// not plausible, or an error if the store write fails.
    pub async fn create_lead(&self, user: &UserId, input: CreateLeadInput) -> Result<Lead> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation("Name is required".to_string()));
        }
        let email = input.email.trim();
        if email.is_empty() {
            return Err(EngineError::Validation("Email is required".to_string()));
        }
        if !is_plausible_email(email) {
            return Err(EngineError::Validation(format!(
                "'{email}' is not a valid email address"
            )));
        }

        let status = match input.status {
            Some(status) if self.config.allow_initial_status => status,
            _ => LeadStatus::New,
        };

        let lead = Lead {
            id: LeadId::generate(),
            user_id: *user,
            name: name.to_string(),
            company: non_blank(input.company),
            title: non_blank(input.title),
            email: email.to_string(),
            status,
            score: self.random.next_in(INITIAL_SCORE_RANGE),
            personalization_line: None,
            value: input.value.as_deref().map_or(0.0, parse_deal_value),
            created_at: Utc::now(),
        };

        let lead = self.store.insert_lead(&lead).await?;

        tracing::info!(
            lead_id = %lead.id,
            user_id = %user,
            score = lead.score,
            "Created lead"
        );

        Ok(lead)
    }

    /// Change a lead's status.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` if the lead does not exist,
    /// `EngineError::Validation` if the transition policy forbids the change,
    /// or `EngineError::DuplicateSubmission` if the same change is in flight.
    pub async fn set_status(
        &self,
        user: &UserId,
        lead_id: &LeadId,
        status: LeadStatus,
    ) -> Result<Lead> {
        let _ticket = self.guard.acquire(user, Action::SetStatus, lead_id)?;

        let lead = self.owned_lead(user, lead_id).await?;
        self.config.transition_policy.validate(
            lead_id,
            lead.status,
            status,
            TransitionCause::Manual,
        )?;

        let updated = self
            .patch_lead(user, lead_id, &LeadPatch::status(status))
            .await?;

        tracing::info!(lead_id = %lead_id, from = %lead.status, to = %status, "Updated lead status");

        Ok(updated)
    }

    /// Delete a lead.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the store operation fails.
    pub async fn delete_lead(&self, user: &UserId, lead_id: &LeadId) -> Result<bool> {
        let _ticket = self.guard.acquire(user, Action::Delete, lead_id)?;
        let removed = self.store.delete_lead(user, lead_id).await?;
        tracing::info!(lead_id = %lead_id, user_id = %user, removed, "Deleted lead");
        Ok(removed)
    }

    // =========================================================================
    // Personalization
    // =========================================================================

    /// Generate and store an icebreaker line for a lead.
    ///
    /// A generation failure is not an error: the lead is left unchanged and a
    /// placeholder is returned instead.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if no text generation key is
    /// available (checked before any generation call), `EngineError::NotFound`
    /// if the lead does not exist, or an error if storing the line fails.
    pub async fn generate_personalization(
        &self,
        user: &UserId,
        lead_id: &LeadId,
    ) -> Result<PersonalizationOutcome> {
        let settings = self.store.get_settings(user).await?;
        let api_key = resolve_text_key(settings.as_ref(), &self.config)?;

        let _ticket = self.guard.acquire(user, Action::Personalize, lead_id)?;
        let lead = self.owned_lead(user, lead_id).await?;

        let request = icebreaker_prompt(&lead.name, lead.company_or_empty(), lead.title_or_empty());
        match self.generator.generate(&api_key, &request).await {
            Ok(line) => {
                let lead = self
                    .patch_lead(user, lead_id, &LeadPatch::personalization(line))
                    .await?;
                tracing::info!(lead_id = %lead_id, "Generated icebreaker");
                Ok(PersonalizationOutcome::Generated { lead })
            }
            Err(err) => {
                tracing::warn!(lead_id = %lead_id, error = %err, "Icebreaker generation failed");
                let placeholder = if matches!(err, ConnectorError::EmptyResponse) {
                    EMPTY_PERSONALIZATION
                } else {
                    PERSONALIZATION_PLACEHOLDER
                };
                Ok(PersonalizationOutcome::Failed {
                    placeholder: placeholder.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Store an edited icebreaker line.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` for a blank line or
    /// `EngineError::NotFound` if the lead does not exist.
    pub async fn save_personalization(
        &self,
        user: &UserId,
        lead_id: &LeadId,
        line: &str,
    ) -> Result<Lead> {
        let line = line.trim();
        if line.is_empty() {
            return Err(EngineError::Validation(
                "Personalization line cannot be empty".to_string(),
            ));
        }

        let _ticket = self.guard.acquire(user, Action::Personalize, lead_id)?;
        let lead = self
            .patch_lead(user, lead_id, &LeadPatch::personalization(line))
            .await?;
        tracing::info!(lead_id = %lead_id, "Saved icebreaker");
        Ok(lead)
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Convert a lead into a client and close the lead.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the lead does not exist (nothing is written)
    /// - `EngineError::Store` if the client insert fails (the lead is untouched)
    /// - `EngineError::PartialConversion` if the client was created but the lead
    ///   could not be closed
    pub async fn convert_to_client(&self, user: &UserId, lead_id: &LeadId) -> Result<Conversion> {
        let _ticket = self.guard.acquire(user, Action::Convert, lead_id)?;

        let lead = self.owned_lead(user, lead_id).await?;
        self.config.transition_policy.validate(
            lead_id,
            lead.status,
            LeadStatus::Closed,
            TransitionCause::Conversion,
        )?;

        let client = Client {
            id: ClientId::generate(),
            user_id: *user,
            avatar: avatar_url(&lead.name),
            name: lead.name,
            company: lead.company,
            email: lead.email,
            title: lead.title,
            status: ClientStatus::Onboarding,
            automations_running: 0,
            last_active: CONVERTED_LAST_ACTIVE.to_string(),
            created_at: Utc::now(),
        };

        let client = self.store.insert_client(&client).await.map_err(|e| {
            tracing::error!(lead_id = %lead_id, error = %e, "Client creation failed, lead left unchanged");
            EngineError::Store(e)
        })?;

        match self
            .store
            .update_lead(user, lead_id, &LeadPatch::status(LeadStatus::Closed))
            .await
        {
            Ok(lead) => {
                tracing::info!(
                    lead_id = %lead_id,
                    client_id = %client.id,
                    user_id = %user,
                    "Converted lead to client"
                );
                Ok(Conversion { client, lead })
            }
            Err(source) => {
                tracing::warn!(
                    lead_id = %lead_id,
                    client_id = %client.id,
                    error = %source,
                    "Client created but lead could not be closed"
                );
                Err(EngineError::PartialConversion {
                    lead_id: *lead_id,
                    client: Box::new(client),
                    source,
                })
            }
        }
    }

    // =========================================================================
    // Clients and logs
    // =========================================================================

    /// List the user's clients, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub async fn list_clients(&self, user: &UserId) -> Result<Vec<Client>> {
        Ok(self.store.list_clients(user).await?)
    }

    /// Delete a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the store operation fails.
    pub async fn delete_client(&self, user: &UserId, client_id: &ClientId) -> Result<bool> {
        let _ticket = self.guard.acquire(user, Action::Delete, client_id)?;
        let removed = self.store.delete_client(user, client_id).await?;
        tracing::info!(client_id = %client_id, user_id = %user, removed, "Deleted client");
        Ok(removed)
    }

    /// List the user's most recent automation logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub async fn list_logs(&self, user: &UserId) -> Result<Vec<AutomationLog>> {
        Ok(self.store.list_logs(user).await?)
    }

    /// Append an automation log entry.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` for a blank workflow name, or an error
    /// if the store write fails.
    pub async fn record_log(&self, user: &UserId, input: RecordLogInput) -> Result<AutomationLog> {
        let workflow = input.workflow.trim();
        if workflow.is_empty() {
            return Err(EngineError::Validation("Workflow is required".to_string()));
        }

        let now = Utc::now();
        let log = AutomationLog {
            id: LogId::generate(),
            user_id: *user,
            workflow: workflow.to_string(),
            client: input.client.trim().to_string(),
            status: input.status,
            timestamp: input
                .timestamp
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Secs, true)),
            details: input.details,
            created_at: now,
        };

        let log = self.store.insert_log(&log).await?;
        tracing::debug!(log_id = %log.id, status = ?log.status, "Recorded automation log");
        Ok(log)
    }

    // =========================================================================
    // Campaigns
    // =========================================================================

    /// Start an outreach campaign for every `New` lead.
    ///
    /// The leads are posted to the user's webhook (or a simulated one when none
    /// is configured) and then moved to `Contacted`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if there are no new leads, or an error
    /// if the webhook rejects the trigger (no lead is updated in that case).
    pub async fn launch_campaign(&self, user: &UserId) -> Result<CampaignReport> {
        let _ticket = self.guard.acquire(user, Action::Campaign, user)?;

        let lead_ids: Vec<LeadId> = self
            .store
            .list_leads(user)
            .await?
            .into_iter()
            .filter(|l| l.status == LeadStatus::New)
            .map(|l| l.id)
            .collect();
        if lead_ids.is_empty() {
            return Err(EngineError::Validation("No new leads to process".to_string()));
        }

        let settings = self.store.get_settings(user).await?;
        let url = settings
            .as_ref()
            .and_then(|s| s.webhook_url())
            .or(self.config.default_webhook_url.as_deref());
        let webhook = webhook_for(url, &self.config.webhook)?;

        webhook
            .trigger(&CampaignTrigger::new(lead_ids.clone(), Utc::now()))
            .await?;

        let mut updated = Vec::with_capacity(lead_ids.len());
        let mut failed = Vec::new();
        for lead_id in &lead_ids {
            match self
                .store
                .update_lead(user, lead_id, &LeadPatch::status(LeadStatus::Contacted))
                .await
            {
                Ok(_) => updated.push(*lead_id),
                Err(e) => {
                    tracing::warn!(lead_id = %lead_id, error = %e, "Could not mark lead as contacted");
                    failed.push(*lead_id);
                }
            }
        }

        tracing::info!(
            user_id = %user,
            triggered = lead_ids.len(),
            updated = updated.len(),
            demo = webhook.is_demo(),
            "Campaign launched"
        );

        Ok(CampaignReport {
            triggered: lead_ids,
            updated,
            failed,
            demo: webhook.is_demo(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A loose syntactic check: one `@`, a non-empty local part and a dotted domain.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, _)| !host.is_empty())
        && !domain.ends_with('.')
}
