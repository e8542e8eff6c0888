//! Dashboard loading with partial failure tolerance.
//!
//! The three collections are fetched concurrently and independently. Leads are
//! required: without them neither the pipeline value nor the lead count can be
//! computed, so a leads failure is returned to the caller. A clients or logs
//! failure is logged and the stats are computed from an empty collection in its
//! place, with the gap listed in [`DashboardSnapshot::degraded`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use flowlabs_connectors::{metrics_analysis_prompt, ConnectorError, TextGenerator};
use flowlabs_core::UserId;
use flowlabs_store::RecordStore;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::metrics::{
    board_columns, compute_dashboard_stats, compute_reporting_metrics, metrics_summary,
    recent_activity, ActivityItem, BoardColumn, DashboardStats, ReportingMetrics,
};
use crate::settings::resolve_text_key;
use crate::types::EngineConfig;

/// Shown when the analysis came back empty.
pub const EMPTY_ANALYSIS: &str = "No analysis available.";

/// A collection that could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Clients.
    Clients,
    /// Automation logs.
    Logs,
}

/// Dashboard stats plus the collections that were missing from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// The computed stats.
    pub stats: DashboardStats,
    /// Collections that failed to load and were counted as empty.
    pub degraded: Vec<Collection>,
}

impl DashboardSnapshot {
    /// Whether every collection loaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Computes dashboard, report and activity views for a user.
pub struct DashboardService<S, G>
where
    S: RecordStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    store: Arc<S>,
    generator: Arc<G>,
    config: EngineConfig,
}

impl<S, G> DashboardService<S, G>
where
    S: RecordStore + ?Sized,
    G: TextGenerator + ?Sized,
{
    /// Create a new dashboard service.
    #[must_use]
    pub fn new(store: Arc<S>, generator: Arc<G>, config: EngineConfig) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    /// Load the dashboard stats.
    ///
    /// # Errors
    ///
    /// Returns an error only if the leads cannot be loaded.
    pub async fn load(&self, user: &UserId) -> Result<DashboardSnapshot> {
        let (leads, clients, logs) = tokio::join!(
            self.store.list_leads(user),
            self.store.list_clients(user),
            self.store.list_logs(user),
        );

        let leads = leads.map_err(|e| {
            tracing::error!(user_id = %user, error = %e, "Failed to load leads for dashboard");
            EngineError::Store(e)
        })?;

        let mut degraded = Vec::new();
        let clients = clients.unwrap_or_else(|e| {
            tracing::warn!(user_id = %user, error = %e, "Dashboard computed without clients");
            degraded.push(Collection::Clients);
            Vec::new()
        });
        let logs = logs.unwrap_or_else(|e| {
            tracing::warn!(user_id = %user, error = %e, "Dashboard computed without logs");
            degraded.push(Collection::Logs);
            Vec::new()
        });

        Ok(DashboardSnapshot {
            stats: compute_dashboard_stats(&leads, &clients, &logs),
            degraded,
        })
    }

    /// Compute the performance report as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the leads cannot be loaded.
    pub async fn reporting(&self, user: &UserId, now: DateTime<Utc>) -> Result<ReportingMetrics> {
        let leads = self.store.list_leads(user).await?;
        Ok(compute_reporting_metrics(&leads, now))
    }

    /// The newest leads as an activity feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the leads cannot be loaded.
    pub async fn activity(&self, user: &UserId) -> Result<Vec<ActivityItem>> {
        let leads = self.store.list_leads(user).await?;
        Ok(recent_activity(&leads, self.config.activity_limit))
    }

    /// Leads grouped into prospecting board columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the leads cannot be loaded.
    pub async fn board(&self, user: &UserId) -> Result<Vec<BoardColumn>> {
        let leads = self.store.list_leads(user).await?;
        Ok(board_columns(&leads))
    }

    /// Plain-text description of the user's current metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the leads cannot be loaded.
    pub async fn metrics_summary(&self, user: &UserId) -> Result<String> {
        let snapshot = self.load(user).await?;
        let reporting = self.reporting(user, Utc::now()).await?;
        Ok(metrics_summary(&snapshot.stats, &reporting))
    }

    /// Ask the text generator for improvement suggestions.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if no text generation key is
    /// available, or `EngineError::Connector` if generation fails.
    pub async fn analyze(&self, user: &UserId) -> Result<String> {
        let settings = self.store.get_settings(user).await?;
        let api_key = resolve_text_key(settings.as_ref(), &self.config)?;

        let summary = self.metrics_summary(user).await?;
        match self
            .generator
            .generate(&api_key, &metrics_analysis_prompt(&summary))
            .await
        {
            Ok(analysis) => Ok(analysis),
            Err(ConnectorError::EmptyResponse) => Ok(EMPTY_ANALYSIS.to_string()),
            Err(e) => {
                tracing::error!(user_id = %user, error = %e, "Metrics analysis failed");
                Err(EngineError::Connector(e))
            }
        }
    }
}
