//! One-shot import from the user's spreadsheet tables.
//!
//! Each table is fetched and written independently; a table that fails is
//! reported and skipped while the others proceed. Imported rows get fresh IDs,
//! so importing the same table twice duplicates its rows.

use std::sync::Arc;

use flowlabs_connectors::AirtableSource;
use flowlabs_core::UserId;
use flowlabs_store::{RecordStore, UserSettings};
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::guard::{Action, SubmissionGuard};

/// A source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportTable {
    /// The leads table.
    Leads,
    /// The clients table.
    Clients,
    /// The automation logs table.
    Logs,
}

/// Rows written per table, plus the tables that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Leads written.
    pub leads: usize,
    /// Clients written.
    pub clients: usize,
    /// Logs written.
    pub logs: usize,
    /// Tables that could not be fully imported.
    pub failed: Vec<ImportTable>,
}

/// Imports spreadsheet tables into the record store.
pub struct ImportService<S: RecordStore + ?Sized> {
    store: Arc<S>,
    source: AirtableSource,
    guard: SubmissionGuard,
}

impl<S: RecordStore + ?Sized> ImportService<S> {
    /// Create a new import service.
    #[must_use]
    pub fn new(store: Arc<S>, source: AirtableSource) -> Self {
        Self {
            store,
            source,
            guard: SubmissionGuard::new(),
        }
    }

    /// Share a submission guard with other services.
    #[must_use]
    pub fn with_guard(mut self, guard: SubmissionGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Import the leads, clients and logs tables named in the user's settings.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the data source key or base ID
    /// is missing, `EngineError::DuplicateSubmission` if an import is already
    /// running for the user, or an error if the settings cannot be read.
    pub async fn import_all(&self, user: &UserId) -> Result<ImportReport> {
        let settings = self
            .store
            .get_settings(user)
            .await?
            .unwrap_or_else(|| UserSettings::new(*user));
        check_credentials(&settings)?;

        let _ticket = self.guard.acquire(user, Action::Import, user)?;

        let (leads, clients, logs) = tokio::join!(
            self.source.fetch_leads(&settings),
            self.source.fetch_clients(&settings),
            self.source.fetch_logs(&settings),
        );

        let mut report = ImportReport::default();

        match leads {
            Ok(rows) => {
                for lead in &rows {
                    if let Err(e) = self.store.insert_lead(lead).await {
                        skip(&mut report, ImportTable::Leads, &EngineError::from(e));
                        break;
                    }
                    report.leads += 1;
                }
            }
            Err(e) => skip(&mut report, ImportTable::Leads, &EngineError::from(e)),
        }
        match clients {
            Ok(rows) => {
                for client in &rows {
                    if let Err(e) = self.store.insert_client(client).await {
                        skip(&mut report, ImportTable::Clients, &EngineError::from(e));
                        break;
                    }
                    report.clients += 1;
                }
            }
            Err(e) => skip(&mut report, ImportTable::Clients, &EngineError::from(e)),
        }
        match logs {
            Ok(rows) => {
                for log in &rows {
                    if let Err(e) = self.store.insert_log(log).await {
                        skip(&mut report, ImportTable::Logs, &EngineError::from(e));
                        break;
                    }
                    report.logs += 1;
                }
            }
            Err(e) => skip(&mut report, ImportTable::Logs, &EngineError::from(e)),
        }

        tracing::info!(
            user_id = %user,
            leads = report.leads,
            clients = report.clients,
            logs = report.logs,
            failed = report.failed.len(),
            "Import finished"
        );
        Ok(report)
    }
}

fn skip(report: &mut ImportReport, table: ImportTable, err: &EngineError) {
    tracing::warn!(table = ?table, error = %err, "Import of table failed");
    report.failed.push(table);
}

fn check_credentials(settings: &UserSettings) -> Result<()> {
    let blank = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty()).is_none();
    if blank(settings.airtable_api_key.as_deref()) {
        return Err(EngineError::Configuration("data source API key".to_string()));
    }
    if blank(settings.airtable_base_id.as_deref()) {
        return Err(EngineError::Configuration("data source base ID".to_string()));
    }
    Ok(())
}
