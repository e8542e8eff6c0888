//! Test doubles shared by the engine's unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use flowlabs_core::{ClientId, LeadId, UserId};
use flowlabs_store::{
    AutomationLog, Client, ClientStatus, Lead, LeadPatch, RecordStore, Result, RocksStore,
    SettingsUpdate, StoreError, UserSettings,
};
use tempfile::TempDir;

/// Which store operations should fail.
#[derive(Debug, Default)]
pub struct Faults {
    pub list_leads: AtomicBool,
    pub list_clients: AtomicBool,
    pub list_logs: AtomicBool,
    pub insert_client: AtomicBool,
    pub update_lead: AtomicBool,
}

/// A real local store that can be told to fail selected operations.
pub struct FlakyStore {
    inner: RocksStore,
    pub faults: Faults,
    writes: AtomicUsize,
    _dir: TempDir,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        let dir = TempDir::new().unwrap();
        let inner = RocksStore::open(dir.path()).unwrap();
        Arc::new(Self {
            inner,
            faults: Faults::default(),
            writes: AtomicUsize::new(0),
            _dir: dir,
        })
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Transport("connection reset".to_string()))
        } else {
            Ok(())
        }
    }

    fn wrote<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_ok() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn list_leads(&self, owner: &UserId) -> Result<Vec<Lead>> {
        Self::check(&self.faults.list_leads)?;
        self.inner.list_leads(owner).await
    }

    async fn get_lead(&self, owner: &UserId, lead_id: &LeadId) -> Result<Option<Lead>> {
        self.inner.get_lead(owner, lead_id).await
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<Lead> {
        let result = self.inner.insert_lead(lead).await;
        self.wrote(result)
    }

    async fn update_lead(
        &self,
        owner: &UserId,
        lead_id: &LeadId,
        patch: &LeadPatch,
    ) -> Result<Lead> {
        Self::check(&self.faults.update_lead)?;
        let result = self.inner.update_lead(owner, lead_id, patch).await;
        self.wrote(result)
    }

    async fn delete_lead(&self, owner: &UserId, lead_id: &LeadId) -> Result<bool> {
        let result = self.inner.delete_lead(owner, lead_id).await;
        self.wrote(result)
    }

    async fn list_clients(&self, owner: &UserId) -> Result<Vec<Client>> {
        Self::check(&self.faults.list_clients)?;
        self.inner.list_clients(owner).await
    }

    async fn insert_client(&self, client: &Client) -> Result<Client> {
        Self::check(&self.faults.insert_client)?;
        let result = self.inner.insert_client(client).await;
        self.wrote(result)
    }

    async fn update_client_status(
        &self,
        owner: &UserId,
        client_id: &ClientId,
        status: ClientStatus,
    ) -> Result<Client> {
        let result = self.inner.update_client_status(owner, client_id, status).await;
        self.wrote(result)
    }

    async fn delete_client(&self, owner: &UserId, client_id: &ClientId) -> Result<bool> {
        let result = self.inner.delete_client(owner, client_id).await;
        self.wrote(result)
    }

    async fn list_logs(&self, owner: &UserId) -> Result<Vec<AutomationLog>> {
        Self::check(&self.faults.list_logs)?;
        self.inner.list_logs(owner).await
    }

    async fn insert_log(&self, log: &AutomationLog) -> Result<AutomationLog> {
        let result = self.inner.insert_log(log).await;
        self.wrote(result)
    }

    async fn get_settings(&self, owner: &UserId) -> Result<Option<UserSettings>> {
        self.inner.get_settings(owner).await
    }

    async fn upsert_settings(
        &self,
        owner: &UserId,
        update: &SettingsUpdate,
    ) -> Result<UserSettings> {
        let result = self.inner.upsert_settings(owner, update).await;
        self.wrote(result)
    }
}
