//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `RecordStore` trait.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowlabs_core::{ClientId, LeadId, UserId};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf, LOG_LIST_LIMIT};
use crate::types::{
    AutomationLog, Client, ClientStatus, Lead, LeadPatch, SettingsUpdate, UserSettings,
};
use crate::RecordStore;

/// A pair of column families: primary records and their owner index.
#[derive(Clone, Copy)]
struct Collection {
    records: &'static str,
    by_user: &'static str,
}

const LEADS: Collection = Collection {
    records: cf::LEADS,
    by_user: cf::LEADS_BY_USER,
};

const CLIENTS: Collection = Collection {
    records: cf::CLIENTS,
    by_user: cf::CLIENTS_BY_USER,
};

const LOGS: Collection = Collection {
    records: cf::LOGS,
    by_user: cf::LOGS_BY_USER,
};

/// RocksDB-backed storage implementation.
///
/// Updates and deletes read the current record before writing it back, so
/// they run one at a time under `write_lock`.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!("opened local record store");
        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_record<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &impl AsRef<[u8]>,
    ) -> Result<Option<T>> {
        let cf = self.cf(collection.records)?;
        self.db
            .get_cf(&cf, keys::record_key(id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Write a record and its owner index entry in one batch.
    fn put_record<T: Serialize>(
        &self,
        collection: Collection,
        owner: &UserId,
        created_at: DateTime<Utc>,
        id: &impl AsRef<[u8]>,
        record: &T,
    ) -> Result<()> {
        let cf_records = self.cf(collection.records)?;
        let cf_by_user = self.cf(collection.by_user)?;
        let value = Self::serialize(record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_records, keys::record_key(id), &value);
        batch.put_cf(
            &cf_by_user,
            keys::owner_index_key(owner, created_at, id),
            b"",
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Overwrite an existing record without touching its index entry.
    fn replace_record<T: Serialize>(
        &self,
        collection: Collection,
        id: &impl AsRef<[u8]>,
        record: &T,
    ) -> Result<()> {
        let cf = self.cf(collection.records)?;
        let value = Self::serialize(record)?;
        self.db
            .put_cf(&cf, keys::record_key(id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn delete_record(
        &self,
        collection: Collection,
        owner: &UserId,
        created_at: DateTime<Utc>,
        id: &impl AsRef<[u8]>,
    ) -> Result<()> {
        let cf_records = self.cf(collection.records)?;
        let cf_by_user = self.cf(collection.by_user)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_records, keys::record_key(id));
        batch.delete_cf(&cf_by_user, keys::owner_index_key(owner, created_at, id));

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Scan the owner index and load up to `limit` records, newest first.
    fn list_by_owner<T: DeserializeOwned>(
        &self,
        collection: Collection,
        owner: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let cf_by_user = self.cf(collection.by_user)?;
        let prefix = keys::user_prefix(owner);

        let mut records = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&prefix, Direction::Forward));

        for item in iter {
            if limit.is_some_and(|max| records.len() >= max) {
                break;
            }

            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Stop if we're past the prefix
            if !key.starts_with(&prefix) {
                break;
            }

            let Some(record_id) = keys::extract_record_uuid(&key) else {
                tracing::warn!(cf = collection.by_user, "skipping malformed index key");
                continue;
            };
            if let Some(record) = self.get_record(collection, record_id.as_bytes())? {
                records.push(record);
            }
        }

        Ok(records)
    }

    fn owned_lead(&self, owner: &UserId, lead_id: &LeadId) -> Result<Option<Lead>> {
        Ok(self
            .get_record::<Lead>(LEADS, lead_id)?
            .filter(|lead| lead.user_id == *owner))
    }

    fn owned_client(&self, owner: &UserId, client_id: &ClientId) -> Result<Option<Client>> {
        Ok(self
            .get_record::<Client>(CLIENTS, client_id)?
            .filter(|client| client.user_id == *owner))
    }

    fn settings(&self, owner: &UserId) -> Result<Option<UserSettings>> {
        let cf = self.cf(cf::USER_SETTINGS)?;
        self.db
            .get_cf(&cf, keys::record_key(owner))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }
}

#[async_trait]
impl RecordStore for RocksStore {
    // =========================================================================
    // Lead Operations
    // =========================================================================

    async fn list_leads(&self, owner: &UserId) -> Result<Vec<Lead>> {
        self.list_by_owner(LEADS, owner, None)
    }

    async fn get_lead(&self, owner: &UserId, lead_id: &LeadId) -> Result<Option<Lead>> {
        self.owned_lead(owner, lead_id)
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<Lead> {
        self.put_record(LEADS, &lead.user_id, lead.created_at, &lead.id, lead)?;
        Ok(lead.clone())
    }

    async fn update_lead(
        &self,
        owner: &UserId,
        lead_id: &LeadId,
        patch: &LeadPatch,
    ) -> Result<Lead> {
        let _write = self.write_lock.lock();
        let mut lead = self
            .owned_lead(owner, lead_id)?
            .ok_or(StoreError::NotFound)?;
        patch.apply(&mut lead);
        self.replace_record(LEADS, lead_id, &lead)?;
        Ok(lead)
    }

    async fn delete_lead(&self, owner: &UserId, lead_id: &LeadId) -> Result<bool> {
        let _write = self.write_lock.lock();
        let Some(lead) = self.owned_lead(owner, lead_id)? else {
            return Ok(false);
        };
        self.delete_record(LEADS, owner, lead.created_at, lead_id)?;
        Ok(true)
    }

    // =========================================================================
    // Client Operations
    // =========================================================================

    async fn list_clients(&self, owner: &UserId) -> Result<Vec<Client>> {
        self.list_by_owner(CLIENTS, owner, None)
    }

    async fn insert_client(&self, client: &Client) -> Result<Client> {
        self.put_record(
            CLIENTS,
            &client.user_id,
            client.created_at,
            &client.id,
            client,
        )?;
        Ok(client.clone())
    }

    async fn update_client_status(
        &self,
        owner: &UserId,
        client_id: &ClientId,
        status: ClientStatus,
    ) -> Result<Client> {
        let _write = self.write_lock.lock();
        let mut client = self
            .owned_client(owner, client_id)?
            .ok_or(StoreError::NotFound)?;
        client.status = status;
        self.replace_record(CLIENTS, client_id, &client)?;
        Ok(client)
    }

    async fn delete_client(&self, owner: &UserId, client_id: &ClientId) -> Result<bool> {
        let _write = self.write_lock.lock();
        let Some(client) = self.owned_client(owner, client_id)? else {
            return Ok(false);
        };
        self.delete_record(CLIENTS, owner, client.created_at, client_id)?;
        Ok(true)
    }

    // =========================================================================
    // Automation Log Operations
    // =========================================================================

    async fn list_logs(&self, owner: &UserId) -> Result<Vec<AutomationLog>> {
        self.list_by_owner(LOGS, owner, Some(LOG_LIST_LIMIT))
    }

    async fn insert_log(&self, log: &AutomationLog) -> Result<AutomationLog> {
        self.put_record(LOGS, &log.user_id, log.created_at, &log.id, log)?;
        Ok(log.clone())
    }

    // =========================================================================
    // Settings Operations
    // =========================================================================

    async fn get_settings(&self, owner: &UserId) -> Result<Option<UserSettings>> {
        self.settings(owner)
    }

    async fn upsert_settings(
        &self,
        owner: &UserId,
        update: &SettingsUpdate,
    ) -> Result<UserSettings> {
        let _write = self.write_lock.lock();
        let existing = self
            .settings(owner)?
            .unwrap_or_else(|| UserSettings::new(*owner));

        let mut settings = update.apply(existing);
        settings.updated_at = Some(Utc::now());

        let cf = self.cf(cf::USER_SETTINGS)?;
        let value = Self::serialize(&settings)?;
        self.db
            .put_cf(&cf, keys::record_key(owner), value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LeadStatus, LogStatus, SubscriptionTier};
    use chrono::Duration;
    use flowlabs_core::LogId;
    use tempfile::TempDir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_patches_keep_both_fields() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let user_id = UserId::generate();

        for round in 0..20 {
            let lead = create_test_lead(&user_id, &format!("Lead{round}"), Utc::now());
            store.insert_lead(&lead).await.unwrap();

            let status = {
                let store = Arc::clone(&store);
                let lead_id = lead.id;
                tokio::spawn(async move {
                    store
                        .update_lead(&user_id, &lead_id, &LeadPatch::status(LeadStatus::Contacted))
                        .await
                })
            };
            let line = {
                let store = Arc::clone(&store);
                let lead_id = lead.id;
                tokio::spawn(async move {
                    store
                        .update_lead(&user_id, &lead_id, &LeadPatch::personalization("Hi Alice"))
                        .await
                })
            };
            status.await.unwrap().unwrap();
            line.await.unwrap().unwrap();

            let stored = store.get_lead(&user_id, &lead.id).await.unwrap().unwrap();
            assert_eq!(stored.status, LeadStatus::Contacted);
            assert_eq!(stored.personalization_line.as_deref(), Some("Hi Alice"));
        }
    }

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn create_test_lead(user_id: &UserId, name: &str, created_at: DateTime<Utc>) -> Lead {
        Lead {
            id: LeadId::generate(),
            user_id: *user_id,
            name: name.to_string(),
            company: Some("TechFlow".to_string()),
            title: Some("CTO".to_string()),
            email: format!("{}@techflow.io", name.to_lowercase()),
            status: LeadStatus::New,
            score: 80,
            personalization_line: None,
            value: 1500.0,
            created_at,
        }
    }

    fn create_test_client(user_id: &UserId, name: &str) -> Client {
        Client {
            id: ClientId::generate(),
            user_id: *user_id,
            name: name.to_string(),
            company: None,
            email: "client@example.com".to_string(),
            title: None,
            status: ClientStatus::Onboarding,
            automations_running: 0,
            last_active: "Just now".to_string(),
            avatar: String::new(),
            created_at: Utc::now(),
        }
    }

    fn create_test_log(user_id: &UserId, created_at: DateTime<Utc>) -> AutomationLog {
        AutomationLog {
            id: LogId::generate(),
            user_id: *user_id,
            workflow: "Lead Enrichment".to_string(),
            client: "TechFlow".to_string(),
            status: LogStatus::Success,
            timestamp: "10:42 AM".to_string(),
            details: String::new(),
            created_at,
        }
    }

    #[tokio::test]
    async fn lead_crud() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let lead = create_test_lead(&user_id, "Alice", Utc::now());

        // Create
        store.insert_lead(&lead).await.unwrap();

        // Read
        let retrieved = store.get_lead(&user_id, &lead.id).await.unwrap().unwrap();
        assert_eq!(retrieved, lead);

        // Update
        let updated = store
            .update_lead(&user_id, &lead.id, &LeadPatch::status(LeadStatus::Contacted))
            .await
            .unwrap();
        assert_eq!(updated.status, LeadStatus::Contacted);
        assert_eq!(updated.name, "Alice");

        // Delete
        assert!(store.delete_lead(&user_id, &lead.id).await.unwrap());
        assert!(store.get_lead(&user_id, &lead.id).await.unwrap().is_none());
        assert!(store.list_leads(&user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        assert!(!store.delete_lead(&user_id, &LeadId::generate()).await.unwrap());
        assert!(!store
            .delete_client(&user_id, &ClientId::generate())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn leads_are_listed_newest_first() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let now = Utc::now();

        let oldest = create_test_lead(&user_id, "Oldest", now - Duration::days(2));
        let newest = create_test_lead(&user_id, "Newest", now);
        let middle = create_test_lead(&user_id, "Middle", now - Duration::days(1));
        for lead in [&oldest, &newest, &middle] {
            store.insert_lead(lead).await.unwrap();
        }

        let names: Vec<_> = store
            .list_leads(&user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, ["Newest", "Middle", "Oldest"]);
    }

    #[tokio::test]
    async fn records_are_scoped_to_owner() {
        let (store, _dir) = create_test_store();
        let owner = UserId::generate();
        let intruder = UserId::generate();
        let lead = create_test_lead(&owner, "Alice", Utc::now());
        store.insert_lead(&lead).await.unwrap();

        assert!(store.get_lead(&intruder, &lead.id).await.unwrap().is_none());
        assert!(store.list_leads(&intruder).await.unwrap().is_empty());
        assert!(!store.delete_lead(&intruder, &lead.id).await.unwrap());

        let result = store
            .update_lead(&intruder, &lead.id, &LeadPatch::status(LeadStatus::Closed))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));

        // Still intact for the owner
        let kept = store.get_lead(&owner, &lead.id).await.unwrap().unwrap();
        assert_eq!(kept.status, LeadStatus::New);
    }

    #[tokio::test]
    async fn personalization_patch_keeps_status() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let mut lead = create_test_lead(&user_id, "Bob", Utc::now());
        lead.status = LeadStatus::Replied;
        store.insert_lead(&lead).await.unwrap();

        let updated = store
            .update_lead(
                &user_id,
                &lead.id,
                &LeadPatch::personalization("Loved your talk."),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, LeadStatus::Replied);
        assert_eq!(
            updated.personalization_line.as_deref(),
            Some("Loved your talk.")
        );
    }

    #[tokio::test]
    async fn client_crud() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let client = create_test_client(&user_id, "Acme");

        store.insert_client(&client).await.unwrap();
        assert_eq!(store.list_clients(&user_id).await.unwrap(), vec![client.clone()]);

        let updated = store
            .update_client_status(&user_id, &client.id, ClientStatus::Active)
            .await
            .unwrap();
        assert_eq!(updated.status, ClientStatus::Active);

        assert!(store.delete_client(&user_id, &client.id).await.unwrap());
        assert!(store.list_clients(&user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn logs_are_capped() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let now = Utc::now();

        for i in 0..(LOG_LIST_LIMIT + 5) {
            let offset = Duration::minutes(i64::try_from(i).unwrap());
            store
                .insert_log(&create_test_log(&user_id, now - offset))
                .await
                .unwrap();
        }

        let logs = store.list_logs(&user_id).await.unwrap();
        assert_eq!(logs.len(), LOG_LIST_LIMIT);
        assert!(logs
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));
    }

    #[tokio::test]
    async fn settings_upsert_merges() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        assert!(store.get_settings(&user_id).await.unwrap().is_none());

        store
            .upsert_settings(
                &user_id,
                &SettingsUpdate {
                    gemini_api_key: Some("key-1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let merged = store
            .upsert_settings(
                &user_id,
                &SettingsUpdate {
                    subscription_tier: Some(SubscriptionTier::Professional),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(merged.gemini_api_key.as_deref(), Some("key-1"));
        assert_eq!(merged.subscription_tier, SubscriptionTier::Professional);
        assert!(merged.updated_at.is_some());

        let stored = store.get_settings(&user_id).await.unwrap().unwrap();
        assert_eq!(stored, merged);
    }
}
