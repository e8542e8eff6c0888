//! Record store for FlowLabs.
//!
//! Every record (lead, client, automation log, settings row) belongs to exactly
//! one user, and every operation in this crate is scoped to an owner. A record
//! owned by another user behaves exactly like a missing one.
//!
//! Two backends implement [`RecordStore`]:
//!
//! - [`RestStore`]: the hosted backend, spoken to over its `PostgREST` dialect
//! - [`RocksStore`]: a local `RocksDB` database for offline and test use
//!
//! # Architecture
//!
//! The local store uses the following column families:
//!
//! - `leads`, `clients`, `logs`: primary records keyed by record ID
//! - `leads_by_user`, `clients_by_user`, `logs_by_user`: owner indexes ordered
//!   newest first
//! - `user_settings`: settings rows keyed by user ID
//!
//! # Example
//!
//! ```no_run
//! use flowlabs_core::UserId;
//! use flowlabs_store::{RecordStore, RocksStore};
//!
//! # async fn example() -> flowlabs_store::Result<()> {
//! let store = RocksStore::open("/tmp/flowlabs-db")?;
//!
//! let user_id = UserId::generate();
//! let leads = store.list_leads(&user_id).await?;
//! assert!(leads.is_empty());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod lenient;
pub mod rest;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rest::{RestStore, RestStoreConfig};
pub use rocks::RocksStore;
pub use schema::LOG_LIST_LIMIT;
pub use types::{
    parse_deal_value, sanitize_deal_value, AutomationLog, Client, ClientStatus, Lead, LeadPatch,
    LeadStatus, LogStatus, SettingsUpdate, SubscriptionTier, UnknownStatus, UserSettings,
    MAX_SCORE, MIN_SCORE,
};

use async_trait::async_trait;
use flowlabs_core::{ClientId, LeadId, UserId};

/// The storage trait defining all record operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (hosted REST backend, local `RocksDB`).
#[async_trait]
pub trait RecordStore: Send + Sync {
    // =========================================================================
    // Lead Operations
    // =========================================================================

    /// List all leads owned by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn list_leads(&self, owner: &UserId) -> Result<Vec<Lead>>;

    /// Get a single lead.
    ///
    /// Returns `None` if the lead does not exist or is owned by someone else.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn get_lead(&self, owner: &UserId, lead_id: &LeadId) -> Result<Option<Lead>>;

    /// Insert a new lead and return the stored representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the row.
    async fn insert_lead(&self, lead: &Lead) -> Result<Lead>;

    /// Apply a partial update to a lead and return the updated row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row owned by `owner` matched.
    async fn update_lead(&self, owner: &UserId, lead_id: &LeadId, patch: &LeadPatch)
        -> Result<Lead>;

    /// Delete a lead.
    ///
    /// Idempotent: returns `false` if nothing was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn delete_lead(&self, owner: &UserId, lead_id: &LeadId) -> Result<bool>;

    // =========================================================================
    // Client Operations
    // =========================================================================

    /// List all clients owned by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn list_clients(&self, owner: &UserId) -> Result<Vec<Client>>;

    /// Insert a new client and return the stored representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the row.
    async fn insert_client(&self, client: &Client) -> Result<Client>;

    /// Change a client's fulfillment status.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row owned by `owner` matched.
    async fn update_client_status(
        &self,
        owner: &UserId,
        client_id: &ClientId,
        status: ClientStatus,
    ) -> Result<Client>;

    /// Delete a client.
    ///
    /// Idempotent: returns `false` if nothing was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn delete_client(&self, owner: &UserId, client_id: &ClientId) -> Result<bool>;

    // =========================================================================
    // Automation Log Operations
    // =========================================================================

    /// List the most recent automation logs (at most [`LOG_LIST_LIMIT`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn list_logs(&self, owner: &UserId) -> Result<Vec<AutomationLog>>;

    /// Append an automation log.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the row.
    async fn insert_log(&self, log: &AutomationLog) -> Result<AutomationLog>;

    // =========================================================================
    // Settings Operations
    // =========================================================================

    /// Get a user's settings row, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn get_settings(&self, owner: &UserId) -> Result<Option<UserSettings>>;

    /// Create or merge-update a user's settings row.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    async fn upsert_settings(
        &self,
        owner: &UserId,
        update: &SettingsUpdate,
    ) -> Result<UserSettings>;
}
