//! Table and column family names.
//!
//! The hosted backend and the local `RocksDB` store share the same logical
//! layout: one collection per record kind, each row owned by a single user.

/// Table names on the hosted backend.
pub mod table {
    /// Sales prospects.
    pub const LEADS: &str = "leads";
    /// Converted customers.
    pub const CLIENTS: &str = "clients";
    /// Automation execution history.
    pub const LOGS: &str = "automation_logs";
    /// Per-user configuration, keyed by `user_id`.
    pub const USER_SETTINGS: &str = "user_settings";
}

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary lead records, keyed by `lead_id`.
    pub const LEADS: &str = "leads";
    /// Index: `user_id || inverted created_at || lead_id`.
    pub const LEADS_BY_USER: &str = "leads_by_user";
    /// Primary client records, keyed by `client_id`.
    pub const CLIENTS: &str = "clients";
    /// Index: `user_id || inverted created_at || client_id`.
    pub const CLIENTS_BY_USER: &str = "clients_by_user";
    /// Primary log records, keyed by `log_id`.
    pub const LOGS: &str = "logs";
    /// Index: `user_id || inverted created_at || log_id`.
    pub const LOGS_BY_USER: &str = "logs_by_user";
    /// Settings rows, keyed by `user_id`.
    pub const USER_SETTINGS: &str = "user_settings";
}

/// Maximum number of automation logs returned by a listing.
pub const LOG_LIST_LIMIT: usize = 50;

/// Get all column family names.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::LEADS,
        cf::LEADS_BY_USER,
        cf::CLIENTS,
        cf::CLIENTS_BY_USER,
        cf::LOGS,
        cf::LOGS_BY_USER,
        cf::USER_SETTINGS,
    ]
}
