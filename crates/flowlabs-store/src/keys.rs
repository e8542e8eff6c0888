//! Key encoding utilities for `RocksDB`.
//!
//! Owner index keys are `user_id || inverted created_at millis || record_id`.
//! Inverting the timestamp makes a forward prefix scan yield newest first.

use chrono::{DateTime, Utc};
use flowlabs_core::UserId;

const ID_LEN: usize = 16;
const TS_LEN: usize = 8;

/// Length of an owner index key.
pub const OWNER_INDEX_KEY_LEN: usize = ID_LEN + TS_LEN + ID_LEN;

/// Encode a primary key (just the record ID bytes).
#[must_use]
pub fn record_key(id: &impl AsRef<[u8]>) -> Vec<u8> {
    id.as_ref().to_vec()
}

/// Encode an owner index key.
#[must_use]
pub fn owner_index_key(
    user_id: &UserId,
    created_at: DateTime<Utc>,
    id: &impl AsRef<[u8]>,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(OWNER_INDEX_KEY_LEN);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&inverted_millis(created_at).to_be_bytes());
    key.extend_from_slice(id.as_ref());
    key
}

/// Encode a user prefix for scanning all records owned by a user.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the record ID from an owner index key.
///
/// Returns `None` if the key has the wrong length.
#[must_use]
pub fn extract_record_uuid(key: &[u8]) -> Option<uuid::Uuid> {
    if key.len() != OWNER_INDEX_KEY_LEN {
        return None;
    }
    uuid::Uuid::from_slice(&key[ID_LEN + TS_LEN..]).ok()
}

#[allow(clippy::cast_sign_loss)]
fn inverted_millis(at: DateTime<Utc>) -> u64 {
    let millis = at.timestamp_millis().max(0) as u64;
    u64::MAX - millis
}
