use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A persisted session record; at most one per `open_id`.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Regenerated on every save.
    pub uuid: Uuid,
    /// The identity provider's stable user identifier.
    pub open_id: String,
    /// The derived, one-way session token clients present on requests.
    pub skey: String,
    /// The raw provider-issued session key; re-derives decryption keys.
    pub session_key: String,
    /// The decrypted user profile, passed through opaquely.
    pub user_info: serde_json::Value,
    /// First issuance time.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every re-issuance; sole basis for expiry. Validation
    /// never touches it.
    pub last_seen_at: DateTime<Utc>,
}

/// What an upsert just wrote: the token and profile handed back to the caller.
#[derive(Debug, Clone)]
pub struct SavedSession {
    pub skey: String,
    pub userinfo: serde_json::Value,
}
