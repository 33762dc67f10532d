use std::sync::Arc;

use chrono::{Duration, Utc};
use http::HeaderMap;

use crate::crypto::{profile, skey};
use crate::error::{AuthError, Result};
use crate::models::outcome::AuthOutcome;
use crate::provider::exchange::CodeExchanger;
use crate::repositories::session::SessionStore;

/// Header carrying the single-use login code issued by the provider SDK.
pub const CODE_HEADER: &str = "x-wx-code";
/// Header carrying the client-encrypted profile payload.
pub const ENCRYPTED_DATA_HEADER: &str = "x-wx-encrypted-data";
/// Header carrying the per-request initialization vector.
pub const IV_HEADER: &str = "x-wx-iv";
/// Header carrying the session token on validated requests.
pub const SKEY_HEADER: &str = "x-wx-skey";

/// The session issuance and validation protocols.
///
/// Collaborators are injected once at startup; each protocol run is a single
/// linear attempt with no internal retries, so any failed step aborts the
/// chain and the caller must re-invoke with a fresh code.
pub struct AuthService {
    exchanger: Arc<dyn CodeExchanger>,
    store: Arc<dyn SessionStore>,
    expiry: Duration,
}

/// A freshly issued session: the protocol outcome plus the derived token
/// the client must present on subsequent requests.
#[derive(Debug)]
pub struct IssuedSession {
    pub outcome: AuthOutcome,
    pub skey: String,
}

/// The three credential headers issuance needs, all required.
struct LoginCredentials {
    code: String,
    encrypted_data: String,
    iv: String,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl LoginCredentials {
    fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let code = header_value(headers, CODE_HEADER);
        let encrypted_data = header_value(headers, ENCRYPTED_DATA_HEADER);
        let iv = header_value(headers, IV_HEADER);

        match (code, encrypted_data, iv) {
            (Some(code), Some(encrypted_data), Some(iv)) => Ok(Self {
                code,
                encrypted_data,
                iv,
            }),
            _ => Err(AuthError::MissingCredentials),
        }
    }
}

impl AuthService {
    pub fn new(
        exchanger: Arc<dyn CodeExchanger>,
        store: Arc<dyn SessionStore>,
        expiry_secs: i64,
    ) -> Self {
        Self {
            exchanger,
            store,
            expiry: Duration::seconds(expiry_secs),
        }
    }

    /// Issuance protocol: exchanges the login code for session material,
    /// derives the session token, decrypts the client profile and upserts
    /// the session record.
    ///
    /// Nothing is persisted before the final step, so a decryption failure
    /// after a successful exchange leaves the store untouched.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<IssuedSession> {
        let credentials = LoginCredentials::from_headers(headers)?;
        tracing::debug!("Login credentials received, exchanging code");

        let session = self.exchanger.exchange(&credentials.code).await?;

        let skey = skey::derive_skey(&session.session_key);

        let userinfo = profile::decrypt_profile(
            &session.session_key,
            &credentials.iv,
            &credentials.encrypted_data,
        )?;

        // The upsert key comes from the decrypted profile itself; a profile
        // without it is malformed content.
        let open_id = userinfo
            .get("openId")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AuthError::Decryption("decrypted profile is missing openId".to_string())
            })?;

        let saved = self
            .store
            .upsert(&open_id, &skey, &session.session_key, &userinfo)
            .await?;

        tracing::info!("Session issued for user {}", open_id);
        Ok(IssuedSession {
            outcome: AuthOutcome::success(saved.userinfo),
            skey: saved.skey,
        })
    }

    /// Validation protocol: a pure read. Looks up the presented token and
    /// evaluates expiry against `last_seen_at`; an expired session is a
    /// FAILED outcome, not an error. Only re-issuance refreshes
    /// `last_seen_at`.
    pub async fn validate(&self, headers: &HeaderMap) -> Result<AuthOutcome> {
        let skey = header_value(headers, SKEY_HEADER).ok_or(AuthError::InvalidToken)?;

        // Unknown tokens fail exactly like missing ones.
        let record = self
            .store
            .find_by_skey(&skey)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let elapsed = Utc::now() - record.last_seen_at;
        if elapsed >= self.expiry {
            tracing::debug!("Session expired for user {}", record.open_id);
            return Ok(AuthOutcome::failed());
        }

        tracing::debug!("Session valid for user {}", record.open_id);
        Ok(AuthOutcome::success(record.user_info))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use crate::error::{AuthError, Result};
    use crate::models::session::{SavedSession, SessionRecord};
    use crate::provider::exchange::{CodeExchanger, ProviderSession};
    use crate::repositories::session::SessionStore;

    /// Exchanger stub: a preloaded session or a canned exchange failure.
    pub struct MockExchanger {
        session: Option<ProviderSession>,
        pub calls: AtomicUsize,
    }

    impl MockExchanger {
        pub fn returning(openid: &str, session_key: &str) -> Self {
            Self {
                session: Some(ProviderSession {
                    openid: openid.to_string(),
                    session_key: session_key.to_string(),
                    unionid: None,
                }),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                session: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CodeExchanger for MockExchanger {
        async fn exchange(&self, _code: &str) -> Result<ProviderSession> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.session.clone().ok_or_else(|| {
                AuthError::SessionExchange("provider error 40029: invalid code".to_string())
            })
        }
    }

    /// In-memory store with the same upsert semantics as the Postgres one,
    /// plus call counters for the protocol ordering assertions.
    #[derive(Default)]
    pub struct MemoryStore {
        records: Mutex<HashMap<String, SessionRecord>>,
        pub upserts: AtomicUsize,
        pub lookups: AtomicUsize,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn preloaded(record: SessionRecord) -> Self {
            let store = Self::default();
            store
                .records
                .lock()
                .unwrap()
                .insert(record.open_id.clone(), record);
            store
        }

        pub fn record_count(&self) -> usize {
            self.records.lock().unwrap().len()
        }

        pub fn get(&self, open_id: &str) -> Option<SessionRecord> {
            self.records.lock().unwrap().get(open_id).cloned()
        }

        pub fn upsert_count(&self) -> usize {
            self.upserts.load(Ordering::SeqCst)
        }
    }

    pub fn record(
        open_id: &str,
        skey: &str,
        user_info: serde_json::Value,
        last_seen_at: DateTime<Utc>,
    ) -> SessionRecord {
        SessionRecord {
            uuid: Uuid::new_v4(),
            open_id: open_id.to_string(),
            skey: skey.to_string(),
            session_key: "unused".to_string(),
            user_info,
            created_at: last_seen_at,
            last_seen_at,
        }
    }

    #[async_trait]
    impl SessionStore for MemoryStore {
        async fn upsert(
            &self,
            open_id: &str,
            skey: &str,
            session_key: &str,
            user_info: &serde_json::Value,
        ) -> Result<SavedSession> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            let mut records = self.records.lock().unwrap();
            let now = Utc::now();
            records
                .entry(open_id.to_string())
                .and_modify(|r| {
                    r.uuid = Uuid::new_v4();
                    r.skey = skey.to_string();
                    r.session_key = session_key.to_string();
                    r.user_info = user_info.clone();
                    r.last_seen_at = now;
                })
                .or_insert_with(|| SessionRecord {
                    uuid: Uuid::new_v4(),
                    open_id: open_id.to_string(),
                    skey: skey.to_string(),
                    session_key: session_key.to_string(),
                    user_info: user_info.clone(),
                    created_at: now,
                    last_seen_at: now,
                });
            Ok(SavedSession {
                skey: skey.to_string(),
                userinfo: user_info.clone(),
            })
        }

        async fn find_by_skey(&self, skey: &str) -> Result<Option<SessionRecord>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let records = self.records.lock().unwrap();
            Ok(records.values().find(|r| r.skey == skey).cloned())
        }
    }
}
