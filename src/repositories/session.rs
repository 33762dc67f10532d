use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AuthError, Result},
    models::session::{SavedSession, SessionRecord},
    statement_cache::StatementCache,
};

/// Persists and retrieves the single session record per user identity.
///
/// `upsert` is keyed by `open_id`, `find_by_skey` by the derived token.
/// An empty lookup result is not an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Writes or refreshes the session record for `open_id`. Updates all
    /// mutable fields and `last_seen_at` when a record exists, inserts a
    /// fresh one otherwise. Returns what was just written.
    async fn upsert(
        &self,
        open_id: &str,
        skey: &str,
        session_key: &str,
        user_info: &serde_json::Value,
    ) -> Result<SavedSession>;

    /// Zero-or-one lookup by the derived session token.
    async fn find_by_skey(&self, skey: &str) -> Result<Option<SessionRecord>>;
}

const EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM sessions WHERE open_id = $1)";

const UPDATE_SQL: &str = r#"
    UPDATE sessions
    SET uuid = $2, skey = $3, session_key = $4, user_info = $5, last_seen_at = NOW()
    WHERE open_id = $1
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO sessions (uuid, open_id, skey, session_key, user_info, created_at, last_seen_at)
    VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
"#;

const FIND_BY_SKEY_SQL: &str = r#"
    SELECT uuid, open_id, skey, session_key, user_info, created_at, last_seen_at
    FROM sessions
    WHERE skey = $1
"#;

/// Ensures the session table and token index exist. Called once at startup.
pub async fn ensure_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client
        .batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                uuid UUID NOT NULL,
                open_id TEXT PRIMARY KEY,
                skey TEXT NOT NULL,
                session_key TEXT NOT NULL,
                user_info JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_seen_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS sessions_skey_idx ON sessions (skey);
            "#,
        )
        .await?;
    Ok(())
}

/// A helper function to map a `tokio_postgres::Row` to a `SessionRecord`.
fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let column = |name: &str| AuthError::Internal(format!("sessions row missing column {name}"));
    Ok(SessionRecord {
        uuid: row.try_get("uuid").map_err(|_| column("uuid"))?,
        open_id: row.try_get("open_id").map_err(|_| column("open_id"))?,
        skey: row.try_get("skey").map_err(|_| column("skey"))?,
        session_key: row.try_get("session_key").map_err(|_| column("session_key"))?,
        user_info: row.try_get("user_info").map_err(|_| column("user_info"))?,
        created_at: row.try_get("created_at").map_err(|_| column("created_at"))?,
        last_seen_at: row.try_get("last_seen_at").map_err(|_| column("last_seen_at"))?,
    })
}

/// PostgreSQL-backed `SessionStore`.
pub struct PgSessionStore {
    pool: Pool,
    statements: StatementCache,
}

impl PgSessionStore {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            statements: StatementCache::new(),
        }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn upsert(
        &self,
        open_id: &str,
        skey: &str,
        session_key: &str,
        user_info: &serde_json::Value,
    ) -> Result<SavedSession> {
        let client = self.pool.get().await?;

        // Existence check and write are two independent statements, no
        // transaction: concurrent issuance for one user can lose an update
        // (last write wins by completion order). Accepted and documented.
        let exists_stmt = self.statements.get_or_prepare(&client, EXISTS_SQL).await?;
        let exists: bool = client.query_one(&exists_stmt, &[&open_id]).await?.try_get(0)?;

        let uuid = Uuid::new_v4();
        if exists {
            let stmt = self.statements.get_or_prepare(&client, UPDATE_SQL).await?;
            client
                .execute(&stmt, &[&open_id, &uuid, &skey, &session_key, user_info])
                .await?;
            tracing::debug!("Session refreshed for user {}", open_id);
        } else {
            let stmt = self.statements.get_or_prepare(&client, INSERT_SQL).await?;
            client
                .execute(&stmt, &[&uuid, &open_id, &skey, &session_key, user_info])
                .await?;
            tracing::debug!("Session created for user {}", open_id);
        }

        Ok(SavedSession {
            skey: skey.to_string(),
            userinfo: user_info.clone(),
        })
    }

    async fn find_by_skey(&self, skey: &str) -> Result<Option<SessionRecord>> {
        let client = self.pool.get().await?;
        let stmt = self
            .statements
            .get_or_prepare(&client, FIND_BY_SKEY_SQL)
            .await?;
        let row = client.query_opt(&stmt, &[&skey]).await?;
        row.map(|r| row_to_session(&r)).transpose()
    }
}
