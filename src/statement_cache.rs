use deadpool_postgres::Client;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tokio_postgres::Statement;

use crate::error::Result;

/// A thread-safe, asynchronous cache for prepared statements.
///
/// The session store runs the same handful of statements on every request;
/// preparing them once per pool client avoids a parse round-trip per call.
#[derive(Clone)]
pub struct StatementCache {
    cache: Arc<Mutex<HashMap<String, Statement>>>,
}

impl StatementCache {
    /// Creates a new, empty `StatementCache`.
    pub fn new() -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Retrieves a prepared statement from the cache, preparing it if it doesn't exist.
    pub async fn get_or_prepare(&self, client: &Client, query: &str) -> Result<Statement> {
        let mut cache = self.cache.lock().await;

        if let Some(statement) = cache.get(query) {
            return Ok(statement.clone());
        }

        let statement = client.prepare(query).await?;

        cache.insert(query.to_string(), statement.clone());

        Ok(statement)
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new()
    }
}
