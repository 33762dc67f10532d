use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::provider::exchange;
use crate::repositories::session::{self, PgSessionStore};
use crate::services::auth::AuthService;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The session issuance/validation protocols.
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized with deadpool-postgres");

        session::ensure_schema(&db).await?;
        tracing::info!("✅ Session schema ensured");

        let store = Arc::new(PgSessionStore::new(db));
        let exchanger = exchange::from_config(&config.provider);

        let auth = Arc::new(AuthService::new(
            exchanger,
            store,
            config.session_expiry_secs,
        ));
        tracing::info!(
            "✅ Auth service initialized (expiry window: {}s)",
            config.session_expiry_secs
        );

        Ok(AppState {
            config: config.clone(),
            auth,
        })
    }
}
