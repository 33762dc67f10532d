use std::env;
use anyhow::{Context, Result};

/// Validation expiry window applied when `SESSION_EXPIRY_SECONDS` is unset
/// or not a number.
pub const DEFAULT_SESSION_EXPIRY_SECS: i64 = 7200;

/// Identity provider credentials, selected once at startup.
#[derive(Clone, Debug)]
pub enum ProviderConfig {
    /// Call the provider's jscode2session endpoint directly.
    Direct {
        app_id: String,
        app_secret: String,
    },
    /// Call an intermediary service that performs the exchange on our behalf.
    Proxy {
        proxy_id: String,
        proxy_key: String,
        endpoint: String,
    },
}

/// The application's configuration.
///
/// Loaded once from the environment and passed explicitly into the protocol
/// constructors; nothing reads ambient globals after startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// Direct or proxied identity provider credentials.
    pub provider: ProviderConfig,
    /// The validation expiry window in seconds.
    pub session_expiry_secs: i64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let use_proxy_login = env::var("USE_PROXY_LOGIN")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let provider = if use_proxy_login {
            ProviderConfig::Proxy {
                proxy_id: env::var("PROXY_LOGIN_ID")
                    .context("PROXY_LOGIN_ID must be set when USE_PROXY_LOGIN is enabled")?,
                proxy_key: env::var("PROXY_LOGIN_KEY")
                    .context("PROXY_LOGIN_KEY must be set when USE_PROXY_LOGIN is enabled")?,
                endpoint: env::var("PROXY_LOGIN_URL")
                    .context("PROXY_LOGIN_URL must be set when USE_PROXY_LOGIN is enabled")?,
            }
        } else {
            ProviderConfig::Direct {
                app_id: env::var("WX_APP_ID").context("WX_APP_ID must be set")?,
                app_secret: env::var("WX_APP_SECRET").context("WX_APP_SECRET must be set")?,
            }
        };

        // Non-numeric values fall back to the default instead of failing,
        // matching the behavior clients already depend on.
        let session_expiry_secs = env::var("SESSION_EXPIRY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_SESSION_EXPIRY_SECS);

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            provider,
            session_expiry_secs,
        })
    }
}
