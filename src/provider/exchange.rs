use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::provider::{direct::DirectExchanger, proxy::ProxyExchanger};

/// Session material returned by the identity provider for a login code.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub openid: String,
    pub session_key: String,
    pub unionid: Option<String>,
}

/// Exchanges a single-use login code for session material.
///
/// One outbound network call per invocation; any provider error or network
/// failure surfaces as `AuthError::SessionExchange`.
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<ProviderSession>;
}

/// Selects the exchanger implementation once at startup.
pub fn from_config(config: &ProviderConfig) -> Arc<dyn CodeExchanger> {
    match config {
        ProviderConfig::Direct { app_id, app_secret } => {
            tracing::info!("Identity provider exchange: direct mode");
            Arc::new(DirectExchanger::new(app_id.clone(), app_secret.clone()))
        }
        ProviderConfig::Proxy {
            proxy_id,
            proxy_key,
            endpoint,
        } => {
            tracing::info!("Identity provider exchange: proxied mode via {}", endpoint);
            Arc::new(ProxyExchanger::new(
                proxy_id.clone(),
                proxy_key.clone(),
                endpoint.clone(),
            ))
        }
    }
}
