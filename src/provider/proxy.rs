use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::provider::exchange::{CodeExchanger, ProviderSession};

/// Proxied-mode exchanger: an intermediary service performs the provider
/// exchange with its own credentials.
pub struct ProxyExchanger {
    http: reqwest::Client,
    endpoint: String,
    proxy_id: String,
    proxy_key: String,
}

#[derive(Serialize)]
struct ProxyRequest<'a> {
    proxy_id: &'a str,
    proxy_key: &'a str,
    code: &'a str,
}

/// Proxy envelope: `code == 0` is success, anything else is an exchange
/// failure carrying the raw payload.
#[derive(Debug, Deserialize)]
struct ProxyResponse {
    code: i64,
    #[serde(default)]
    data: Option<ProxyData>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyData {
    openid: Option<String>,
    session_key: Option<String>,
}

impl ProxyResponse {
    fn into_session(self) -> Result<ProviderSession> {
        if self.code != 0 {
            return Err(AuthError::SessionExchange(format!(
                "proxy error {}: {}",
                self.code,
                self.message.unwrap_or_default()
            )));
        }

        let data = self.data.ok_or_else(|| {
            AuthError::SessionExchange("proxy response missing data".to_string())
        })?;

        match (data.openid, data.session_key) {
            (Some(openid), Some(session_key)) => Ok(ProviderSession {
                openid,
                session_key,
                unionid: None,
            }),
            _ => Err(AuthError::SessionExchange(
                "proxy response missing openid or session_key".to_string(),
            )),
        }
    }
}

impl ProxyExchanger {
    pub fn new(proxy_id: String, proxy_key: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            proxy_id,
            proxy_key,
        }
    }
}

#[async_trait]
impl CodeExchanger for ProxyExchanger {
    async fn exchange(&self, code: &str) -> Result<ProviderSession> {
        tracing::debug!("Exchanging login code with identity provider (proxied)");

        let response: ProxyResponse = self
            .http
            .post(&self.endpoint)
            .json(&ProxyRequest {
                proxy_id: &self.proxy_id,
                proxy_key: &self.proxy_key,
                code,
            })
            .send()
            .await?
            .json()
            .await?;

        let session = response.into_session()?;
        tracing::debug!("Code exchanged for openid {}", session.openid);
        Ok(session)
    }
}
