use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::provider::exchange::{CodeExchanger, ProviderSession};

/// The provider's code-to-session endpoint.
const JSCODE2SESSION_URL: &str = "https://api.weixin.qq.com/sns/jscode2session";

/// Direct-mode exchanger: calls the identity provider's endpoint with the
/// app credentials.
pub struct DirectExchanger {
    http: reqwest::Client,
    endpoint: String,
    app_id: String,
    app_secret: String,
}

/// The provider reports errors in-band with a 200 status, so every field
/// is optional until folded.
#[derive(Debug, Deserialize)]
struct DirectResponse {
    openid: Option<String>,
    session_key: Option<String>,
    unionid: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

impl DirectResponse {
    fn into_session(self) -> Result<ProviderSession> {
        if let Some(errcode) = self.errcode {
            return Err(AuthError::SessionExchange(format!(
                "provider error {errcode}: {}",
                self.errmsg.unwrap_or_default()
            )));
        }

        match (self.openid, self.session_key) {
            (Some(openid), Some(session_key)) => Ok(ProviderSession {
                openid,
                session_key,
                unionid: self.unionid,
            }),
            _ => Err(AuthError::SessionExchange(
                "provider response missing openid or session_key".to_string(),
            )),
        }
    }
}

impl DirectExchanger {
    pub fn new(app_id: String, app_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: JSCODE2SESSION_URL.to_string(),
            app_id,
            app_secret,
        }
    }
}

#[async_trait]
impl CodeExchanger for DirectExchanger {
    async fn exchange(&self, code: &str) -> Result<ProviderSession> {
        tracing::debug!("Exchanging login code with identity provider (direct)");

        let response: DirectResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?
            .json()
            .await?;

        let session = response.into_session()?;
        tracing::debug!("Code exchanged for openid {}", session.openid);
        Ok(session)
    }
}
