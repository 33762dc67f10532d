use axum::{Extension, Json, extract::State, http::HeaderMap, response::IntoResponse};

use crate::{
    error::Result,
    models::outcome::AuthOutcome,
    services::auth::SKEY_HEADER,
    state::AppState,
};

/// Handles mini-program login: runs the issuance protocol over the
/// credential headers and returns the outcome envelope. The issued session
/// token travels back in the same header the client presents it on.
#[axum::debug_handler]
pub async fn login(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    tracing::info!("📝 Login attempt");

    let issued = state.auth.authorize(&headers).await?;

    Ok(([(SKEY_HEADER, issued.skey)], Json(issued.outcome)))
}

/// Returns the outcome the validation middleware attached to the request.
#[axum::debug_handler]
pub async fn user_info(Extension(outcome): Extension<AuthOutcome>) -> Json<AuthOutcome> {
    Json(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use base64::{Engine as _, engine::general_purpose};
    use chrono::{Duration, Utc};
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::config::{Config, ProviderConfig};
    use crate::crypto::{profile::encrypt_profile, skey::derive_skey};
    use crate::services::auth::test_support::{MemoryStore, MockExchanger, record};
    use crate::services::auth::{
        AuthService, CODE_HEADER, ENCRYPTED_DATA_HEADER, IV_HEADER, SKEY_HEADER,
    };
    use crate::state::AppState;

    const KEY: [u8; 16] = *b"0123456789abcdef";
    const IV: [u8; 16] = *b"fedcba9876543210";

    fn b64(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    fn test_state(exchanger: MockExchanger, store: MemoryStore) -> AppState {
        let config = Config {
            database_url: "postgres://unused".to_string(),
            provider: ProviderConfig::Direct {
                app_id: "test-app".to_string(),
                app_secret: "test-secret".to_string(),
            },
            session_expiry_secs: 7200,
        };
        AppState {
            config,
            auth: Arc::new(AuthService::new(Arc::new(exchanger), Arc::new(store), 7200)),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn login_returns_success_envelope() {
        let session_key = b64(&KEY);
        let encrypted = encrypt_profile(&KEY, &IV, br#"{"openId":"u1","nickName":"Alice"}"#);
        let app = crate::app(test_state(
            MockExchanger::returning("u1", &session_key),
            MemoryStore::new(),
        ));

        let response = app
            .oneshot(
                Request::post("/api/auth/login")
                    .header(CODE_HEADER, "code-1")
                    .header(ENCRYPTED_DATA_HEADER, encrypted.as_str())
                    .header(IV_HEADER, b64(&IV))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(SKEY_HEADER).unwrap(),
            &derive_skey(&session_key)
        );
        let body = body_json(response).await;
        assert_eq!(body["loginState"], "SUCCESS");
        assert_eq!(body["userinfo"]["nickName"], "Alice");
    }

    #[tokio::test]
    async fn login_without_credentials_is_bad_request() {
        let app = crate::app(test_state(
            MockExchanger::returning("u1", &b64(&KEY)),
            MemoryStore::new(),
        ));

        let response = app
            .oneshot(
                Request::post("/api/auth/login")
                    .header(CODE_HEADER, "code-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_then_fetch_user_info_with_issued_token() {
        let session_key = b64(&KEY);
        let encrypted = encrypt_profile(&KEY, &IV, br#"{"openId":"u1","nickName":"Alice"}"#);
        let app = crate::app(test_state(
            MockExchanger::returning("u1", &session_key),
            MemoryStore::new(),
        ));

        let login = app
            .clone()
            .oneshot(
                Request::post("/api/auth/login")
                    .header(CODE_HEADER, "code-1")
                    .header(ENCRYPTED_DATA_HEADER, encrypted.as_str())
                    .header(IV_HEADER, b64(&IV))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(login.status(), StatusCode::OK);
        let token = login
            .headers()
            .get(SKEY_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(token, derive_skey(&session_key));

        let response = app
            .oneshot(
                Request::get("/api/user/info")
                    .header(SKEY_HEADER, token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["loginState"], "SUCCESS");
        assert_eq!(body["userinfo"]["openId"], "u1");
    }

    #[tokio::test]
    async fn user_info_with_unknown_token_is_unauthorized() {
        let app = crate::app(test_state(MockExchanger::failing(), MemoryStore::new()));

        let response = app
            .oneshot(
                Request::get("/api/user/info")
                    .header(SKEY_HEADER, "bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn user_info_with_expired_session_reports_failed_state() {
        let last_seen = Utc::now() - Duration::seconds(7200);
        let store =
            MemoryStore::preloaded(record("u1", "t1", json!({"nickName": "Alice"}), last_seen));
        let app = crate::app(test_state(MockExchanger::failing(), store));

        let response = app
            .oneshot(
                Request::get("/api/user/info")
                    .header(SKEY_HEADER, "t1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["loginState"], "FAILED");
        assert_eq!(body["userinfo"], json!({}));
    }
}
