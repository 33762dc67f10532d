use serde::Serialize;

/// Summary tag for a protocol run.
///
/// FAILED is a normal, reportable outcome (an expired session), not an
/// error: errors reject the request instead of producing an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginState {
    Success,
    Failed,
}

/// The `{loginState, userinfo}` envelope both protocols hand back to the
/// framework layer, which attaches it to request-scoped state.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    #[serde(rename = "loginState")]
    pub login_state: LoginState,
    pub userinfo: serde_json::Value,
}

impl AuthOutcome {
    /// A successful outcome carrying the user profile.
    pub fn success(userinfo: serde_json::Value) -> Self {
        Self {
            login_state: LoginState::Success,
            userinfo,
        }
    }

    /// A failed outcome with an empty profile.
    pub fn failed() -> Self {
        Self {
            login_state: LoginState::Failed,
            userinfo: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}
