use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
///
/// Every variant is terminal for the current protocol invocation; nothing is
/// retried internally. "Token not found" is deliberately folded into
/// `InvalidToken` so callers can never probe which tokens ever existed.
#[derive(Error, Debug)]
pub enum AuthError {
    /// One or more of the login credential headers is missing or empty.
    #[error("Missing login credentials")]
    MissingCredentials,

    /// The session token header is missing, or no session matches it.
    #[error("Invalid session token")]
    InvalidToken,

    /// The identity provider refused the code exchange or was unreachable.
    /// Carries the provider's raw error payload for diagnostics.
    #[error("Session exchange failed: {0}")]
    SessionExchange(String),

    /// Decryption of the client payload failed, or the decrypted content was
    /// not the expected structured value.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// A connection pool error.
    #[error("Database error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        // Strip the URL: the direct-mode query string carries the app secret.
        AuthError::SessionExchange(e.without_url().to_string())
    }
}

/// A `Result` type that uses `AuthError` as the error type.
pub type Result<T> = std::result::Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredentials => {
                tracing::debug!("Login request missing credential headers");
                (StatusCode::BAD_REQUEST, "Missing login credentials".to_string())
            }

            AuthError::InvalidToken => {
                tracing::debug!("Session token missing or unknown");
                (StatusCode::UNAUTHORIZED, "Invalid session token".to_string())
            }

            AuthError::SessionExchange(ref payload) => {
                tracing::warn!("Session exchange failed: {}", payload);
                (StatusCode::UNAUTHORIZED, "Session exchange failed".to_string())
            }

            AuthError::Decryption(ref cause) => {
                tracing::warn!("Decryption error: {}", cause);
                (StatusCode::BAD_REQUEST, "Could not decrypt user data".to_string())
            }

            AuthError::Pool(ref e) => {
                tracing::error!("Database pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AuthError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AuthError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}
