use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{error::AuthError, state::AppState};

/// A middleware that runs the validation protocol and attaches the outcome
/// to the request.
///
/// An expired session is a FAILED outcome, not an error: the request still
/// continues with the outcome attached and the handler decides what a failed
/// login state means. Protocol errors (missing/unknown token, store faults)
/// reject the request.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    tracing::debug!("🔐 Validating session token...");

    let outcome = state.auth.validate(request.headers()).await?;

    request.extensions_mut().insert(outcome);

    Ok(next.run(request).await)
}
