//! Authentication middleware for protected endpoints.
//!
//! Sessions are issued by the lobby; this server only looks them up. The
//! authenticated [`PlayerId`] is injected into request extensions:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use golf::game::PlayerId;
//!
//! async fn protected_handler(Extension(player_id): Extension<PlayerId>) -> String {
//!     format!("Authenticated as {}", player_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use golf::{db::SessionStore, game::PlayerId};

use super::AppState;

/// Validates `Authorization: Bearer <session>` and injects the owner's
/// [`PlayerId`].
///
/// - Missing or malformed header: `401 Unauthorized`
/// - Unknown or expired session: `401 Unauthorized`
/// - Store failure: `503 Service Unavailable`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let player_id = authenticate(state.sessions.as_ref(), token).await?;
    request.extensions_mut().insert(player_id);
    Ok(next.run(request).await)
}

/// Resolves a session token to its owner.
pub(crate) async fn authenticate(
    sessions: &dyn SessionStore,
    token: &str,
) -> Result<PlayerId, StatusCode> {
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    match sessions.validate_session(token).await {
        Ok(Some(player_id)) => Ok(player_id),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            tracing::error!(error = %err, "Session lookup failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
