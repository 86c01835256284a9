//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use course_progress_core::{Actor, CoreError};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Reads the auth session ID out of the `session` cookie.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and resolves the caller.
///
/// If valid, inserts the caller's `Actor` and `User` into request extensions
/// for handlers to use. Missing or expired sessions get 401, suspended
/// accounts 403.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Parse session ID from cookie
    let auth_session_id = session_cookie(req.headers()).ok_or(CoreError::Unauthorized)?;

    // 2. Validate auth session in database, get user_id
    let user_id = state.db.validate_auth_session(auth_session_id).await?;

    // 3. Load the user; role and suspension come from storage, not the cookie
    let user = match state.db.get_user(user_id).await {
        Ok(user) => user,
        Err(CoreError::NotFound(_)) => return Err(CoreError::Unauthorized.into()),
        Err(e) => return Err(e.into()),
    };
    if user.suspended {
        warn!(%user_id, "Suspended user attempted an authenticated request");
        return Err(CoreError::Forbidden("account is suspended".to_string()).into());
    }

    // 4. Insert the caller into request extensions
    req.extensions_mut().insert(Actor::new(user.user_id, user.role));
    req.extensions_mut().insert(user);

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
