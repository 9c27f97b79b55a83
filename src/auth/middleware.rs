use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::{
    auth::cookie::{read_cookie, SESSION_COOKIE},
    error::AppError,
    state::AppState,
    users::User,
};

/// User resolved from the session cookie of the in-flight request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolves the session cookie and attaches [`CurrentUser`] to the request.
/// A missing or stale cookie leaves the request anonymous.
pub async fn set_current_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = read_cookie(req.headers(), SESSION_COOKIE) {
        match state.sessions.user(&token).await {
            Ok(user) => {
                debug!(user_id = user.id, "session resolved");
                req.extensions_mut().insert(CurrentUser(user));
            }
            Err(AppError::NotFound(_)) => debug!("session cookie did not resolve"),
            Err(e) => warn!(error = %e, "session lookup failed"),
        }
    }
    next.run(req).await
}

/// Rejects requests that `set_current_user` left anonymous.
pub async fn require_user(req: Request, next: Next) -> Result<Response, AppError> {
    if req.extensions().get::<CurrentUser>().is_none() {
        warn!(uri = %req.uri(), "unauthenticated request to protected route");
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
