use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Extension, Form, Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookie::{clear_session_cookie, read_cookie, session_cookie, SESSION_COOKIE},
        dto::{SignInForm, SignInQuery, SignInView},
    },
    csrf::CsrfToken,
    error::{AppError, AppResult},
    response::found,
    state::AppState,
    users::services::authenticate,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signin", get(sign_in_view).post(sign_in))
        .route("/signout", post(sign_out))
}

pub async fn sign_in_view(
    Query(q): Query<SignInQuery>,
    csrf: Option<Extension<CsrfToken>>,
) -> Json<SignInView> {
    Json(SignInView {
        email: q.email.unwrap_or_default(),
        csrf_token: csrf.map(|Extension(CsrfToken(t))| t),
    })
}

#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn sign_in(State(state): State<AppState>, Form(form): Form<SignInForm>) -> AppResult<Response> {
    let user = match authenticate(state.users.as_ref(), &form.email, &form.password).await {
        Ok(u) => u,
        Err(AppError::NotFound(_)) => {
            warn!("sign-in with unknown email");
            return Err(AppError::InvalidCredentials);
        }
        Err(AppError::InvalidCredentials) => {
            warn!("sign-in with wrong password");
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => return Err(e),
    };

    let session = state
        .sessions
        .create(user.id, state.config.session.ttl())
        .await?;
    let cookie = session_cookie(&session.token, &state.config.session)?;

    info!(user_id = user.id, "user signed in");
    Ok(found("/users", [cookie]))
}

#[instrument(skip(state, headers))]
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = read_cookie(&headers, SESSION_COOKIE) {
        state.sessions.delete(&token).await?;
        info!("user signed out");
    }
    let cookie = clear_session_cookie(&state.config.session)?;
    Ok(found("/signin", [cookie]))
}
