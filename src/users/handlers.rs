use axum::{
    extract::{Path, Query, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    routing::{delete, get, post},
    Extension, Form, Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        cookie::{read_cookie, session_cookie, SESSION_COOKIE},
        CurrentUser,
    },
    csrf::CsrfToken,
    error::AppResult,
    response::found,
    state::AppState,
    users::{
        dto::{ListQuery, UserEditView, UserFormView, UserListView},
        repo_types::{NewUser, User, UserUpdate},
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/add", get(add_user_view))
        .route("/users/edit/:id", get(edit_user_view))
        .route("/users/edit", post(update_user))
        .route("/users/delete/:id", post(delete_user))
        .route("/user/:id", delete(delete_user))
}

fn token(csrf: Option<Extension<CsrfToken>>) -> Option<String> {
    csrf.map(|Extension(CsrfToken(t))| t)
}

#[instrument(skip(state, current), fields(user_id = current.0.id))]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<UserListView>> {
    let name = q.name.clone().unwrap_or_default();
    let page = services::list_users(state.users.as_ref(), &name, q.pagination()).await?;
    Ok(Json(UserListView {
        current_user: current.0,
        name,
        data: page.data,
        page: page.params.page,
        page_size: page.params.page_size,
        pagination: page.pagination,
    }))
}

pub async fn add_user_view(csrf: Option<Extension<CsrfToken>>) -> Json<UserFormView> {
    Json(UserFormView {
        csrf_token: token(csrf),
    })
}

/// `201 Created` pointing back at the listing.
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn create_user(
    State(state): State<AppState>,
    Form(form): Form<NewUser>,
) -> AppResult<(StatusCode, HeaderMap, Json<User>)> {
    let user = services::create_user(state.users.as_ref(), form).await?;

    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, HeaderValue::from_static("/users"));
    Ok((StatusCode::CREATED, headers, Json(user)))
}

#[instrument(skip(state, csrf))]
pub async fn edit_user_view(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    csrf: Option<Extension<CsrfToken>>,
) -> AppResult<Json<UserEditView>> {
    let user = services::get_user(state.users.as_ref(), id).await?;
    Ok(Json(UserEditView {
        user,
        csrf_token: token(csrf),
    }))
}

/// Updates name and email, then re-sets the caller's session cookie.
#[instrument(skip(state, headers, form), fields(id = form.id))]
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<UserUpdate>,
) -> AppResult<Response> {
    services::update_user(state.users.as_ref(), form).await?;

    let cookie = read_cookie(&headers, SESSION_COOKIE)
        .map(|t| session_cookie(&t, &state.config.session))
        .transpose()?;
    Ok(found("/users", cookie))
}

#[instrument(skip(state))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Response> {
    services::delete_user(state.users.as_ref(), id).await?;
    Ok(found("/users", None::<HeaderValue>))
}
