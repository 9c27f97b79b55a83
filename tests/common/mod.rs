//! Shared fixtures for router-level tests. Every test builds its own state, so
//! nothing is shared between tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        Method, Request, Response,
    },
    Router,
};
use http_body_util::BodyExt;
use tower::util::ServiceExt;
use userhub::{app, config::AppConfig, seed::seed_users, state::AppState};

pub const ADMIN_EMAIL: &str = "admin@gmail.com";
pub const STAFF_EMAIL: &str = "staff@gmail.com";
pub const PASSWORD: &str = "password123";

/// In-memory state seeded with admin, manager and staff.
pub async fn seeded_state() -> AppState {
    let state = AppState::in_memory(AppConfig::for_tests());
    seed_users(state.users.as_ref()).await.expect("seed users");
    state
}

/// Routes without the CSRF layer, as the handlers see them.
pub async fn seeded_app() -> (Router, AppState) {
    let state = seeded_state().await;
    (app::routes(state.clone()), state)
}

pub fn request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn form(method: Method, uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_text(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` pair of the named cookie set by `res`, if any.
pub fn set_cookie(res: &Response<Body>, name: &str) -> Option<String> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

pub fn encode_email(email: &str) -> String {
    email.replace('@', "%40")
}

/// Signs in through `POST /signin` and returns the session cookie pair.
pub async fn sign_in(app: &Router, email: &str, password: &str) -> String {
    let body = format!("email={}&password={}", encode_email(email), password);
    let res = send(app, form(Method::POST, "/signin", &body, None)).await;
    assert_eq!(res.status(), 302, "sign in as {email}");
    set_cookie(&res, "session").expect("session cookie")
}
