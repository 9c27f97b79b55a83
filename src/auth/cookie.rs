use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

use crate::{
    config::SessionConfig,
    error::{AppError, AppResult},
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, Copy, Default)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub max_age: Option<i64>,
}

/// Value of cookie `name` across all `Cookie` headers. Empty values count as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Renders a `Set-Cookie` value scoped to `/` with `SameSite=Lax`.
pub fn build_cookie(name: &str, value: &str, opts: CookieOptions) -> AppResult<HeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; SameSite=Lax");
    if let Some(max_age) = opts.max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if opts.http_only {
        cookie.push_str("; HttpOnly");
    }
    if opts.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("build cookie header")))
}

pub fn session_cookie(token: &str, cfg: &SessionConfig) -> AppResult<HeaderValue> {
    build_cookie(
        SESSION_COOKIE,
        token,
        CookieOptions {
            http_only: true,
            secure: cfg.secure,
            max_age: Some(cfg.ttl().whole_seconds()),
        },
    )
}

pub fn clear_session_cookie(cfg: &SessionConfig) -> AppResult<HeaderValue> {
    build_cookie(
        SESSION_COOKIE,
        "",
        CookieOptions {
            http_only: true,
            secure: cfg.secure,
            max_age: Some(0),
        },
    )
}
