//! Signed double-submit CSRF protection.
//!
//! A token is `base64url(nonce) "." base64url(HMAC-SHA256(key, nonce))`. It is
//! handed out in the `csrf_token` cookie and must come back, on every unsafe
//! request, in the `X-CSRF-Token` header or the `csrf_token` form field.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRef, Request, State},
    http::{
        header::{CONTENT_TYPE, SET_COOKIE},
        HeaderValue, Method,
    },
    middleware::Next,
    response::Response,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::{
    auth::cookie::{build_cookie, read_cookie, CookieOptions},
    error::{AppError, AppResult},
    state::AppState,
};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_FIELD: &str = "csrf_token";

const NONCE_BYTES: usize = 32;
const FORM_BODY_LIMIT: usize = 64 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// Token of the current request, for embedding into rendered forms.
#[derive(Debug, Clone)]
pub struct CsrfToken(pub String);

#[derive(Clone)]
pub struct CsrfGuard {
    key: Arc<[u8]>,
    secure: bool,
}

impl FromRef<AppState> for CsrfGuard {
    fn from_ref(state: &AppState) -> Self {
        state.csrf.clone()
    }
}

impl CsrfGuard {
    pub fn new(key: &[u8], secure: bool) -> Self {
        Self {
            key: Arc::from(key),
            secure,
        }
    }

    fn mac(&self) -> AppResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("csrf hmac key: {e}")))
    }

    pub fn issue(&self) -> AppResult<String> {
        let mut nonce = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce);
        let mut mac = self.mac()?;
        mac.update(&nonce);
        let sig = mac.finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            Base64UrlUnpadded::encode_string(&nonce),
            Base64UrlUnpadded::encode_string(&sig)
        ))
    }

    /// True when `token` was signed with this guard's key.
    pub fn verify(&self, token: &str) -> bool {
        let Some((nonce, sig)) = token.split_once('.') else {
            return false;
        };
        let (Ok(nonce), Ok(sig)) = (
            Base64UrlUnpadded::decode_vec(nonce),
            Base64UrlUnpadded::decode_vec(sig),
        ) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(&nonce);
        mac.verify_slice(&sig).is_ok()
    }

    fn cookie(&self, token: &str) -> AppResult<HeaderValue> {
        build_cookie(
            CSRF_COOKIE,
            token,
            CookieOptions {
                http_only: true,
                secure: self.secure,
                max_age: None,
            },
        )
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Middleware: rejects unsafe requests without a matching token and makes sure
/// every response leaves the client holding a valid token cookie.
pub async fn csrf_protect(
    State(guard): State<CsrfGuard>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let existing = read_cookie(req.headers(), CSRF_COOKIE).filter(|t| guard.verify(t));

    let mut req = req;
    if !is_safe(req.method()) {
        let Some(expected) = existing.as_deref() else {
            warn!(method = %req.method(), uri = %req.uri(), "csrf cookie missing or forged");
            return Err(AppError::Csrf);
        };
        let (submitted, rebuilt) = submitted_token(req).await?;
        req = rebuilt;
        if submitted.as_deref() != Some(expected) {
            warn!(method = %req.method(), uri = %req.uri(), "csrf token mismatch");
            return Err(AppError::Csrf);
        }
    }

    let (token, fresh) = match existing {
        Some(token) => (token, false),
        None => (guard.issue()?, true),
    };
    req.extensions_mut().insert(CsrfToken(token.clone()));

    let mut res = next.run(req).await;
    if fresh {
        debug!("csrf token issued");
        res.headers_mut().append(SET_COOKIE, guard.cookie(&token)?);
    }
    Ok(res)
}

/// Token sent with the request, from the header or else a urlencoded form body.
/// Reading the form buffers the body, so the request is handed back rebuilt.
async fn submitted_token(req: Request) -> AppResult<(Option<String>, Request)> {
    let header = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string());
    if header.is_some() {
        return Ok((header, req));
    }

    let is_form = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return Ok((None, req));
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, FORM_BODY_LIMIT)
        .await
        .map_err(|e| AppError::Validation(format!("Unreadable form body: {e}")))?;
    let token = form_token(&bytes);
    Ok((token, Request::from_parts(parts, Body::from(bytes))))
}

/// The CSRF field of an urlencoded form; every other field is ignored.
#[derive(Deserialize)]
struct CsrfForm {
    csrf_token: Option<String>,
}

fn form_token(body: &[u8]) -> Option<String> {
    serde_urlencoded::from_bytes::<CsrfForm>(body)
        .ok()
        .and_then(|form| form.csrf_token)
}
