use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::Method;
use tower_cookies::{Cookie, Cookies};
use redis::{AsyncCommands, RedisResult};

use crate::{
    crypto::csrf::{generate_csrf_token, tokens_match},
    error::{AppError, Result},
    models::session::CurrentSession,
    services::session::build_cookie,
    state::AppState,
};

/// The cookie holding the CSRF token.
pub const CSRF_COOKIE: &str = "csrf_token";
/// The form field forms submit the token in.
pub const CSRF_FIELD: &str = "csrf_token";
/// The header non-form clients may submit the token in.
pub const CSRF_HEADER: &str = "x-csrf-token";
/// How long an issued token stays valid, in seconds.
const CSRF_TTL_SECS: u64 = 3600;
/// The largest form body buffered for token extraction.
const MAX_FORM_BYTES: usize = 64 * 1024;

fn csrf_key(token: &str) -> String {
    format!("csrf:{}", token)
}

/// Returns the request's CSRF token, issuing a fresh one if it has none or it expired.
pub async fn issue_token(state: &AppState, cookies: &Cookies) -> Result<String> {
    let mut redis = state.redis.clone();

    if let Some(existing) = cookies.get(CSRF_COOKIE).map(|c| c.value().to_string()) {
        let live: bool = redis.exists(csrf_key(&existing)).await?;
        if live {
            return Ok(existing);
        }
    }

    let token = generate_csrf_token();
    let _: () = redis
        .set_ex(csrf_key(&token), "valid", CSRF_TTL_SECS)
        .await
        .map_err(|e| {
            tracing::error!("❌ Redis set_ex failed for CSRF: {}", e);
            AppError::Redis(e)
        })?;

    cookies.add(build_cookie(
        CSRF_COOKIE,
        token.clone(),
        CSRF_TTL_SECS as i64,
        false,
        state.config.secure_cookies,
    ));
    tracing::debug!("🔐 Issued CSRF token");
    Ok(token)
}

/// Revokes the request's CSRF token, if any.
pub async fn revoke_token(state: &AppState, cookies: &Cookies) {
    if let Some(token) = cookies.get(CSRF_COOKIE).map(|c| c.value().to_string()) {
        let mut redis = state.redis.clone();
        log_revoke_result(redis.del(csrf_key(&token)).await);

        let mut removal = Cookie::new(CSRF_COOKIE, "");
        removal.set_path("/");
        cookies.remove(removal);
    }
}

/// Logout goes ahead when the delete fails; the token still expires with its TTL.
fn log_revoke_result(result: RedisResult<()>) {
    if let Err(e) = result {
        tracing::error!("❌ Redis del failed for CSRF: {}", e);
    }
}

fn form_field(body: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// A middleware that verifies the CSRF token on state-changing requests.
///
/// The token comes from the `x-csrf-token` header or the `csrf_token` form
/// field, must equal the cookie and must still be live in Redis.
pub async fn verify_csrf(
    State(state): State<AppState>,
    cookies: Cookies,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::GET
        || req.method() == Method::HEAD
        || req.method() == Method::OPTIONS
    {
        return next.run(req).await;
    }

    let csrf_token_cookie = match cookies.get(CSRF_COOKIE) {
        Some(c) => c.value().to_string(),
        None => {
            return AppError::Csrf("Missing CSRF token cookie".to_string()).into_response();
        }
    };

    let header_token = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (parts, body) = req.into_parts();
    let body_bytes = match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return AppError::Validation("Form body too large".to_string()).into_response();
        }
    };

    let submitted = match header_token.or_else(|| form_field(&body_bytes, CSRF_FIELD)) {
        Some(token) => token,
        None => {
            return AppError::Csrf("Missing CSRF token in request".to_string()).into_response();
        }
    };

    if !tokens_match(&csrf_token_cookie, &submitted) {
        return AppError::Csrf("CSRF token mismatch".to_string()).into_response();
    }

    let mut redis = state.redis.clone();
    let live: redis::RedisResult<bool> = redis.exists(csrf_key(&csrf_token_cookie)).await;
    match live {
        Ok(true) => {
            tracing::debug!("✅ CSRF token valid");
            next.run(Request::from_parts(parts, Body::from(body_bytes))).await
        }
        Ok(false) => AppError::Csrf("CSRF token expired or invalid".to_string()).into_response(),
        Err(e) => {
            tracing::error!("❌ CSRF: Redis error: {}", e);
            AppError::Redis(e).into_response()
        }
    }
}

/// Like `verify_csrf`, but anonymous requests pass straight through.
///
/// Guards the post routes, whose handlers refuse anonymous callers before
/// any write. Must run inside `resolve_session`.
pub async fn verify_csrf_if_authenticated(
    State(state): State<AppState>,
    cookies: Cookies,
    req: Request<Body>,
    next: Next,
) -> Response {
    let anonymous = req
        .extensions()
        .get::<CurrentSession>()
        .is_none_or(|current| current.session().is_none());

    if anonymous {
        return next.run(req).await;
    }

    verify_csrf(State(state), cookies, req, next).await
}
