use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::Method;
use std::net::SocketAddr;

use crate::{error::AppError, state::AppState};

/// Marks how a login attempt ended, set in response extensions.
///
/// `rate_limit_login` counts `Failed` and resets on `Succeeded`; responses
/// without a marker (validation errors, CSRF failures) leave the counter alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Failed,
    Succeeded,
}

/// Extracts the real IP address from the request extensions.
///
/// # Returns
///
/// The IP address as a string, or "unknown" if not found.
fn extract_real_ip(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn current_count(state: &AppState, key: &str) -> Option<u32> {
    redis::cmd("GET")
        .arg(key)
        .query_async(&mut state.redis.clone())
        .await
        .unwrap_or(None)
}

async fn minutes_left(state: &AppState, key: &str) -> i64 {
    let ttl: Option<i64> = redis::cmd("TTL")
        .arg(key)
        .query_async(&mut state.redis.clone())
        .await
        .unwrap_or(None);
    (ttl.unwrap_or(0).max(0) + 59) / 60
}

async fn bump(state: &AppState, key: &str, window_secs: u64) {
    let _: () = redis::cmd("INCR")
        .arg(key)
        .query_async(&mut state.redis.clone())
        .await
        .unwrap_or(());

    let _: () = redis::cmd("EXPIRE")
        .arg(key)
        .arg(window_secs)
        .query_async(&mut state.redis.clone())
        .await
        .unwrap_or(());
}

/// A middleware that rate limits user registration per client IP.
pub async fn rate_limit_register(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() != Method::POST {
        return next.run(req).await;
    }

    let ip = extract_real_ip(&req);
    let key = format!("rate_limit:register:{}", ip);

    if let Some(attempts) = current_count(&state, &key).await {
        if attempts >= state.config.register_max_attempts {
            return AppError::RateLimitExceeded(format!(
                "Registration limit exceeded. Try again in {} minutes",
                minutes_left(&state, &key).await
            ))
            .into_response();
        }
    }

    bump(&state, &key, state.config.register_window_secs).await;

    next.run(req).await
}

/// A middleware that locks out a client IP after repeated failed logins.
pub async fn rate_limit_login(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() != Method::POST {
        return next.run(req).await;
    }

    let ip = extract_real_ip(&req);
    let key = format!("rate_limit:login:{}", ip);

    if let Some(failures) = current_count(&state, &key).await {
        if failures >= state.config.login_max_failures {
            return AppError::RateLimitExceeded(format!(
                "Too many failed login attempts. Try again in {} minutes",
                minutes_left(&state, &key).await
            ))
            .into_response();
        }
    }

    let response = next.run(req).await;

    match response.extensions().get::<LoginOutcome>() {
        Some(LoginOutcome::Failed) => {
            bump(&state, &key, state.config.login_lockout_secs).await;
        }
        Some(LoginOutcome::Succeeded) => {
            let _: () = redis::cmd("DEL")
                .arg(&key)
                .query_async(&mut state.redis.clone())
                .await
                .unwrap_or(());
        }
        None => {}
    }

    response
}
