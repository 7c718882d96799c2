use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    models::session::CurrentSession,
    services::session as session_service,
    state::AppState,
};

/// A middleware that resolves the request's session, if any.
///
/// Always inserts a `CurrentSession`; a missing, expired or unreadable session
/// yields an anonymous one. Redis failures are logged and also read as anonymous.
pub async fn resolve_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let session = match session_service::session_id_from(&cookies) {
        Some(session_id) => match session_service::load_session(&state, session_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("❌ Session lookup failed: {}", e);
                None
            }
        },
        None => None,
    };

    if let Some(ref session) = session {
        tracing::debug!("✅ Request authenticated as user {}", session.user_id);
    }

    request.extensions_mut().insert(CurrentSession(session));
    next.run(request).await
}

/// A middleware that requires a valid session to be present.
///
/// Anonymous requests are redirected to `/login` before the handler runs.
pub async fn require_auth(request: Request<Body>, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<CurrentSession>()
        .is_some_and(|current| current.session().is_some());

    if !authenticated {
        tracing::warn!("❌ Anonymous request to {}", request.uri().path());
        return AppError::LoginRequired.into_response();
    }

    next.run(request).await
}
