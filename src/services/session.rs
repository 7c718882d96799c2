use redis::AsyncCommands;
use tower_cookies::{Cookie, Cookies, cookie::{SameSite, time::Duration}};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{session::Session, user::User},
    state::AppState,
};

/// The name of the cookie holding the session ID.
pub const SESSION_COOKIE: &str = "session_id";

fn session_key(session_id: Uuid) -> String {
    format!("session:{}", session_id)
}

/// Creates a cookie with the application's defaults.
///
/// Every cookie is `SameSite=Lax` on path `/`; `Secure` follows configuration.
pub fn build_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    http_only: bool,
    secure: bool,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(http_only);
    cookie.set_secure(secure);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie.set_path("/");
    cookie
}

/// Reads the session ID from the request cookies, ignoring malformed values.
pub fn session_id_from(cookies: &Cookies) -> Option<Uuid> {
    cookies
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// Stores a new session for `user` in Redis and sets the session cookie.
pub async fn start_session(state: &AppState, cookies: &Cookies, user: &User) -> Result<Uuid> {
    let session_id = Uuid::new_v4();
    let session = Session::new(user.id, user.username.clone(), state.config.session_duration_days);

    let session_json = sonic_rs::to_string(&session)
        .map_err(|e| AppError::Session(format!("Session serialization failed: {}", e)))?;

    let ttl = state.config.session_ttl_secs();
    let mut redis = state.redis.clone();
    let _: () = redis
        .set_ex(session_key(session_id), &session_json, ttl)
        .await
        .map_err(|e| {
            tracing::error!("❌ Redis set_ex failed: {}", e);
            AppError::Redis(e)
        })?;

    cookies.add(build_cookie(
        SESSION_COOKIE,
        session_id.to_string(),
        ttl as i64,
        true,
        state.config.secure_cookies,
    ));

    tracing::info!("✅ Session started for user {}", user.id);
    Ok(session_id)
}

/// Loads a live session. Expired or unreadable records are removed and read as absent.
pub async fn load_session(state: &AppState, session_id: Uuid) -> Result<Option<Session>> {
    let mut redis = state.redis.clone();
    let session_json: Option<String> = redis.get(session_key(session_id)).await?;

    let Some(session_json) = session_json else {
        return Ok(None);
    };

    let session = match sonic_rs::from_str::<Session>(&session_json) {
        Ok(session) if !session.is_expired() => session,
        Ok(session) => {
            tracing::warn!("❌ Session expired for user: {}", session.user_id);
            destroy_session(state, session_id).await?;
            return Ok(None);
        }
        Err(e) => {
            tracing::warn!("❌ Invalid session JSON: {}", e);
            destroy_session(state, session_id).await?;
            return Ok(None);
        }
    };

    Ok(Some(session))
}

/// Deletes the session record. Deleting a missing key is not an error.
pub async fn destroy_session(state: &AppState, session_id: Uuid) -> Result<()> {
    let mut redis = state.redis.clone();
    let _: () = redis.del(session_key(session_id)).await?;
    Ok(())
}

/// Clears whatever session the request carries and expires the cookie.
pub async fn end_session(state: &AppState, cookies: &Cookies) -> Result<()> {
    if let Some(session_id) = session_id_from(cookies) {
        destroy_session(state, session_id).await?;
        tracing::info!("✅ Session deleted from Redis");
    }

    let mut session_cookie = Cookie::new(SESSION_COOKIE, "");
    session_cookie.set_path("/");
    cookies.remove(session_cookie);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_locked_down() {
        let cookie = build_cookie(SESSION_COOKIE, "abc".into(), 3600, true, true);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(3600)));
    }

    #[test]
    fn session_keys_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(session_key(id), "session:00000000-0000-0000-0000-000000000000");
    }
}
