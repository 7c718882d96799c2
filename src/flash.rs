use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};

use crate::services::session::build_cookie;

/// The name of the cookie carrying the pending flash message.
pub const FLASH_COOKIE: &str = "flash";
/// A flash nobody reads within this many seconds is dropped.
const FLASH_TTL_SECS: i64 = 300;

/// The severity of a flash message, used as its CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Danger,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Danger => "danger",
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Encodes the flash as a cookie-safe string.
    pub fn encode(&self) -> String {
        let json = sonic_rs::to_string(self).unwrap_or_default();
        general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes a cookie value. Anything malformed is dropped.
    pub fn decode(value: &str) -> Option<Self> {
        let bytes = general_purpose::URL_SAFE_NO_PAD.decode(value).ok()?;
        sonic_rs::from_slice(&bytes).ok()
    }
}

/// Builds a `303 See Other` to `to` that carries a flash message.
///
/// The flash travels as a response extension, so this also works from
/// `IntoResponse` impls. `write_flash` turns it into the cookie.
pub fn redirect(to: &str, level: Level, message: impl Into<String>) -> Response {
    let mut response = Redirect::to(to).into_response();
    response.extensions_mut().insert(Flash::new(level, message));
    response
}

/// Cookie settings for `write_flash`.
#[derive(Debug, Clone, Copy)]
pub struct FlashCookie {
    pub secure: bool,
}

/// A middleware that stores a response's flash message in the flash cookie.
///
/// Must run inside `CookieManagerLayer`.
pub async fn write_flash(
    State(settings): State<FlashCookie>,
    cookies: Cookies,
    req: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    if let Some(flash) = response.extensions().get::<Flash>() {
        cookies.add(build_cookie(
            FLASH_COOKIE,
            flash.encode(),
            FLASH_TTL_SECS,
            true,
            settings.secure,
        ));
    }
    response
}

/// Takes the pending flash message, if any, and clears the cookie.
pub fn take(cookies: &Cookies) -> Option<Flash> {
    let value = cookies.get(FLASH_COOKIE)?.value().to_string();

    let mut removal = Cookie::new(FLASH_COOKIE, "");
    removal.set_path("/");
    cookies.remove(removal);

    Flash::decode(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        http::{StatusCode, header},
        middleware::from_fn_with_state,
        routing::get,
    };
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;

    #[test]
    fn decodes_what_it_encodes() {
        let flash = Flash::new(Level::Danger, "Credenciales inválidas; \"quoted\"");
        assert_eq!(Flash::decode(&flash.encode()), Some(flash));
    }

    #[test]
    fn garbage_cookie_is_ignored() {
        assert_eq!(Flash::decode("not base64 at all!"), None);
        assert_eq!(Flash::decode(&general_purpose::URL_SAFE_NO_PAD.encode("{}")), None);
    }

    #[test]
    fn redirect_sets_location_and_carries_the_flash() {
        let response = redirect("/login", Level::Info, "You have been logged out");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        assert_eq!(
            response.extensions().get::<Flash>(),
            Some(&Flash::new(Level::Info, "You have been logged out"))
        );
    }

    async fn flash_cookie_from(secure: bool) -> String {
        let app = Router::new()
            .route("/", get(|| async { redirect("/login", Level::Danger, "Nope") }))
            .layer(from_fn_with_state(FlashCookie { secure }, write_flash))
            .layer(CookieManagerLayer::new());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        let value = set_cookie
            .strip_prefix("flash=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert_eq!(Flash::decode(value), Some(Flash::new(Level::Danger, "Nope")));
        set_cookie
    }

    #[tokio::test]
    async fn flash_cookie_is_secure_when_configured() {
        let set_cookie = flash_cookie_from(true).await;
        assert!(set_cookie.contains("Secure"));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Path=/"));
    }

    #[tokio::test]
    async fn flash_cookie_is_plain_in_development() {
        let set_cookie = flash_cookie_from(false).await;
        assert!(!set_cookie.contains("Secure"));
        assert!(set_cookie.contains("HttpOnly"));
    }
}
