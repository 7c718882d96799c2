use axum::{http::StatusCode, response::Html};
use tower_cookies::Cookies;

use crate::{
    error::Result,
    flash::{self, Flash},
    middleware_layer::csrf,
    models::session::{CurrentSession, Session},
    state::AppState,
};

/// Everything the shared page chrome needs.
pub struct PageContext {
    pub session: Option<Session>,
    pub flash: Option<Flash>,
    pub csrf_token: String,
}

impl PageContext {
    /// Collects the session, consumes the pending flash and issues a CSRF token.
    pub async fn load(state: &AppState, cookies: &Cookies, current: CurrentSession) -> Result<Self> {
        Ok(Self {
            session: current.0,
            flash: flash::take(cookies),
            csrf_token: csrf::issue_token(state, cookies).await?,
        })
    }

    /// The hidden input every form carries.
    pub fn csrf_input(&self) -> String {
        format!(
            r#"<input type="hidden" name="{}" value="{}">"#,
            csrf::CSRF_FIELD,
            escape(&self.csrf_token)
        )
    }
}

/// Escapes text for use in HTML bodies and quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn nav(ctx: &PageContext) -> String {
    match &ctx.session {
        Some(session) => format!(
            r#"<nav><a href="/">Posts</a> <a href="/create">New post</a> <span>Signed in as {}</span> <a href="/logout">Log out</a></nav>"#,
            escape(&session.username)
        ),
        None => r#"<nav><a href="/">Posts</a> <a href="/login">Log in</a> <a href="/register">Register</a></nav>"#
            .to_string(),
    }
}

fn flash_banner(flash: Option<&Flash>) -> String {
    flash
        .map(|f| {
            format!(
                r#"<div class="flash flash-{}">{}</div>"#,
                f.level.as_str(),
                escape(&f.message)
            )
        })
        .unwrap_or_default()
}

fn document(title: &str, header: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{} · Inkpost</title></head>
<body>
{}
<main>
{}
</main>
</body>
</html>"#,
        escape(title),
        header,
        body
    ))
}

/// Wraps `body` in the site layout.
pub fn page(title: &str, ctx: &PageContext, body: &str) -> Html<String> {
    let header = format!("{}\n{}", nav(ctx), flash_banner(ctx.flash.as_ref()));
    document(title, &header, body)
}

/// A bare page for error responses, which have no session or CSRF context.
pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let title = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        r#"<h1>{} {}</h1>
<p>{}</p>
<p><a href="/">Back to posts</a></p>"#,
        status.as_u16(),
        escape(title),
        escape(message)
    );
    document(title, r#"<nav><a href="/">Posts</a></nav>"#, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::Level;

    fn anonymous() -> PageContext {
        PageContext {
            session: None,
            flash: None,
            csrf_token: "tok".into(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<a href="x">O'Neil & co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;O&#x27;Neil &amp; co&lt;/a&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn anonymous_nav_offers_login() {
        let html = page("Posts", &anonymous(), "").0;
        assert!(html.contains(r#"href="/login""#));
        assert!(!html.contains("Log out"));
    }

    #[test]
    fn signed_in_nav_shows_escaped_username() {
        let ctx = PageContext {
            session: Some(Session::new(1, "<bob>".into(), 1)),
            ..anonymous()
        };
        let html = page("Posts", &ctx, "").0;
        assert!(html.contains("Signed in as &lt;bob&gt;"));
        assert!(html.contains("Log out"));
    }

    #[test]
    fn flash_is_rendered_with_its_level() {
        let ctx = PageContext {
            flash: Some(Flash::new(Level::Success, "Post created")),
            ..anonymous()
        };
        let html = page("Posts", &ctx, "").0;
        assert!(html.contains(r#"<div class="flash flash-success">Post created</div>"#));
    }

    #[test]
    fn csrf_input_carries_the_token() {
        assert_eq!(
            anonymous().csrf_input(),
            r#"<input type="hidden" name="csrf_token" value="tok">"#
        );
    }

    #[test]
    fn error_page_shows_status_and_message() {
        let html = error_page(StatusCode::NOT_FOUND, "No such post").0;
        assert!(html.contains("404 Not Found"));
        assert!(html.contains("No such post"));
    }
}
