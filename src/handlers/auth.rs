use axum::{
    extract::{rejection::FormRejection, State},
    response::{Html, Response},
    Extension, Form,
};
use garde::Validate;
use tower_cookies::Cookies;

use crate::{
    error::{AppError, INCOMPLETE_FORM, Result},
    flash::{self, Level},
    middleware_layer::{csrf, rate_limit::LoginOutcome},
    models::session::CurrentSession,
    services::{auth as auth_service, session as session_service},
    state::AppState,
    validation::auth::{LoginForm, RegisterForm},
    views::{self, layout::PageContext},
};

/// Renders the registration form.
pub async fn register_page(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    cookies: Cookies,
) -> Result<Html<String>> {
    let ctx = PageContext::load(&state, &cookies, current).await?;
    Ok(views::auth::register_page(&ctx))
}

/// Unwraps and validates a registration form, or builds the redirect back
/// to `/register` that reports what is wrong with it.
fn registration_input(
    form: std::result::Result<Form<RegisterForm>, FormRejection>,
) -> std::result::Result<RegisterForm, Response> {
    let Form(form) = form.map_err(|rejection| {
        tracing::debug!("Registration form rejected: {}", rejection.body_text());
        flash::redirect("/register", Level::Danger, INCOMPLETE_FORM)
    })?;

    if let Err(report) = form.validate() {
        tracing::debug!("Registration form rejected: {}", report);
        return Err(flash::redirect("/register", Level::Danger, report.to_string()));
    }
    Ok(form)
}

/// Unwraps and validates a login form. Every problem reads as invalid credentials.
fn login_input(form: std::result::Result<Form<LoginForm>, FormRejection>) -> Result<LoginForm> {
    let Form(form) = form.map_err(|rejection| {
        tracing::debug!("Login form rejected: {}", rejection.body_text());
        AppError::InvalidCredentials
    })?;

    if form.validate().is_err() {
        return Err(AppError::InvalidCredentials);
    }
    Ok(form)
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    form: std::result::Result<Form<RegisterForm>, FormRejection>,
) -> Result<Response> {
    let form = match registration_input(form) {
        Ok(form) => form,
        Err(redirect) => return Ok(redirect),
    };
    tracing::info!("📝 Register attempt: {:?}", form);

    let user = auth_service::register_user(&state.db, &form.username, &form.password).await?;
    tracing::info!("✅ User registered: {}", user.id);

    Ok(flash::redirect(
        "/login",
        Level::Success,
        "Account created. You can log in now",
    ))
}

/// Renders the login form.
pub async fn login_page(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    cookies: Cookies,
) -> Result<Html<String>> {
    let ctx = PageContext::load(&state, &cookies, current).await?;
    Ok(views::auth::login_page(&ctx))
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    form: std::result::Result<Form<LoginForm>, FormRejection>,
) -> Result<Response> {
    let form = login_input(form)?;
    tracing::info!("🔐 Login attempt: {:?}", form);

    let user = auth_service::authenticate_user(&state.db, &form.username, &form.password).await?;

    // A client that logs in again drops its previous session record.
    if let Some(previous) = session_service::session_id_from(&cookies) {
        session_service::destroy_session(&state, previous).await?;
    }
    session_service::start_session(&state, &cookies, &user).await?;

    tracing::info!("✅ User logged in: {}", user.id);

    let mut response = flash::redirect("/", Level::Success, "You are now logged in");
    response.extensions_mut().insert(LoginOutcome::Succeeded);
    Ok(response)
}

/// Handles user logout. Works with or without a session.
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    cookies: Cookies,
) -> Result<Response> {
    if let Some(session) = current.session() {
        tracing::info!("👋 Logout for user: {}", session.user_id);
    }

    session_service::end_session(&state, &cookies).await?;
    csrf::revoke_token(&state, &cookies).await;

    Ok(flash::redirect("/login", Level::Info, "You have been logged out"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, StatusCode, header},
        response::IntoResponse,
    };
    use serde::de::DeserializeOwned;

    use crate::flash::Flash;

    async fn extract<T: DeserializeOwned>(body: &str) -> std::result::Result<Form<T>, FormRejection> {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        Form::<T>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn login_without_password_reads_as_invalid_credentials() {
        let form = extract::<LoginForm>("username=alice").await;
        assert!(form.is_err());

        let response = login_input(form).unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        assert_eq!(response.extensions().get::<LoginOutcome>(), Some(&LoginOutcome::Failed));
    }

    #[tokio::test]
    async fn login_with_empty_fields_reads_as_invalid_credentials() {
        let form = extract::<LoginForm>("username=&password=").await;
        assert!(matches!(login_input(form), Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn complete_login_form_passes_through() {
        let form = extract::<LoginForm>("username=alice&password=hunter22").await;
        assert_eq!(login_input(form).unwrap().username, "alice");
    }

    #[tokio::test]
    async fn incomplete_registration_goes_back_with_a_flash() {
        let form = extract::<RegisterForm>("username=alice").await;
        let Err(response) = registration_input(form) else {
            panic!("an incomplete registration was accepted");
        };

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/register");
        assert_eq!(
            response.extensions().get::<Flash>(),
            Some(&Flash::new(Level::Danger, INCOMPLETE_FORM))
        );
    }

    #[tokio::test]
    async fn invalid_registration_goes_back_with_a_flash() {
        let form = extract::<RegisterForm>("username=al&password=short").await;
        let Err(response) = registration_input(form) else {
            panic!("an invalid registration was accepted");
        };
        assert_eq!(response.headers()[header::LOCATION], "/register");
        assert_eq!(
            response.extensions().get::<Flash>().map(|flash| flash.level),
            Some(Level::Danger)
        );
    }

    #[tokio::test]
    async fn valid_registration_passes_through() {
        let form = extract::<RegisterForm>("username=alice_01&password=correct+horse").await;
        let Ok(form) = registration_input(form) else {
            panic!("a valid registration was refused");
        };
        assert_eq!(form.username, "alice_01");
        assert_eq!(form.password, "correct horse");
    }
}
