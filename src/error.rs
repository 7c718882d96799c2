use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::flash::{self, Level};
use crate::middleware_layer::rate_limit::LoginOutcome;
use crate::views;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// The connection pool could not hand out a client.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// The connection pool could not be built.
    #[error("Pool creation error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A session record could not be encoded or decoded.
    #[error("Session error: {0}")]
    Session(String),

    /// A column was missing or had an unexpected type.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Registration hit the unique username constraint.
    #[error("Username already taken")]
    UsernameTaken,

    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The request needs a session and has none.
    #[error("Login required")]
    LoginRequired,

    /// The session user does not own the resource.
    #[error("Not the owner of this resource")]
    NotOwner,

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A CSRF check failed.
    #[error("CSRF check failed: {0}")]
    Csrf(String),

    /// A password hashing error.
    #[error("Password hashing error: {0}")]
    Hashing(String),

    /// A rate limit exceeded error.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(report.to_string())
    }
}

/// The flash shown for a form body that is missing fields or cannot be decoded.
pub const INCOMPLETE_FORM: &str = "Please fill in every field";

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!("Form rejected: {}", rejection.body_text());
        AppError::Validation(INCOMPLETE_FORM.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::UsernameTaken => {
                tracing::info!("Registration rejected: username taken");
                return flash::redirect(
                    "/register",
                    Level::Danger,
                    "That username is already taken",
                );
            }

            AppError::InvalidCredentials => {
                tracing::warn!("Authentication failed: invalid credentials");
                let mut response = flash::redirect(
                    "/login",
                    Level::Danger,
                    "Invalid credentials, please try again",
                );
                response.extensions_mut().insert(LoginOutcome::Failed);
                return response;
            }

            AppError::LoginRequired => {
                tracing::debug!("Anonymous request redirected to login");
                return flash::redirect("/login", Level::Info, "Please log in to continue");
            }

            AppError::NotOwner => {
                tracing::warn!("Authorization failed: not the post author");
                return flash::redirect("/", Level::Danger, "You can only change your own posts");
            }

            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::CreatePool(ref e) => {
                tracing::error!("Pool creation error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Session store error".to_string())
            }

            AppError::Session(ref msg) => {
                tracing::error!("Session error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Session store error".to_string())
            }

            AppError::MissingData(ref column) => {
                tracing::error!("Missing column in row: {}", column);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "The page you asked for does not exist".to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Csrf(ref msg) => {
                tracing::warn!("CSRF check failed: {}", msg);
                (StatusCode::FORBIDDEN, "Your form expired, please go back and try again".to_string())
            }

            AppError::Hashing(ref msg) => {
                tracing::error!("Password hashing error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::RateLimitExceeded(ref msg) => {
                tracing::warn!("Rate limit exceeded: {}", msg);
                (StatusCode::TOO_MANY_REQUESTS, msg.clone())
            }
        };

        (status, views::layout::error_page(status, &message)).into_response()
    }
}
