use axum::{
    Router,
    routing::{get, post},
    middleware::{from_fn, from_fn_with_state},
    extract::DefaultBodyLimit,
};

use anyhow::Context;
use deadpool_postgres::Pool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::{
    compression::CompressionLayer,
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod flash;
mod state;
mod db;
mod crypto {
    pub mod csrf;
}

mod models {
    pub mod user;
    pub mod post;
    pub mod session;
}

mod repositories {
    pub mod user;
    pub mod post;
}

mod services {
    pub mod auth;
    pub mod posts;
    pub mod session;
}

mod handlers {
    pub mod auth;
    pub mod posts;
}

mod middleware_layer {
    pub mod auth;
    pub mod csrf;
    pub mod rate_limit;
}

mod validation {
    pub mod auth;
    pub mod posts;
}

mod views {
    pub mod layout;
    pub mod auth;
    pub mod posts;
}

use config::Config;
use state::AppState;

/// Forms are small; anything larger is rejected before a handler runs.
const MAX_BODY_BYTES: usize = 64 * 1024;

fn build_router(state: AppState) -> anyhow::Result<Router> {
    let mutation_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(1)
            .burst_size(30)
            .use_headers()
            .finish()
            .context("Invalid rate limiter configuration")?,
    );

    let register_routes = Router::new()
        .route(
            "/register",
            get(handlers::auth::register_page).post(handlers::auth::register),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::rate_limit::rate_limit_register,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::csrf::verify_csrf,
        ));

    let login_routes = Router::new()
        .route(
            "/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::rate_limit::rate_limit_login,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::csrf::verify_csrf,
        ));

    let authoring_routes = Router::new()
        .route(
            "/create",
            get(handlers::posts::create_page).post(handlers::posts::create::<Pool>),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::csrf::verify_csrf_if_authenticated,
        ))
        .route_layer(from_fn(middleware_layer::auth::require_auth))
        .layer(tower_governor::GovernorLayer::new(mutation_governor_conf.clone()));

    // Edit and delete check session and ownership in the handlers, after the
    // post lookup, so they are not behind `require_auth`.
    let owner_routes = Router::new()
        .route(
            "/edit/{post_id}",
            get(handlers::posts::edit_page).post(handlers::posts::edit::<Pool>),
        )
        .route("/delete/{post_id}", post(handlers::posts::delete::<Pool>))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::csrf::verify_csrf_if_authenticated,
        ))
        .layer(tower_governor::GovernorLayer::new(mutation_governor_conf));

    let public_routes = Router::new()
        .route("/", get(handlers::posts::index))
        .route(
            "/logout",
            get(handlers::auth::logout).post(handlers::auth::logout),
        );

    Ok(Router::new()
        .merge(register_routes)
        .merge(login_routes)
        .merge(authoring_routes)
        .merge(owner_routes)
        .merge(public_routes)
        .layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::resolve_session,
        ))
        .layer(from_fn_with_state(
            flash::FlashCookie {
                secure: state.config.secure_cookies,
            },
            flash::write_flash,
        ))
        .layer(CookieManagerLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .with_state(state))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    db::run_migrations(&state.db).await?;

    let app = build_router(state)?;

    let addr = config.bind_addr;
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
