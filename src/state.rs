use axum::extract::FromRef;
use deadpool_postgres::Pool;
use redis::aio::ConnectionManager;
use crate::config::Config;
use crate::error::Result;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The Redis connection manager, backing sessions, CSRF tokens and rate limits.
    pub redis: ConnectionManager,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`, connecting to PostgreSQL and Redis.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized");

        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let redis = ConnectionManager::new(redis_client).await?;
        tracing::info!("✅ Redis connection manager initialized");

        Ok(AppState {
            db,
            redis,
            config: config.clone(),
        })
    }
}

/// Lets post handlers take the pool as their `PostStore`.
impl FromRef<AppState> for Pool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
